//! Concurrent download orchestration.
//!
//! A fixed pool of worker tasks drains the shared pending set. Each worker
//! claims one key at a time (the claim is atomic, so work is never
//! duplicated), resolves its destination, and streams the object to disk
//! with a bounded retry on timeout. Any fatal error cancels the shared
//! token: no new claims are issued, in-flight siblings drain, and the
//! first error is surfaced.
//!
//! Files already fully written stay on disk; unattempted keys stay absent.
//! A later run recomputes local state and naturally re-requests whatever
//! is missing or incomplete.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::object::{object_url, ObjectResolver};

use super::http::{FetchError, ObjectFetcher};
use super::pending::PendingSet;

/// Aggregate result of the download phase.
#[derive(Clone, Copy, Debug, Default)]
pub struct DownloadStats {
    /// Objects fully transferred.
    pub objects: usize,
    /// Bytes written to disk.
    pub bytes: u64,
}

/// Bounded pool of concurrent download workers.
pub struct DownloadOrchestrator<F> {
    fetcher: Arc<F>,
    workers: usize,
    attempt_budget: u32,
}

impl<F: ObjectFetcher> DownloadOrchestrator<F> {
    /// Create an orchestrator.
    ///
    /// `attempt_budget` is the total number of tries per object, first
    /// attempt included (minimum 1).
    pub fn new(fetcher: Arc<F>, workers: usize, attempt_budget: u32) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            attempt_budget: attempt_budget.max(1),
        }
    }

    /// Drain the pending set.
    ///
    /// Completes successfully only when every key has been claimed and
    /// transferred. On a fatal error, `cancel` is triggered so no further
    /// claims are issued anywhere (the progress reporter shares the same
    /// token), and the first error is returned.
    pub async fn run(
        &self,
        pending: Arc<PendingSet>,
        resolver: Arc<ObjectResolver>,
        base_url: &str,
        bundle: &str,
        cancel: CancellationToken,
    ) -> SyncResult<DownloadStats> {
        let mut tasks = JoinSet::new();
        for _ in 0..self.workers {
            tasks.spawn(worker(
                Arc::clone(&self.fetcher),
                Arc::clone(&pending),
                Arc::clone(&resolver),
                base_url.to_string(),
                bundle.to_string(),
                cancel.clone(),
                self.attempt_budget,
            ));
        }

        let mut stats = DownloadStats::default();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(worker_stats)) => {
                    stats.objects += worker_stats.objects;
                    stats.bytes += worker_stats.bytes;
                }
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => {}
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}

/// One worker: claim, transfer, repeat until the set is empty or the run
/// is cancelled. A fatal error cancels the token before propagating.
async fn worker<F: ObjectFetcher>(
    fetcher: Arc<F>,
    pending: Arc<PendingSet>,
    resolver: Arc<ObjectResolver>,
    base_url: String,
    bundle: String,
    cancel: CancellationToken,
    attempt_budget: u32,
) -> SyncResult<DownloadStats> {
    let mut stats = DownloadStats::default();
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let Some(key) = pending.claim() else {
            break;
        };

        match transfer(&*fetcher, &resolver, &base_url, &bundle, &key, attempt_budget).await {
            Ok(bytes) => {
                debug!(key = %key, bytes, "object transferred");
                stats.objects += 1;
                stats.bytes += bytes;
            }
            Err(e) => {
                cancel.cancel();
                return Err(e);
            }
        }
    }
    Ok(stats)
}

/// Transfer one object with the retry policy: timeouts consume attempts,
/// everything else is fatal immediately.
async fn transfer<F: ObjectFetcher>(
    fetcher: &F,
    resolver: &ObjectResolver,
    base_url: &str,
    bundle: &str,
    key: &str,
    attempt_budget: u32,
) -> SyncResult<u64> {
    let dest = resolver.resolve(key);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SyncError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    let url = object_url(base_url, bundle, key);
    let mut attempts_left = attempt_budget;
    loop {
        match fetcher.fetch(&url, &dest).await {
            Ok(bytes) => return Ok(bytes),
            Err(FetchError::Timeout) => {
                attempts_left -= 1;
                if attempts_left == 0 {
                    return Err(SyncError::DownloadExhausted {
                        key: key.to_string(),
                    });
                }
                warn!(key = %key, attempts_left, "transfer timed out, retrying");
            }
            Err(FetchError::Write { path, source }) => {
                return Err(SyncError::WriteFailed { path, source });
            }
            Err(e) => {
                return Err(SyncError::TransferRejected {
                    key: key.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}
