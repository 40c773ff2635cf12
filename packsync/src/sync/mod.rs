//! The synchronization pipeline.
//!
//! Reconciles a local installation against one bundle's manifest:
//!
//! ```text
//! Manifest ──► Local State Scanner ──► Diff Engine ──► apply deletions
//!                  (hash everything)    (pure)              │
//!                                                           ▼
//!                                      ┌──────────────────────────────┐
//!                                      │     DownloadOrchestrator     │
//!                                      │  N workers ◄── PendingSet    │
//!                                      │       ProgressReporter       │
//!                                      └──────────────────────────────┘
//! ```
//!
//! Scanning and diffing run to completion before any worker starts; after
//! that the manifest and local state are read-only snapshots and the
//! pending set is the only concurrently mutated resource. Workers and the
//! progress reporter are started together and awaited together.

mod http;
mod orchestrator;
mod pending;
mod progress;

pub use http::{FetchError, FetchFuture, HttpObjectFetcher, ObjectFetcher};
pub use orchestrator::{DownloadOrchestrator, DownloadStats};
pub use pending::PendingSet;
pub use progress::{spawn_reporter, DownloadProgress};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::diff::{compute_diff, SyncPlan};
use crate::error::{SyncError, SyncResult};
use crate::manifest::Manifest;
use crate::object::ObjectResolver;
use crate::scan::{scan_local_state, ScanProgress};

/// Outcome of one successful synchronization run.
#[derive(Clone, Debug, Default)]
pub struct SyncSummary {
    /// Objects declared by the manifest.
    pub objects_total: usize,
    /// Local files hashed during the scan.
    pub scanned: usize,
    /// Objects downloaded this run.
    pub downloaded: usize,
    /// Bytes downloaded this run.
    pub bytes_downloaded: u64,
    /// Stray files deleted this run.
    pub deleted: usize,
}

/// Runs the full scan → diff → delete → download pipeline for one bundle.
pub struct Synchronizer<F> {
    config: SyncConfig,
    fetcher: Arc<F>,
}

impl Synchronizer<HttpObjectFetcher> {
    /// Create a synchronizer using the real HTTP fetcher.
    pub fn new(config: SyncConfig) -> Self {
        let fetcher = Arc::new(HttpObjectFetcher::new(config.request_timeout));
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: ObjectFetcher> Synchronizer<F> {
    /// Create a synchronizer with a custom fetcher (used by tests).
    pub fn with_fetcher(config: SyncConfig, fetcher: Arc<F>) -> Self {
        Self { config, fetcher }
    }

    /// Synchronize the installation against `manifest`.
    ///
    /// Both progress callbacks are advisory; passing `None` changes
    /// nothing about the run's behavior.
    pub async fn run(
        &self,
        manifest: &Manifest,
        scan_progress: Option<ScanProgress>,
        download_progress: Option<DownloadProgress>,
    ) -> SyncResult<SyncSummary> {
        let config = &self.config;

        for dir in [&config.install_dir, &config.assets_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SyncError::CreateDirFailed {
                    path: dir.clone(),
                    source: e,
                })?;
        }

        // Hashing the whole tree is blocking work; keep it off the runtime.
        let local_state = {
            let install_dir = config.install_dir.clone();
            let include = manifest.include.clone();
            let assets_dir = config.assets_dir.clone();
            tokio::task::spawn_blocking(move || {
                scan_local_state(&install_dir, &include, &assets_dir, scan_progress.as_ref())
            })
            .await
            .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))?
        };
        let scanned = local_state.len();

        let plan = compute_diff(manifest, &local_state);
        debug!(
            to_download = plan.to_download.len(),
            to_delete = plan.to_delete.len(),
            "computed sync plan"
        );

        let deleted = apply_deletions(config, &plan)?;

        let pending = Arc::new(PendingSet::new(plan.to_download));
        let resolver = Arc::new(ObjectResolver::new(
            config.install_dir.clone(),
            config.assets_dir.clone(),
        ));
        let cancel = CancellationToken::new();

        let reporter = download_progress.map(|callback| {
            spawn_reporter(
                Arc::clone(&pending),
                cancel.clone(),
                config.progress_interval,
                callback,
            )
        });

        let orchestrator = DownloadOrchestrator::new(
            Arc::clone(&self.fetcher),
            config.workers,
            config.attempt_budget,
        );
        let result = orchestrator
            .run(
                Arc::clone(&pending),
                resolver,
                &config.base_url,
                &config.bundle,
                cancel.clone(),
            )
            .await;

        // On success the reporter exits on its own once the set drains;
        // on a fatal error the failing worker has already cancelled the
        // shared token.
        if let Some(handle) = reporter {
            let _ = handle.await;
        }

        let stats = result?;
        info!(
            bundle = %config.bundle,
            downloaded = stats.objects,
            deleted,
            "synchronization complete"
        );

        Ok(SyncSummary {
            objects_total: manifest.objects.len(),
            scanned,
            downloaded: stats.objects,
            bytes_downloaded: stats.bytes,
            deleted,
        })
    }
}

/// Remove stray local files before downloads begin.
///
/// Only non-asset keys ever appear in the deletion set; a file that
/// vanished between scan and delete is treated as already done.
fn apply_deletions(config: &SyncConfig, plan: &SyncPlan) -> SyncResult<usize> {
    let mut deleted = 0;
    for key in &plan.to_delete {
        let path = join_install_path(config, key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(key = %key, "deleted stray file");
                deleted += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SyncError::DeleteFailed { path, source: e });
            }
        }
    }
    Ok(deleted)
}

fn join_install_path(config: &SyncConfig, key: &str) -> std::path::PathBuf {
    let mut path = config.install_dir.clone();
    for part in key.split('/').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::http::tests::RecordingFetcher;
    use super::*;
    use crate::scan::hash_bytes;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Fetcher that serves per-URL bodies, like a tiny object endpoint.
    struct MapFetcher {
        bodies: BTreeMap<String, Vec<u8>>,
        fetched: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn new(bodies: &[(&str, &[u8])]) -> Self {
            Self {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_vec()))
                    .collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    impl ObjectFetcher for MapFetcher {
        fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> FetchFuture<'a> {
            Box::pin(async move {
                self.fetched.lock().unwrap().push(url.to_string());
                let body = self.bodies.get(url).ok_or(FetchError::Status { code: 404 })?;
                tokio::fs::write(dest, body)
                    .await
                    .map_err(|e| FetchError::Write {
                        path: dest.to_path_buf(),
                        source: e,
                    })?;
                Ok(body.len() as u64)
            })
        }
    }

    fn test_config(temp: &TempDir) -> SyncConfig {
        SyncConfig::new(
            "http://packs.test/",
            "modpack-x",
            temp.path().join("install"),
            temp.path().join("assets"),
        )
        .with_progress_interval(std::time::Duration::from_millis(5))
    }

    fn test_manifest(objects: &[(&str, &str)], include: &[&str]) -> Manifest {
        serde_json::from_value(serde_json::json!({
            "name": "modpack-x",
            "version": "1.0",
            "include": include,
            "objects": objects
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }))
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_pipeline_downloads_and_deletes() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let install = config.install_dir.clone();

        // One up-to-date file, one stray, one missing object + one asset.
        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(install.join("a.txt"), b"A").unwrap();
        std::fs::write(install.join("c.txt"), b"stray").unwrap();

        let manifest = test_manifest(
            &[
                ("a.txt", &hash_bytes(b"A")),
                ("mods/foo.jar", &hash_bytes(b"JAR")),
                ("assets/b.png", &hash_bytes(b"PNG")),
            ],
            &["a.txt", "c.txt", "mods"],
        );

        let fetcher = Arc::new(MapFetcher::new(&[
            ("http://packs.test/modpack-x/mods/foo.jar", b"JAR".as_slice()),
            ("http://packs.test/modpack-x/assets/b.png", b"PNG".as_slice()),
        ]));
        let sync = Synchronizer::with_fetcher(config.clone(), Arc::clone(&fetcher));

        let summary = sync.run(&manifest, None, None).await.unwrap();

        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.bytes_downloaded, 6);
        assert!(install.join("mods/foo.jar").is_file());
        assert!(config.assets_dir.join("b.png").is_file());
        assert!(!install.join("c.txt").exists());

        // A second run over unchanged state is a no-op.
        let summary = sync.run(&manifest, None, None).await.unwrap();
        assert_eq!(summary.downloaded, 0);
        assert_eq!(summary.deleted, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stale_file_is_replaced() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let install = config.install_dir.clone();

        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(install.join("options.txt"), b"old").unwrap();

        let manifest = test_manifest(
            &[("options.txt", &hash_bytes(b"new"))],
            &["options.txt"],
        );
        let fetcher = Arc::new(MapFetcher::new(&[(
            "http://packs.test/modpack-x/options.txt",
            b"new".as_slice(),
        )]));

        let summary = Synchronizer::with_fetcher(config, Arc::clone(&fetcher))
            .run(&manifest, None, None)
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(std::fs::read(install.join("options.txt")).unwrap(), b"new");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_progress_callbacks_observe_the_run() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);

        let manifest = test_manifest(&[("a.txt", &hash_bytes(b"A"))], &["a.txt"]);
        let fetcher = Arc::new(MapFetcher::new(&[(
            "http://packs.test/modpack-x/a.txt",
            b"A".as_slice(),
        )]));

        let reports = Arc::new(Mutex::new(Vec::new()));
        let reports_clone = Arc::clone(&reports);
        let scan_calls = Arc::new(AtomicUsize::new(0));
        let scan_calls_clone = Arc::clone(&scan_calls);

        Synchronizer::with_fetcher(config, fetcher)
            .run(
                &manifest,
                Some(Box::new(move |_, _| {
                    scan_calls_clone.fetch_add(1, Ordering::SeqCst);
                })),
                Some(Box::new(move |done, total| {
                    reports_clone.lock().unwrap().push((done, total));
                })),
            )
            .await
            .unwrap();

        assert_eq!(*reports.lock().unwrap().last().unwrap(), (1, 1));
        // Nothing local to hash, so the scan callback never fires.
        assert_eq!(scan_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_run_reports_offending_key() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);

        let manifest = test_manifest(&[("missing.bin", "ffff")], &[]);
        let fetcher = Arc::new(MapFetcher::new(&[]));

        let err = Synchronizer::with_fetcher(config, fetcher)
            .run(&manifest, None, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::TransferRejected { key, .. } if key == "missing.bin"
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_assets_survive_even_when_undeclared() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);

        std::fs::create_dir_all(&config.assets_dir).unwrap();
        std::fs::write(config.assets_dir.join("legacy.png"), b"old asset").unwrap();

        let manifest = test_manifest(&[], &[]);
        let fetcher = Arc::new(RecordingFetcher::new(b""));

        let summary = Synchronizer::with_fetcher(config.clone(), fetcher)
            .run(&manifest, None, None)
            .await
            .unwrap();

        assert_eq!(summary.deleted, 0);
        assert!(config.assets_dir.join("legacy.png").is_file());
    }
}
