//! Periodic progress reporting for a synchronization run.
//!
//! A single concurrent task samples the shrinking pending set at a fixed
//! interval and reports "completed / total" until the set drains, then
//! emits a final 100% report and stops. The signal is best-effort and
//! claim-based (see `PendingSet`); it never blocks or influences
//! orchestration, and cancelling it has no effect on correctness.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::pending::PendingSet;

/// Progress callback: (objects claimed, total objects).
pub type DownloadProgress = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Spawn the reporter task.
///
/// The task exits when the pending set drains (after a final
/// `total / total` report) or when `cancel` fires, whichever comes first.
pub fn spawn_reporter(
    pending: Arc<PendingSet>,
    cancel: CancellationToken,
    interval: Duration,
    callback: DownloadProgress,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let total = pending.total();
        loop {
            let remaining = pending.remaining();
            if remaining == 0 {
                callback(total, total);
                break;
            }
            callback(total - remaining, total);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_reporter_final_report_is_complete() {
        let pending = Arc::new(PendingSet::new(["a".to_string(), "b".to_string()]));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let reports_clone = Arc::clone(&reports);
        let callback: DownloadProgress = Box::new(move |done, total| {
            reports_clone.lock().unwrap().push((done, total));
        });

        let handle = spawn_reporter(
            Arc::clone(&pending),
            CancellationToken::new(),
            Duration::from_millis(5),
            callback,
        );

        // Drain the set while the reporter runs.
        tokio::time::sleep(Duration::from_millis(10)).await;
        while pending.claim().is_some() {}
        handle.await.unwrap();

        let reports = reports.lock().unwrap();
        assert_eq!(*reports.last().unwrap(), (2, 2));
        assert!(reports.iter().all(|&(done, total)| done <= total));
    }

    #[tokio::test]
    async fn test_reporter_stops_on_cancel() {
        let pending = Arc::new(PendingSet::new(["a".to_string()]));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let callback: DownloadProgress = Box::new(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let cancel = CancellationToken::new();
        let handle = spawn_reporter(
            pending,
            cancel.clone(),
            Duration::from_secs(60),
            callback,
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        handle.await.unwrap();

        // One sample before the long sleep, none after cancellation.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reporter_empty_set_reports_once() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let reports_clone = Arc::clone(&reports);
        let callback: DownloadProgress = Box::new(move |done, total| {
            reports_clone.lock().unwrap().push((done, total));
        });

        spawn_reporter(
            Arc::new(PendingSet::new([])),
            CancellationToken::new(),
            Duration::from_millis(5),
            callback,
        )
        .await
        .unwrap();

        assert_eq!(*reports.lock().unwrap(), [(0, 0)]);
    }
}
