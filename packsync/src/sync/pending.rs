//! The shared pending-download set.

use std::collections::HashSet;
use std::sync::Mutex;

/// The mutable set of object keys still awaiting download, shared across
/// all workers.
///
/// Claiming is one indivisible lock-remove operation, so no two workers
/// ever observe the same key. A key leaves the set the instant it is
/// claimed, before its transfer completes, so the remaining count is an
/// optimistic lower bound on outstanding work rather than an exact count
/// of incomplete transfers. Progress reporting and retry accounting are
/// therefore claim-based; a deliberate approximation that affects only
/// observability, not correctness.
#[derive(Debug)]
pub struct PendingSet {
    keys: Mutex<HashSet<String>>,
    total: usize,
}

impl PendingSet {
    /// Create a pending set over the keys to download.
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        let keys: HashSet<String> = keys.into_iter().collect();
        let total = keys.len();
        Self {
            keys: Mutex::new(keys),
            total,
        }
    }

    /// Atomically claim one key, removing it from the set.
    ///
    /// Returns `None` when no work is left. Claim order is unspecified.
    pub fn claim(&self) -> Option<String> {
        let mut keys = self.keys.lock().unwrap();
        let key = keys.iter().next().cloned()?;
        keys.remove(&key);
        Some(key)
    }

    /// Number of keys not yet claimed.
    pub fn remaining(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    /// True when every key has been claimed.
    pub fn is_drained(&self) -> bool {
        self.remaining() == 0
    }

    /// Number of keys the set started with.
    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_drains_the_set() {
        let pending = PendingSet::new(["a".to_string(), "b".to_string()]);
        assert_eq!(pending.total(), 2);
        assert_eq!(pending.remaining(), 2);

        let first = pending.claim().unwrap();
        let second = pending.claim().unwrap();
        assert_ne!(first, second);
        assert!(pending.claim().is_none());
        assert!(pending.is_drained());
    }

    #[test]
    fn test_total_is_stable_after_claims() {
        let pending = PendingSet::new(["a".to_string()]);
        pending.claim();
        assert_eq!(pending.total(), 1);
        assert_eq!(pending.remaining(), 0);
    }

    #[test]
    fn test_concurrent_claims_are_exclusive() {
        use std::sync::Arc;

        let keys: Vec<String> = (0..100).map(|i| format!("k{}", i)).collect();
        let pending = Arc::new(PendingSet::new(keys));
        let claimed = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pending = Arc::clone(&pending);
                let claimed = Arc::clone(&claimed);
                std::thread::spawn(move || {
                    while let Some(key) = pending.claim() {
                        claimed.lock().unwrap().push(key);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut claimed = claimed.lock().unwrap().clone();
        claimed.sort();
        claimed.dedup();
        assert_eq!(claimed.len(), 100);
    }
}
