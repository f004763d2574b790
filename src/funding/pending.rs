//! In-memory registry of broadcast transactions.

use alloy::primitives::{Address, TxHash};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::funding::confirmation::ConfirmationState;
use crate::observability::metrics;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A transfer the node accepted (or may have accepted, after a timeout).
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub tx_hash: TxHash,
    pub sequence: u64,
    pub recipient: Address,
    /// Submission time (seconds since epoch).
    pub submitted_at: u64,
    pub status: ConfirmationState,
    /// When `status` left `Pending` (seconds since epoch).
    pub resolved_at: Option<u64>,
}

/// Concurrent map of tracked transactions, bounded by age and count.
#[derive(Debug, Clone)]
pub struct PendingRegistry {
    inner: Arc<DashMap<TxHash, PendingTransaction>>,
    retention: Duration,
    max_tracked: usize,
}

impl PendingRegistry {
    pub fn new(retention: Duration, max_tracked: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            retention,
            max_tracked,
        }
    }

    /// Track a freshly broadcast transaction.
    pub fn record(&self, tx_hash: TxHash, sequence: u64, recipient: Address) {
        self.inner.insert(
            tx_hash,
            PendingTransaction {
                tx_hash,
                sequence,
                recipient,
                submitted_at: now_secs(),
                status: ConfirmationState::Pending,
                resolved_at: None,
            },
        );
        metrics::record_pending_size(self.inner.len());
    }

    /// Store a tracker outcome. Unknown hashes are ignored.
    pub fn resolve(&self, tx_hash: &TxHash, status: ConfirmationState) {
        if let Some(mut entry) = self.inner.get_mut(tx_hash) {
            entry.resolved_at = status.is_terminal().then(now_secs);
            entry.status = status;
        }
    }

    pub fn get(&self, tx_hash: &TxHash) -> Option<PendingTransaction> {
        self.inner.get(tx_hash).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Count of entries still `Pending`.
    pub fn unresolved(&self) -> usize {
        self.inner
            .iter()
            .filter(|r| !r.value().status.is_terminal())
            .count()
    }

    /// Drop resolved entries older than the retention window, then evict the
    /// oldest entries (resolved first) while over `max_tracked`.
    pub fn prune(&self, now: u64) -> usize {
        let before = self.inner.len();
        let retention = self.retention.as_secs();
        self.inner
            .retain(|_, tx| tx.resolved_at.is_none_or(|at| at + retention > now));

        let excess = self.inner.len().saturating_sub(self.max_tracked);
        if excess > 0 {
            let mut candidates: Vec<(bool, u64, TxHash)> = self
                .inner
                .iter()
                .map(|r| (!r.value().status.is_terminal(), r.value().submitted_at, *r.key()))
                .collect();
            candidates.sort_unstable();
            for (_, _, hash) in candidates.into_iter().take(excess) {
                self.inner.remove(&hash);
            }
        }

        let removed = before - self.inner.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.inner.len(), "Pruned pending registry");
        }
        metrics::record_pending_size(self.inner.len());
        removed
    }

    /// Prune every `every` until shutdown.
    pub fn spawn_pruner(&self, every: Duration, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        registry.prune(now_secs());
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Pending registry pruner stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(n: u8) -> TxHash {
        TxHash::repeat_byte(n)
    }

    #[test]
    fn test_record_and_resolve() {
        let registry = PendingRegistry::new(Duration::from_secs(60), 10);
        registry.record(hash(1), 4, Address::repeat_byte(1));

        let tx = registry.get(&hash(1)).unwrap();
        assert_eq!(tx.sequence, 4);
        assert_eq!(tx.status, ConfirmationState::Pending);
        assert_eq!(registry.unresolved(), 1);

        registry.resolve(&hash(1), ConfirmationState::Confirmed { block_height: 9 });
        let tx = registry.get(&hash(1)).unwrap();
        assert!(tx.resolved_at.is_some());
        assert_eq!(registry.unresolved(), 0);

        registry.resolve(&hash(2), ConfirmationState::TimedOut);
        assert!(registry.get(&hash(2)).is_none());
    }

    #[test]
    fn test_prune_expires_only_resolved() {
        let registry = PendingRegistry::new(Duration::from_secs(60), 10);
        registry.record(hash(1), 0, Address::ZERO);
        registry.record(hash(2), 1, Address::ZERO);
        registry.resolve(&hash(1), ConfirmationState::TimedOut);

        assert_eq!(registry.prune(now_secs()), 0);
        assert_eq!(registry.prune(now_secs() + 120), 1);
        assert!(registry.get(&hash(1)).is_none());
        assert!(registry.get(&hash(2)).is_some());
    }

    #[test]
    fn test_prune_caps_size_evicting_resolved_first() {
        let registry = PendingRegistry::new(Duration::from_secs(3600), 2);
        registry.record(hash(1), 0, Address::ZERO);
        registry.record(hash(2), 1, Address::ZERO);
        registry.record(hash(3), 2, Address::ZERO);
        registry.resolve(&hash(3), ConfirmationState::Confirmed { block_height: 1 });

        assert_eq!(registry.prune(now_secs()), 1);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&hash(3)).is_none());
    }

    #[tokio::test]
    async fn test_pruner_stops_on_shutdown() {
        let registry = PendingRegistry::new(Duration::from_secs(1), 10);
        let (tx, rx) = broadcast::channel(1);
        let handle = registry.spawn_pruner(Duration::from_millis(10), rx);
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
