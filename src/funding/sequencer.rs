//! Funding account sequence (nonce) ownership.
//!
//! The counter is the single serialization point of the pipeline: one lease
//! exists at a time, and it spans build, sign and broadcast of exactly one
//! transaction.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard};

use crate::observability::metrics;

/// Owner of the funding account's next unused sequence.
#[derive(Debug)]
pub struct Sequencer {
    next: Mutex<u64>,
    /// Lock-free copy of `next` for status reads.
    observed: AtomicU64,
}

impl Sequencer {
    /// Start counting from `next`, normally the node's pending nonce.
    pub fn new(next: u64) -> Self {
        metrics::record_next_sequence(next);
        Self {
            next: Mutex::new(next),
            observed: AtomicU64::new(next),
        }
    }

    /// Wait for exclusive use of the counter.
    pub async fn acquire(&self) -> SequenceLease<'_> {
        let guard = self.next.lock().await;
        let sequence = *guard;
        SequenceLease {
            guard,
            sequence,
            observed: &self.observed,
        }
    }

    /// Next unused sequence as last published. Never blocks.
    pub fn peek(&self) -> u64 {
        self.observed.load(Ordering::SeqCst)
    }

    /// Replace the counter with `next` only if it still holds `stale`.
    ///
    /// Returns false when another holder already moved the counter.
    pub async fn resync_from(&self, stale: u64, next: u64) -> bool {
        let mut guard = self.next.lock().await;
        if *guard != stale {
            return false;
        }
        tracing::info!(previous = *guard, next, "Sequence resynchronized");
        *guard = next;
        self.observed.store(next, Ordering::SeqCst);
        metrics::record_next_sequence(next);
        true
    }
}

/// Exclusive hold on one sequence. Dropping it is `release(false)`.
#[derive(Debug)]
pub struct SequenceLease<'a> {
    guard: MutexGuard<'a, u64>,
    sequence: u64,
    observed: &'a AtomicU64,
}

impl SequenceLease<'_> {
    /// The sequence this lease grants.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Give the counter back. `committed` advances it past this sequence;
    /// otherwise the same sequence goes to the next holder.
    pub fn release(mut self, committed: bool) {
        if committed {
            let next = self.sequence + 1;
            *self.guard = next;
            self.observed.store(next, Ordering::SeqCst);
            metrics::record_next_sequence(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_commit_advances_and_abort_does_not() {
        let sequencer = Sequencer::new(5);

        let lease = sequencer.acquire().await;
        assert_eq!(lease.sequence(), 5);
        lease.release(false);
        assert_eq!(sequencer.peek(), 5);

        let lease = sequencer.acquire().await;
        assert_eq!(lease.sequence(), 5);
        lease.release(true);
        assert_eq!(sequencer.peek(), 6);

        drop(sequencer.acquire().await);
        assert_eq!(sequencer.acquire().await.sequence(), 6);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_holder() {
        let sequencer = Arc::new(Sequencer::new(0));
        let lease = sequencer.acquire().await;

        let waiter = {
            let sequencer = sequencer.clone();
            tokio::spawn(async move {
                let lease = sequencer.acquire().await;
                let seq = lease.sequence();
                lease.release(true);
                seq
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        lease.release(true);
        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(sequencer.peek(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_commits_are_gapless() {
        let sequencer = Arc::new(Sequencer::new(10));
        let mut handles = Vec::new();
        for _ in 0..50 {
            let sequencer = sequencer.clone();
            handles.push(tokio::spawn(async move {
                let lease = sequencer.acquire().await;
                let seq = lease.sequence();
                tokio::task::yield_now().await;
                lease.release(true);
                seq
            }));
        }

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (10..60).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_resync_from_respects_moved_counter() {
        let sequencer = Sequencer::new(3);
        assert!(!sequencer.resync_from(2, 9).await);
        assert_eq!(sequencer.peek(), 3);

        assert!(sequencer.resync_from(3, 9).await);
        assert_eq!(sequencer.peek(), 9);

        // Resyncing backwards is allowed; the node is authoritative.
        assert!(sequencer.resync_from(9, 1).await);
        assert_eq!(sequencer.acquire().await.sequence(), 1);
    }
}
