//! Confirmation tracking.
//!
//! A transaction moves `Pending → Confirmed | Failed | TimedOut`. Polling runs
//! on an interval and stops at the deadline or when the caller's
//! cancellation future resolves; either way the result is `TimedOut`, which
//! means "unknown", never "failed".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};

use crate::chain::{format_tx_hash, NodeClient, TxStatus};
use crate::observability::metrics;

/// Confirmation state of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ConfirmationState {
    /// Broadcast, not yet included deep enough.
    Pending,
    /// Included without execution error.
    #[serde(rename_all = "camelCase")]
    Confirmed { block_height: u64 },
    /// Included, but execution failed on-chain.
    #[serde(rename_all = "camelCase")]
    Failed { block_height: u64, reason: String },
    /// Deadline or cancellation reached first. Inclusion is unknown.
    TimedOut,
}

impl ConfirmationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationState::Pending)
    }

    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ConfirmationState::Pending => "pending",
            ConfirmationState::Confirmed { .. } => "confirmed",
            ConfirmationState::Failed { .. } => "failed",
            ConfirmationState::TimedOut => "timed_out",
        }
    }
}

/// Polls the node until a transaction resolves.
#[derive(Debug, Clone)]
pub struct ConfirmationTracker {
    node: Arc<dyn NodeClient>,
    poll_interval: Duration,
    confirmation_blocks: u32,
}

impl ConfirmationTracker {
    pub fn new(node: Arc<dyn NodeClient>, poll_interval: Duration, confirmation_blocks: u32) -> Self {
        Self {
            node,
            poll_interval,
            confirmation_blocks,
        }
    }

    /// Wait for `tx_hash` to resolve within `timeout`.
    pub async fn await_confirmation(&self, tx_hash: TxHash, timeout: Duration) -> ConfirmationState {
        self.await_with_cancel(tx_hash, timeout, std::future::pending::<()>()).await
    }

    /// Wait for `tx_hash` to resolve within `timeout`, giving up early when
    /// `cancel` completes. Never returns `Pending`.
    pub async fn await_with_cancel<C>(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
        cancel: C,
    ) -> ConfirmationState
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        let deadline = tokio::time::sleep_until(started + timeout);
        tokio::pin!(deadline);
        tokio::pin!(cancel);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = ConfirmationState::Pending;
        while !state.is_terminal() {
            state = tokio::select! {
                biased;
                _ = &mut cancel => {
                    tracing::debug!(tx_hash = %format_tx_hash(&tx_hash), "Confirmation wait cancelled");
                    ConfirmationState::TimedOut
                }
                _ = &mut deadline => ConfirmationState::TimedOut,
                polled = async {
                    ticker.tick().await;
                    self.poll(tx_hash).await
                } => polled,
            };
        }

        metrics::record_confirmation(state.label(), started.elapsed());
        tracing::info!(
            tx_hash = %format_tx_hash(&tx_hash),
            outcome = state.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Confirmation resolved"
        );
        state
    }

    /// One status query. Query errors keep the state `Pending`.
    async fn poll(&self, tx_hash: TxHash) -> ConfirmationState {
        let status = match self.node.tx_status(tx_hash).await {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(tx_hash = %format_tx_hash(&tx_hash), error = %e, "Status query failed");
                return ConfirmationState::Pending;
            }
        };

        let head = match (&status, self.confirmation_blocks) {
            (TxStatus::Included { execution_error: None, .. }, n) if n > 0 => {
                match self.node.block_height().await {
                    Ok(height) => Some(height),
                    Err(_) => return ConfirmationState::Pending,
                }
            }
            _ => None,
        };

        self.step(status, head)
    }

    /// Transition from one observed node status. `head` is the current chain
    /// height, needed only when extra confirmation depth is configured.
    pub fn step(&self, status: TxStatus, head: Option<u64>) -> ConfirmationState {
        match status {
            TxStatus::NotIncluded => ConfirmationState::Pending,
            TxStatus::Included {
                block_height,
                execution_error: Some(reason),
            } => ConfirmationState::Failed {
                block_height,
                reason,
            },
            TxStatus::Included {
                block_height,
                execution_error: None,
            } => {
                let depth = u64::from(self.confirmation_blocks);
                if depth == 0 || head.is_some_and(|head| head >= block_height + depth) {
                    ConfirmationState::Confirmed { block_height }
                } else {
                    ConfirmationState::Pending
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{FundingAccount, InMemoryNode};
    use crate::funding::transaction::TxBuilder;
    use alloy::primitives::{Address, U256};

    fn tracker(node: Arc<InMemoryNode>, confirmation_blocks: u32) -> ConfirmationTracker {
        ConfirmationTracker::new(node, Duration::from_millis(5), confirmation_blocks)
    }

    async fn submit(node: &InMemoryNode, balance: u64, amount: &str) -> TxHash {
        let account = FundingAccount::random(31337);
        node.credit(account.address(), U256::from(balance));
        let builder = TxBuilder::new(account, amount, "wei", 21_000).unwrap();
        let transfer = builder.build(0, Address::repeat_byte(3), 1).await.unwrap();
        node.broadcast_raw(&transfer.raw).await.unwrap()
    }

    #[test]
    fn test_step_transitions() {
        let node = Arc::new(InMemoryNode::new(1, Duration::ZERO));
        let shallow = tracker(node.clone(), 0);
        let deep = tracker(node, 2);

        assert_eq!(shallow.step(TxStatus::NotIncluded, None), ConfirmationState::Pending);
        let included = TxStatus::Included {
            block_height: 10,
            execution_error: None,
        };
        assert_eq!(
            shallow.step(included.clone(), None),
            ConfirmationState::Confirmed { block_height: 10 }
        );
        assert_eq!(deep.step(included.clone(), Some(11)), ConfirmationState::Pending);
        assert_eq!(
            deep.step(included, Some(12)),
            ConfirmationState::Confirmed { block_height: 10 }
        );

        let failed = TxStatus::Included {
            block_height: 10,
            execution_error: Some("out of gas".into()),
        };
        assert!(matches!(deep.step(failed, None), ConfirmationState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_included_transfer_confirms() {
        let node = Arc::new(InMemoryNode::new(31337, Duration::ZERO));
        let hash = submit(&node, 1_000_000_000, "1000").await;

        let state = tracker(node, 0).await_confirmation(hash, Duration::from_secs(2)).await;
        assert!(matches!(state, ConfirmationState::Confirmed { .. }));
    }

    #[tokio::test]
    async fn test_never_included_times_out_not_fails() {
        let node = Arc::new(InMemoryNode::new(31337, Duration::ZERO));
        node.pause_inclusion(true);
        let hash = submit(&node, 1_000_000_000, "1000").await;

        let state = tracker(node, 0).await_confirmation(hash, Duration::from_millis(50)).await;
        assert_eq!(state, ConfirmationState::TimedOut);
    }

    #[tokio::test]
    async fn test_on_chain_failure_is_failed() {
        let node = Arc::new(InMemoryNode::new(31337, Duration::ZERO));
        node.pause_inclusion(true);
        let hash = submit(&node, 1_000_000_000, "1000").await;

        // Drain the sender after admission so execution runs out of funds.
        let sender = node.accepted_transactions()[0].from;
        node.set_balance(sender, U256::ZERO);
        node.pause_inclusion(false);

        let state = tracker(node, 0).await_confirmation(hash, Duration::from_secs(2)).await;
        assert!(matches!(state, ConfirmationState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_resolves_timed_out() {
        let node = Arc::new(InMemoryNode::new(31337, Duration::ZERO));
        node.pause_inclusion(true);
        let hash = submit(&node, 1_000_000_000, "1000").await;

        let state = tracker(node, 0)
            .await_with_cancel(hash, Duration::from_secs(30), async {
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
            .await;
        assert_eq!(state, ConfirmationState::TimedOut);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let json = serde_json::to_value(ConfirmationState::Confirmed { block_height: 4 }).unwrap();
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["blockHeight"], 4);
    }
}
