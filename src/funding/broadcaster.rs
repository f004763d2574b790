//! Broadcast of signed transfers.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use tokio::time::timeout;

use crate::chain::{format_tx_hash, BroadcastError, NodeClient};
use crate::funding::transaction::SignedTransfer;
use crate::observability::metrics;

/// Submits signed transfers to the node under a hard deadline.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    node: Arc<dyn NodeClient>,
    timeout: Duration,
}

impl Broadcaster {
    pub fn new(node: Arc<dyn NodeClient>, timeout: Duration) -> Self {
        Self { node, timeout }
    }

    /// Submit `transfer`. `Ok` means the node accepted it into its pool.
    ///
    /// When the deadline passes the outcome is unknown and the error carries
    /// the locally computed hash.
    pub async fn broadcast(&self, transfer: &SignedTransfer) -> Result<TxHash, BroadcastError> {
        let result = match timeout(self.timeout, self.node.broadcast_raw(&transfer.raw)).await {
            Ok(result) => result,
            Err(_) => Err(BroadcastError::Timeout {
                tx_hash: transfer.tx_hash,
                after: self.timeout,
            }),
        };

        match &result {
            Ok(tx_hash) => {
                if *tx_hash != transfer.tx_hash {
                    tracing::warn!(
                        local = %format_tx_hash(&transfer.tx_hash),
                        node = %format_tx_hash(tx_hash),
                        "Node reported a different transaction hash"
                    );
                }
                metrics::record_broadcast("accepted");
            }
            Err(e) => {
                tracing::warn!(
                    sequence = transfer.sequence,
                    error = %e,
                    "Broadcast failed"
                );
                metrics::record_broadcast(e.kind());
            }
        }

        result
    }
}
