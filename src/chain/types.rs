//! Chain-specific types and error definitions.

use std::time::Duration;

use alloy::primitives::{hex, TxHash};
use thiserror::Error;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Errors from read-side node operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for read-side node operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Why a broadcast did not produce an accepted transaction.
///
/// The variant decides what happens to the sequence the transaction carried:
/// `NodeUnavailable` and `Rejected` never reached the pool, so the sequence is
/// reused; `Timeout` is ambiguous and the sequence is treated as spent.
#[derive(Debug, Clone, Error)]
pub enum BroadcastError {
    /// No node could be reached. Safe to retry with the same sequence.
    #[error("Node unavailable: {0}")]
    NodeUnavailable(String),

    /// The node refused the transaction (sequence mismatch, insufficient funds, ...).
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The broadcast did not answer in time; acceptance is unknown.
    #[error("Broadcast of {} timed out after {:?}; acceptance unknown", format_tx_hash(.tx_hash), .after)]
    Timeout { tx_hash: TxHash, after: Duration },
}

impl BroadcastError {
    /// Whether the rejection reason says the sequence did not match the
    /// account's expected next value.
    pub fn is_sequence_mismatch(&self) -> bool {
        match self {
            BroadcastError::Rejected(reason) => {
                let reason = reason.to_lowercase();
                ["nonce too low", "nonce too high", "invalid nonce", "sequence mismatch"]
                    .iter()
                    .any(|needle| reason.contains(needle))
            }
            _ => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BroadcastError::NodeUnavailable(_) => "node_unavailable",
            BroadcastError::Rejected(_) => "rejected",
            BroadcastError::Timeout { .. } => "timeout",
        }
    }
}

/// The node's view of a transaction at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Not in any block yet (pending in the pool, or unknown to the node).
    NotIncluded,
    /// Included in a block. `execution_error` is set when the transaction
    /// was included but failed on-chain.
    Included {
        block_height: u64,
        execution_error: Option<String>,
    },
}

/// Render a transaction hash as 64 lowercase hex characters.
pub fn format_tx_hash(hash: &TxHash) -> String {
    hex::encode(hash.as_slice())
}

/// Parse a transaction hash, with or without a `0x` prefix.
pub fn parse_tx_hash(value: &str) -> Option<TxHash> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.len() != 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let bytes = hex::decode(digits).ok()?;
    TxHash::try_from(bytes.as_slice()).ok()
}
