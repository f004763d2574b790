//! Chain integration subsystem.
//!
//! # Data Flow
//! ```text
//! config (private key, RPC URL, chain id)
//!     → wallet.rs (funding account, signing)
//!     → client.rs (NodeClient: RPC with failover and timeouts)
//!     → memory.rs (NodeClient: in-process simulated chain)
//! ```
//!
//! # Security Constraints
//! - Private keys are never logged or returned
//! - All RPC calls have configurable timeouts
//! - Address validation happens before any node is contacted

pub mod address;
pub mod client;
pub mod keygen;
pub mod memory;
pub mod types;
pub mod wallet;

pub use address::{validate_address, validate_recipient, AddressError};
pub use client::{NodeClient, RpcNodeClient};
pub use keygen::{GeneratedAccount, KeyGenerator};
pub use memory::InMemoryNode;
pub use types::{
    format_tx_hash, parse_tx_hash, BroadcastError, ChainConfig, ChainError, ChainResult,
    TxStatus,
};
pub use wallet::FundingAccount;
