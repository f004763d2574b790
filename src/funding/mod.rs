//! Funding pipeline.
//!
//! # Data Flow
//! ```text
//! fund(address) / generate_and_fund()
//!     → chain::address (validate; no sequence consumed on failure)
//!     → sequencer.rs (acquire the funding account nonce)
//!     → transaction.rs (build + sign the transfer)
//!     → broadcaster.rs (submit; settle the nonce by outcome)
//!     → pending.rs (record the hash)
//!     → confirmation.rs (poll for inclusion, inline or in the background)
//! ```

pub mod broadcaster;
pub mod confirmation;
pub mod pending;
pub mod sequencer;
pub mod service;
pub mod transaction;

pub use confirmation::{ConfirmationState, ConfirmationTracker};
pub use pending::{PendingRegistry, PendingTransaction};
pub use sequencer::{SequenceLease, Sequencer};
pub use service::{FaucetStatus, FundReceipt, FundingError, FundingService, GenFundedReceipt};
pub use transaction::{BuildError, SignedTransfer, TxBuilder};
