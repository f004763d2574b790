//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Broadcast to node:
//!     → funding::broadcaster (hard deadline per attempt)
//!     → On NodeUnavailable: backoff.rs (exponential delay with jitter)
//!     → rebuild with the same sequence and retry
//! ```

pub mod backoff;

pub use backoff::RetryBackoff;
