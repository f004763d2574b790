//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming funding request:
//!     → rate_limit.rs (per-IP token bucket)
//!     → body size limit (tower-http, see http::server)
//!     → handler
//! ```

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiterState};
