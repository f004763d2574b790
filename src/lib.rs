//! Token faucet service library.
//!
//! Dispenses a fixed amount of the native token from one funding account to
//! any address that asks, over a small HTTP API.

pub mod chain;
pub mod config;
pub mod funding;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::FaucetConfig;
pub use funding::FundingService;
pub use http::FaucetServer;
pub use lifecycle::Shutdown;
