//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, FAUCET_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → FaucetConfig (validated, immutable)
//!     → handed to startup, which wires the subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The funding private key is never serialized back out

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, PRIVATE_KEY_ENV_VAR};
pub use schema::{
    ChainConfig, ChainMode, ConfirmationConfig, ConfirmationMode, FaucetConfig, FundingConfig,
    ListenerConfig, ObservabilityConfig, RateLimitConfig, TimeoutConfig,
};
