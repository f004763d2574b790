//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the faucet.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the faucet service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FaucetConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Chain descriptor and node connection settings.
    pub chain: ChainConfig,

    /// Funding account and transfer settings.
    pub funding: FundingConfig,

    /// Confirmation tracking settings.
    pub confirmation: ConfirmationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8090").
    pub bind_address: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8090".to_string(),
            max_body_bytes: 16 * 1024,
        }
    }
}

/// How the faucet reaches the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChainMode {
    /// JSON-RPC node at `rpc_url`.
    #[default]
    Rpc,
    /// In-process simulated chain, for local development.
    Simulated,
}

/// Chain descriptor: network identity, denom and node endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Node backend.
    pub mode: ChainMode,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID embedded in every signed transaction.
    pub chain_id: u64,

    /// Display name of the native token denomination.
    pub denom: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Gas limit for a plain transfer.
    pub gas_limit: u64,

    /// Gas price multiplier (1.0 = node estimate, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Block interval of the simulated chain in milliseconds.
    pub simulated_block_time_ms: u64,

    /// Initial funding balance of the simulated chain, in base units.
    pub simulated_funding_balance: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            mode: ChainMode::Rpc,
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337,
            denom: "wei".to_string(),
            rpc_timeout_secs: 10,
            gas_limit: 21_000,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
            simulated_block_time_ms: 1_000,
            simulated_funding_balance: "1000000000000000000000000".to_string(),
        }
    }
}

/// Whether `/fund` waits for inclusion before answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationMode {
    /// Return the hash right after broadcast; callers poll for inclusion.
    #[default]
    Async,
    /// Run the confirmation tracker before responding.
    Await,
}

/// Funding account and transfer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FundingConfig {
    /// Hex private key of the funding account. Prefer the
    /// `FAUCET_FUNDING_PRIVATE_KEY` environment variable.
    #[serde(skip_serializing)]
    pub private_key: Option<String>,

    /// Amount sent per request, in base units of `chain.denom`.
    pub transfer_amount: String,

    /// Broadcast call timeout in seconds.
    pub broadcast_timeout_secs: u64,

    /// Attempts made when the node is unavailable.
    pub broadcast_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Whether `/fund` awaits confirmation.
    pub confirmation_mode: ConfirmationMode,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            transfer_amount: "1000000".to_string(),
            broadcast_timeout_secs: 10,
            broadcast_retries: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 2_000,
            confirmation_mode: ConfirmationMode::Async,
        }
    }
}

/// Confirmation tracking settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Status polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Default confirmation deadline in seconds.
    pub timeout_secs: u64,

    /// Extra blocks required on top of the inclusion block.
    pub confirmation_blocks: u32,

    /// How long resolved pending records are kept, in seconds.
    pub retention_secs: u64,

    /// Upper bound on tracked pending records.
    pub max_tracked: usize,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            timeout_secs: 30,
            confirmation_blocks: 0,
            retention_secs: 3_600,
            max_tracked: 10_000,
        }
    }
}

/// Timeout configuration for HTTP requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Per-client rate limiting on the funding endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained funding requests per minute per client IP.
    pub requests_per_minute: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_minute: 10,
            burst_size: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
