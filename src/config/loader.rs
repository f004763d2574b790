//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ChainMode, ConfirmationMode, FaucetConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable carrying the funding account private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "FAUCET_FUNDING_PRIVATE_KEY";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a configuration from a TOML file without validating it.
pub fn load_file(path: &Path) -> Result<FaucetConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load configuration: TOML file (or defaults), then `FAUCET_*` environment
/// overrides, then `overrides` (command-line flags), then validation.
pub fn load_config<F>(path: Option<&Path>, overrides: F) -> Result<FaucetConfig, ConfigError>
where
    F: FnOnce(&mut FaucetConfig),
{
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => FaucetConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `FAUCET_*` overrides read through `lookup`.
pub fn apply_env_overrides<F>(config: &mut FaucetConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("FAUCET_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(url) = lookup("FAUCET_RPC_URL") {
        config.chain.rpc_url = url;
    }
    if let Some(value) = lookup("FAUCET_CHAIN_ID") {
        config.chain.chain_id = parse_env("FAUCET_CHAIN_ID", value)?;
    }
    if let Some(denom) = lookup("FAUCET_DENOM") {
        config.chain.denom = denom;
    }
    if let Some(value) = lookup("FAUCET_CHAIN_MODE") {
        config.chain.mode = match value.to_lowercase().as_str() {
            "rpc" => ChainMode::Rpc,
            "simulated" => ChainMode::Simulated,
            _ => return Err(ConfigError::Env { var: "FAUCET_CHAIN_MODE", value }),
        };
    }
    if let Some(amount) = lookup("FAUCET_TRANSFER_AMOUNT") {
        config.funding.transfer_amount = amount;
    }
    if let Some(value) = lookup("FAUCET_CONFIRMATION_MODE") {
        config.funding.confirmation_mode = match value.to_lowercase().as_str() {
            "async" => ConfirmationMode::Async,
            "await" => ConfirmationMode::Await,
            _ => return Err(ConfigError::Env { var: "FAUCET_CONFIRMATION_MODE", value }),
        };
    }
    if let Some(key) = lookup(PRIVATE_KEY_ENV_VAR) {
        config.funding.private_key = Some(key);
    }
    if let Some(level) = lookup("FAUCET_LOG_LEVEL") {
        config.observability.log_level = level;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Env { var, value })
}
