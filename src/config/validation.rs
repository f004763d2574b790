//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, amounts > 0, addresses parse)
//! - Check cross-section consistency (await mode fits in the request timeout)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FaucetConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{ChainMode, ConfirmationMode, FaucetConfig};
use crate::funding::transaction::{parse_amount, validate_denom};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &FaucetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }

    let chain = &config.chain;
    if chain.mode == ChainMode::Rpc {
        if let Err(e) = chain.rpc_url.parse::<url::Url>() {
            errors.push(ValidationError::new("chain.rpc_url", e.to_string()));
        }
        for url in &chain.failover_urls {
            if url.parse::<url::Url>().is_err() {
                errors.push(ValidationError::new(
                    "chain.failover_urls",
                    format!("'{}' is not a URL", url),
                ));
            }
        }
    } else if parse_amount(&chain.simulated_funding_balance).is_err() {
        errors.push(ValidationError::new(
            "chain.simulated_funding_balance",
            "must be a positive integer",
        ));
    }
    if chain.chain_id == 0 {
        errors.push(ValidationError::new("chain.chain_id", "must be > 0"));
    }
    if let Err(e) = validate_denom(&chain.denom) {
        errors.push(ValidationError::new("chain.denom", e.to_string()));
    }
    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be > 0"));
    }
    if chain.gas_limit < 21_000 {
        errors.push(ValidationError::new(
            "chain.gas_limit",
            "must cover a plain transfer (>= 21000)",
        ));
    }
    if !(chain.gas_price_multiplier.is_finite() && chain.gas_price_multiplier >= 1.0) {
        errors.push(ValidationError::new(
            "chain.gas_price_multiplier",
            "must be a finite value >= 1.0",
        ));
    }

    let funding = &config.funding;
    if let Err(e) = parse_amount(&funding.transfer_amount) {
        errors.push(ValidationError::new("funding.transfer_amount", e.to_string()));
    }
    if funding.broadcast_timeout_secs == 0 {
        errors.push(ValidationError::new("funding.broadcast_timeout_secs", "must be > 0"));
    }
    if funding.broadcast_retries == 0 {
        errors.push(ValidationError::new("funding.broadcast_retries", "must be >= 1"));
    }
    if funding.retry_base_delay_ms > funding.retry_max_delay_ms {
        errors.push(ValidationError::new(
            "funding.retry_base_delay_ms",
            "must not exceed retry_max_delay_ms",
        ));
    }

    let confirmation = &config.confirmation;
    if confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::new("confirmation.poll_interval_ms", "must be > 0"));
    }
    if confirmation.timeout_secs == 0 {
        errors.push(ValidationError::new("confirmation.timeout_secs", "must be > 0"));
    }
    if confirmation.max_tracked == 0 {
        errors.push(ValidationError::new("confirmation.max_tracked", "must be > 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if funding.confirmation_mode == ConfirmationMode::Await
        && config.timeouts.request_secs <= confirmation.timeout_secs + funding.broadcast_timeout_secs
    {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must exceed confirmation.timeout_secs + funding.broadcast_timeout_secs in await mode",
        ));
    }

    if config.rate_limit.enabled
        && (config.rate_limit.requests_per_minute == 0 || config.rate_limit.burst_size == 0)
    {
        errors.push(ValidationError::new(
            "rate_limit",
            "requests_per_minute and burst_size must be > 0 when enabled",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&FaucetConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = FaucetConfig::default();
        config.funding.transfer_amount = "0".to_string();
        config.chain.denom = String::new();
        config.chain.chain_id = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"funding.transfer_amount"));
        assert!(fields.contains(&"chain.denom"));
        assert!(fields.contains(&"chain.chain_id"));
    }

    #[test]
    fn test_await_mode_needs_room_in_request_timeout() {
        let mut config = FaucetConfig::default();
        config.funding.confirmation_mode = ConfirmationMode::Await;
        config.confirmation.timeout_secs = 30;
        config.funding.broadcast_timeout_secs = 10;
        config.timeouts.request_secs = 35;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "timeouts.request_secs");

        config.timeouts.request_secs = 45;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rpc_url_ignored_in_simulated_mode() {
        let mut config = FaucetConfig::default();
        config.chain.rpc_url = "not a url".to_string();
        assert!(validate_config(&config).is_err());

        config.chain.mode = ChainMode::Simulated;
        assert!(validate_config(&config).is_ok());
    }
}
