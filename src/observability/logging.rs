//! Structured logging.
//!
//! `RUST_LOG` wins when set; otherwise `observability.log_level` applies to
//! this crate and `tower_http`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter used by [`init_tracing`].
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("faucet_service={log_level},tower_http={log_level}")))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(log_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_level() {
        let filter = env_filter("debug");
        assert!(filter.to_string().contains("debug"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing("info");
        init_tracing("info");
    }
}
