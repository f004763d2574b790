//! Metrics collection and exposition.
//!
//! # Metrics
//! - `faucet_requests_total` (counter): funding requests by endpoint, outcome
//! - `faucet_request_duration_seconds` (histogram): funding request latency
//! - `faucet_broadcasts_total` (counter): broadcast attempts by result
//! - `faucet_confirmations_total` (counter): tracker outcomes
//! - `faucet_confirmation_latency_seconds` (histogram): broadcast to inclusion
//! - `faucet_next_sequence` (gauge): the sequencer's next unused nonce
//! - `faucet_pending_transactions` (gauge): entries in the pending registry
//! - `faucet_rate_limited_total` (counter): requests refused by the limiter
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .upkeep_timeout(Duration::from_secs(5));

    match builder.install() {
        Ok(()) => tracing::info!(%addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, %addr, "Failed to install metrics exporter"),
    }
}

/// Record a finished funding request.
pub fn record_request(endpoint: &'static str, outcome: &'static str, start: Instant) {
    counter!("faucet_requests_total", "endpoint" => endpoint, "outcome" => outcome).increment(1);
    histogram!("faucet_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Record one broadcast attempt.
pub fn record_broadcast(result: &'static str) {
    counter!("faucet_broadcasts_total", "result" => result).increment(1);
}

/// Record a confirmation tracker outcome.
pub fn record_confirmation(outcome: &'static str, latency: Duration) {
    counter!("faucet_confirmations_total", "outcome" => outcome).increment(1);
    histogram!("faucet_confirmation_latency_seconds", "outcome" => outcome)
        .record(latency.as_secs_f64());
}

/// Publish the next unused sequence.
pub fn record_next_sequence(sequence: u64) {
    gauge!("faucet_next_sequence").set(sequence as f64);
}

/// Publish the pending registry size.
pub fn record_pending_size(size: usize) {
    gauge!("faucet_pending_transactions").set(size as f64);
}

/// Count a request refused by the rate limiter.
pub fn record_rate_limited(endpoint: &str) {
    counter!("faucet_rate_limited_total", "endpoint" => endpoint.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("fund", "ok", Instant::now());
        record_broadcast("accepted");
        record_confirmation("confirmed", Duration::from_millis(10));
        record_next_sequence(7);
        record_pending_size(3);
        record_rate_limited("fund");
    }
}
