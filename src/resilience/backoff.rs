//! Broadcast retry timing.

use std::time::Duration;

use rand::Rng;

use crate::config::FundingConfig;

/// Retry budget and delays for broadcasts that found no node.
///
/// Retry `n` (1-based) waits `base * 2^(n-1)`, capped at `max`, plus up to a
/// tenth of that as jitter so concurrent requests do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    attempts: u32,
    base: Duration,
    max: Duration,
}

impl RetryBackoff {
    pub fn new(attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base,
            max: max.max(base),
        }
    }

    pub fn from_config(config: &FundingConfig) -> Self {
        Self::new(
            config.broadcast_retries,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_millis(config.retry_max_delay_ms),
        )
    }

    /// Total broadcast attempts, the first one included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether another attempt is allowed after `attempt` failed.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.attempts
    }

    /// Delay before retry number `retry`.
    pub fn delay(&self, retry: u32) -> Duration {
        let capped = self.ceiling(retry);
        if capped.is_zero() {
            return capped;
        }
        capped + rand::thread_rng().gen_range(Duration::ZERO..=capped / 10)
    }

    fn ceiling(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}
