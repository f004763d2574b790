//! Per-client token bucket rate limiting for the funding routes.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::http::response::ApiError;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_per_sec: f64, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_full(&self, capacity: f64, refill_per_sec: f64, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens + elapsed * refill_per_sec >= capacity
    }
}

/// Buckets keyed by client IP.
pub struct RateLimiterState {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    refill_per_sec: f64,
    burst: f64,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            refill_per_sec: f64::from(config.requests_per_minute) / 60.0,
            burst: f64::from(config.burst_size.max(1)),
        }
    }

    /// Take one token for `client`.
    pub fn check(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let bucket = buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(self.burst, now));
        bucket.try_acquire(self.burst, self.refill_per_sec, now)
    }

    /// Forget clients whose bucket has refilled completely.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let before = buckets.len();
        buckets.retain(|_, bucket| !bucket.is_full(self.burst, self.refill_per_sec, now));
        before - buckets.len()
    }

    /// Periodically evict idle clients until shutdown.
    pub fn spawn_janitor(
        self: &Arc<Self>,
        every: Duration,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        state.evict_idle();
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }
}

/// Middleware applied to the funding routes.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let Some(client) = client else {
        return next.run(request).await;
    };

    if state.check(client) {
        next.run(request).await
    } else {
        let path = request.uri().path().to_string();
        tracing::warn!(client = %client, path = %path, "Rate limit exceeded");
        metrics::record_rate_limited(&path);
        ApiError::rate_limited().into_response()
    }
}
