//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the faucet handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, rate limit)
//! - Serve on a listener until the shutdown signal fires

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::FaucetConfig;
use crate::funding::FundingService;
use crate::http::handlers;
use crate::http::request::{request_id, MakeRequestUuid};
use crate::security::{rate_limit_middleware, RateLimiterState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FundingService>,
}

/// HTTP server for the faucet API.
pub struct FaucetServer {
    router: Router,
    config: FaucetConfig,
    limiter: Option<Arc<RateLimiterState>>,
}

impl FaucetServer {
    /// Create a new HTTP server around a funding service.
    pub fn new(config: FaucetConfig, service: Arc<FundingService>) -> Self {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiterState::new(&config.rate_limit)));

        let router = Self::build_router(&config, AppState { service }, limiter.clone());
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &FaucetConfig,
        state: AppState,
        limiter: Option<Arc<RateLimiterState>>,
    ) -> Router {
        let mut funding = Router::new()
            .route("/fund", post(handlers::fund))
            .route("/gen-funded", post(handlers::gen_funded));
        if let Some(limiter) = limiter {
            funding = funding.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let api = funding
            .route("/tx/{tx_hash}", get(handlers::tx_status))
            .route("/status", get(handlers::status));

        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id(request),
            )
        });

        Router::new()
            .nest("/api/faucet/v1", api)
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(trace)
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit = self.config.rate_limit.enabled,
            "HTTP server starting"
        );

        if let Some(limiter) = &self.limiter {
            limiter.spawn_janitor(Duration::from_secs(60), shutdown.resubscribe());
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
