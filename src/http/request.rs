//! Request-side types: request IDs and API payloads.

use axum::http::{HeaderName, HeaderValue, Request};
use serde::Deserialize;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Read the correlation ID of a request, if set.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Body of `POST /api/faucet/v1/fund`.
#[derive(Debug, Clone, Deserialize)]
pub struct FundRequest {
    pub address: String,
}

/// Query of `GET /api/faucet/v1/tx/{tx_hash}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxQuery {
    #[serde(default)]
    pub wait: bool,
}
