//! Route handlers.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};

use crate::chain::{format_tx_hash, parse_tx_hash};
use crate::http::request::{FundRequest, TxQuery};
use crate::http::response::{
    ApiError, FundResponse, GenFundedResponse, HealthResponse, StatusResponse, TxResponse,
};
use crate::http::server::AppState;
use crate::funding::ConfirmationState;
use crate::observability::metrics;

/// `POST /api/faucet/v1/fund`
pub async fn fund(
    State(state): State<AppState>,
    body: Result<Json<FundRequest>, JsonRejection>,
) -> Result<Json<FundResponse>, ApiError> {
    let start = Instant::now();
    let Json(request) = body.map_err(|e| {
        metrics::record_request("fund", "invalid_body", start);
        ApiError::bad_request(e.body_text())
    })?;

    match state.service.fund(&request.address).await {
        Ok(receipt) => {
            metrics::record_request("fund", "ok", start);
            let block_height = match receipt.confirmation {
                Some(ConfirmationState::Confirmed { block_height }) => Some(block_height),
                _ => None,
            };
            Ok(Json(FundResponse {
                tx_hash: format_tx_hash(&receipt.tx_hash),
                block_height,
            }))
        }
        Err(e) => {
            tracing::warn!(address = %request.address, error = %e, "Funding request failed");
            let error = ApiError::from(e);
            metrics::record_request("fund", error.code, start);
            Err(error)
        }
    }
}

/// `POST /api/faucet/v1/gen-funded`
pub async fn gen_funded(State(state): State<AppState>) -> Result<Json<GenFundedResponse>, ApiError> {
    let start = Instant::now();
    match state.service.generate_and_fund().await {
        Ok(funded) => {
            metrics::record_request("gen_funded", "ok", start);
            Ok(Json(GenFundedResponse {
                address: funded.address.to_string(),
                tx_hash: format_tx_hash(&funded.receipt.tx_hash),
            }))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Generate-and-fund request failed");
            let error = ApiError::from(e);
            metrics::record_request("gen_funded", error.code, start);
            Err(error)
        }
    }
}

/// `GET /api/faucet/v1/tx/{tx_hash}`
pub async fn tx_status(
    State(state): State<AppState>,
    Path(raw_hash): Path<String>,
    Query(query): Query<TxQuery>,
) -> Result<Json<TxResponse>, ApiError> {
    let tx_hash = parse_tx_hash(&raw_hash).ok_or_else(|| {
        ApiError::new(
            axum::http::StatusCode::BAD_REQUEST,
            "INVALID_TX_HASH",
            format!("'{}' is not a 32-byte hex transaction hash", raw_hash),
        )
    })?;

    let tx = if query.wait {
        // A disconnecting client drops this future, which stops the tracker.
        state
            .service
            .await_transaction(tx_hash, std::future::pending::<()>())
            .await
    } else {
        state.service.transaction(&tx_hash)
    };

    tx.map(|tx| Json(TxResponse::from(tx)))
        .ok_or_else(|| ApiError::not_found(format!("transaction {} is not tracked", raw_hash)))
}

/// `GET /api/faucet/v1/status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::from(state.service.status().await))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let reachable = state.service.node().is_healthy().await;
    HealthResponse::new(reachable, state.service.funding_address())
}
