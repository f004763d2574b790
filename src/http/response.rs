//! Response payloads and error mapping.
//!
//! Every error leaves as `{"error": CODE, "message": text}` with a status
//! code chosen by error class; errors that concern a transaction which may
//! exist on-chain also carry its `txHash`.

use alloy::primitives::{Address, TxHash};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::chain::{format_tx_hash, BroadcastError, ChainError};
use crate::funding::{ConfirmationState, FaucetStatus, FundingError, PendingTransaction};

/// `POST /fund` success body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundResponse {
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

/// `POST /gen-funded` success body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenFundedResponse {
    pub address: String,
    pub tx_hash: String,
}

/// `GET /tx/{hash}` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResponse {
    pub tx_hash: String,
    #[serde(flatten)]
    pub state: ConfirmationState,
    pub sequence: u64,
    pub recipient: String,
    pub submitted_at: u64,
}

impl From<PendingTransaction> for TxResponse {
    fn from(tx: PendingTransaction) -> Self {
        Self {
            tx_hash: format_tx_hash(&tx.tx_hash),
            state: tx.status,
            sequence: tx.sequence,
            recipient: tx.recipient.to_string(),
            submitted_at: tx.submitted_at,
        }
    }
}

/// `GET /status` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub funding_address: String,
    pub chain_id: u64,
    pub denom: String,
    pub transfer_amount: String,
    pub next_sequence: u64,
    pub balance: Option<String>,
    pub pending_transactions: usize,
}

impl From<FaucetStatus> for StatusResponse {
    fn from(status: FaucetStatus) -> Self {
        Self {
            funding_address: status.funding_address.to_string(),
            chain_id: status.chain_id,
            denom: status.denom,
            transfer_amount: status.transfer_amount.to_string(),
            next_sequence: status.next_sequence,
            balance: status.balance.map(|b| b.to_string()),
            pending_transactions: status.pending,
        }
    }
}

/// `GET /health` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub node_reachable: bool,
    pub funding_address: String,
}

impl HealthResponse {
    pub fn new(node_reachable: bool, funding_address: Address) -> (StatusCode, Json<Self>) {
        let status = if node_reachable {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (
            status,
            Json(Self {
                status: if node_reachable { "ok" } else { "degraded" },
                node_reachable,
                funding_address: funding_address.to_string(),
            }),
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tx_hash: Option<String>,
}

/// An error on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub tx_hash: Option<TxHash>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Too many funding requests, slow down",
        )
    }
}

impl From<FundingError> for ApiError {
    fn from(err: FundingError) -> Self {
        let (status, code) = match &err {
            FundingError::Validation(_) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
            FundingError::Build(_) => (StatusCode::INTERNAL_SERVER_ERROR, "BUILD_ERROR"),
            FundingError::Chain(ChainError::GasPriceTooHigh { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "GAS_PRICE_TOO_HIGH")
            }
            FundingError::Chain(_) => (StatusCode::SERVICE_UNAVAILABLE, "NODE_UNAVAILABLE"),
            FundingError::Broadcast(BroadcastError::NodeUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "NODE_UNAVAILABLE")
            }
            FundingError::Broadcast(BroadcastError::Rejected(_)) => {
                (StatusCode::BAD_GATEWAY, "BROADCAST_REJECTED")
            }
            FundingError::Broadcast(BroadcastError::Timeout { .. }) => {
                (StatusCode::GATEWAY_TIMEOUT, "BROADCAST_TIMEOUT")
            }
            FundingError::OnChainFailure { .. } => (StatusCode::BAD_GATEWAY, "ONCHAIN_FAILURE"),
            FundingError::ConfirmationTimeout { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, "CONFIRMATION_TIMEOUT")
            }
        };

        Self {
            status,
            code,
            message: err.to_string(),
            tx_hash: err.tx_hash(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code,
            message: self.message,
            tx_hash: self.tx_hash.as_ref().map(format_tx_hash),
        };
        (self.status, Json(body)).into_response()
    }
}
