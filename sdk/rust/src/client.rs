use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct FundRequest<'a> {
    pub address: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundResponse {
    pub tx_hash: String,
    #[serde(default)]
    pub block_height: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenFundedResponse {
    pub address: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResponse {
    pub tx_hash: String,
    /// One of `pending`, `confirmed`, `failed`, `timedOut`.
    pub status: String,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
    pub sequence: u64,
    pub recipient: String,
    /// Seconds since the epoch.
    pub submitted_at: u64,
}

#[derive(Debug, Clone, Deserialize)]
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

/// Error body returned by the faucet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FaucetClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("faucet returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

impl FaucetClientError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FaucetClientError::Api { status, .. } => Some(*status),
            FaucetClientError::Http(e) => e.status(),
        }
    }

    /// Parsed error body, when the faucet sent one.
    pub fn body(&self) -> Option<ApiErrorBody> {
        match self {
            FaucetClientError::Api { body, .. } => serde_json::from_str(body).ok(),
            FaucetClientError::Http(_) => None,
        }
    }
}

pub struct FaucetClient {
    client: Client,
    base_url: String,
}

impl FaucetClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/faucet/v1{}", self.base_url, path)
    }

    /// Fund `address` with the faucet's configured amount.
    pub async fn fund(&self, address: &str) -> Result<FundResponse, FaucetClientError> {
        let resp = self
            .client
            .post(self.url("/fund"))
            .json(&FundRequest { address })
            .send()
            .await?;
        decode(resp).await
    }

    /// Ask the faucet to generate and fund a fresh account.
    pub async fn gen_funded(&self) -> Result<GenFundedResponse, FaucetClientError> {
        let resp = self.client.post(self.url("/gen-funded")).send().await?;
        decode(resp).await
    }

    /// Current tracking state of a transaction.
    pub async fn tx_status(&self, tx_hash: &str) -> Result<TxResponse, FaucetClientError> {
        let resp = self
            .client
            .get(self.url(&format!("/tx/{}", tx_hash)))
            .send()
            .await?;
        decode(resp).await
    }

    /// Block until the faucet resolves a transaction (confirmed, failed, or
    /// timed out on the faucet side).
    pub async fn await_tx(&self, tx_hash: &str) -> Result<TxResponse, FaucetClientError> {
        let resp = self
            .client
            .get(self.url(&format!("/tx/{}", tx_hash)))
            .query(&[("wait", "true")])
            .timeout(Duration::from_secs(300))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn status(&self) -> Result<StatusResponse, FaucetClientError> {
        let resp = self.client.get(self.url("/status")).send().await?;
        decode(resp).await
    }

    /// Raw `GET /health` response.
    pub async fn health(&self) -> Result<Response, reqwest::Error> {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, FaucetClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FaucetClientError::Api { status, body });
    }
    Ok(resp.json().await?)
}
