//! Node client: the faucet's only window onto the chain.
//!
//! # Responsibilities
//! - Define the `NodeClient` seam the funding pipeline talks to
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Query chain state (nonce, balances, receipts, gas price)
//! - Classify broadcast failures so the sequencer can settle correctly
//! - Handle timeouts and network errors gracefully

use alloy::primitives::{keccak256, Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::{RpcError, TransportResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::chain::types::{
    BroadcastError, ChainConfig, ChainError, ChainResult, TxStatus,
};

/// Operations the funding pipeline needs from a node.
#[async_trait]
pub trait NodeClient: Send + Sync + std::fmt::Debug {
    /// Chain ID reported by the node.
    async fn chain_id(&self) -> ChainResult<u64>;

    /// Next unused sequence (pending nonce) of `address`.
    async fn account_sequence(&self, address: Address) -> ChainResult<u64>;

    /// Current gas price in base units.
    async fn gas_price(&self) -> ChainResult<u128>;

    /// Latest block height.
    async fn block_height(&self) -> ChainResult<u64>;

    /// Native token balance of `address`.
    async fn balance(&self, address: Address) -> ChainResult<U256>;

    /// Submit signed transaction bytes. Success means the node accepted the
    /// transaction into its pool, not that it is included.
    async fn broadcast_raw(&self, raw: &[u8]) -> Result<TxHash, BroadcastError>;

    /// Inclusion status of a transaction.
    async fn tx_status(&self, tx_hash: TxHash) -> ChainResult<TxStatus>;

    /// Check if the node is reachable.
    async fn is_healthy(&self) -> bool {
        self.block_height().await.is_ok()
    }
}

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// JSON-RPC node client with failover support.
#[derive(Clone)]
pub struct RpcNodeClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Configuration.
    config: ChainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl RpcNodeClient {
    /// Create a new node client.
    ///
    /// Fails only when the primary URL does not parse; an unreachable node is
    /// logged and left to the health endpoint.
    pub async fn new(config: ChainConfig) -> ChainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            ChainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        // 2. Add failover providers
        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        // Verify chain ID matches configuration
        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    chain_id = config.chain_id,
                    "Node client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Node client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> ChainResult<()> {
        let actual = self.chain_id().await?;
        if actual != self.config.chain_id {
            return Err(ChainError::ChainMismatch {
                expected: self.config.chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// Run a read call against each provider in turn until one answers.
    ///
    /// Fails with `Timeout` only when every provider timed out.
    async fn read<T, F, Fut>(&self, what: &'static str, call: F) -> ChainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut all_timed_out = true;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    all_timed_out = false;
                    tracing::warn!(provider_idx = i, call = what, error = %e, "RPC error");
                }
                Err(_) => tracing::warn!(provider_idx = i, call = what, "RPC timeout"),
            }
        }
        if all_timed_out {
            return Err(ChainError::Timeout(self.config.rpc_timeout_secs));
        }
        Err(ChainError::Rpc(format!("All RPC providers failed to {}", what)))
    }
}

#[async_trait]
impl NodeClient for RpcNodeClient {
    async fn chain_id(&self) -> ChainResult<u64> {
        self.read("get chain id", |p| async move { p.get_chain_id().await })
            .await
    }

    async fn account_sequence(&self, address: Address) -> ChainResult<u64> {
        self.read("get transaction count", move |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn gas_price(&self) -> ChainResult<u128> {
        self.read("get gas price", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn block_height(&self) -> ChainResult<u64> {
        self.read("get block number", |p| async move { p.get_block_number().await })
            .await
    }

    async fn balance(&self, address: Address) -> ChainResult<U256> {
        self.read("get balance", move |p| async move { p.get_balance(address).await })
            .await
    }

    async fn broadcast_raw(&self, raw: &[u8]) -> Result<TxHash, BroadcastError> {
        let mut last_error = String::from("no providers configured");

        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.send_raw_transaction(raw)).await {
                Ok(Ok(pending)) => return Ok(*pending.tx_hash()),
                // The node answered and said no: another provider will say the same.
                Ok(Err(RpcError::ErrorResp(payload))) => {
                    return Err(BroadcastError::Rejected(payload.message.to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "Broadcast transport error");
                    last_error = e.to_string();
                }
                // Ambiguous: the node may hold the transaction already.
                Err(_) => {
                    return Err(BroadcastError::Timeout {
                        tx_hash: keccak256(raw),
                        after: self.timeout_duration,
                    });
                }
            }
        }

        Err(BroadcastError::NodeUnavailable(last_error))
    }

    async fn tx_status(&self, tx_hash: TxHash) -> ChainResult<TxStatus> {
        let receipt = self
            .read("get transaction receipt", move |p| async move {
                p.get_transaction_receipt(tx_hash).await
            })
            .await?;

        Ok(match receipt {
            None => TxStatus::NotIncluded,
            Some(receipt) => match receipt.block_number {
                None => TxStatus::NotIncluded,
                Some(block_height) => TxStatus::Included {
                    block_height,
                    execution_error: (!receipt.status()).then(|| {
                        format!("execution reverted (gas used {})", receipt.gas_used)
                    }),
                },
            },
        })
    }
}

impl std::fmt::Debug for RpcNodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcNodeClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("providers", &self.providers.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ChainConfig {
        ChainConfig {
            // Nothing listens on port 1; every call fails fast.
            rpc_url: "http://127.0.0.1:1".to_string(),
            rpc_timeout_secs: 2,
            ..ChainConfig::default()
        }
    }

    #[tokio::test]
    async fn test_client_creation_tolerates_unreachable_node() {
        let result = RpcNodeClient::new(test_config()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_primary_url_is_rejected() {
        let config = ChainConfig {
            rpc_url: "not a url".to_string(),
            ..test_config()
        };
        assert!(RpcNodeClient::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausts_all_providers() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        config.failover_urls.push("not a url".to_string());

        let client = RpcNodeClient::new(config).await.unwrap();
        assert_eq!(client.providers.len(), 2);

        let result = client.chain_id().await;
        assert!(result.unwrap_err().to_string().contains("All RPC providers failed"));
        assert!(!client.is_healthy().await);
    }

    #[tokio::test]
    async fn test_silent_node_times_out() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = ChainConfig {
            rpc_url: format!("http://{}", addr),
            rpc_timeout_secs: 1,
            ..ChainConfig::default()
        };
        let client = RpcNodeClient::new(config).await.unwrap();
        let err = client.block_height().await.unwrap_err();
        assert!(matches!(err, ChainError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_broadcast_to_dead_node_is_unavailable() {
        let client = RpcNodeClient::new(test_config()).await.unwrap();
        let err = client.broadcast_raw(&[0xc0]).await.unwrap_err();
        assert!(matches!(err, BroadcastError::NodeUnavailable(_)));
    }
}
