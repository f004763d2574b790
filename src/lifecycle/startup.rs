//! Startup orchestration.
//!
//! Config is already validated when it arrives here. Subsystems start in
//! dependency order: node client, funding account, funding service (which
//! bootstraps the sequence from the node), background tasks, then the
//! listener.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::chain::{ChainError, FundingAccount, InMemoryNode, NodeClient, RpcNodeClient};
use crate::config::{ChainMode, FaucetConfig};
use crate::funding::transaction::parse_amount;
use crate::funding::{FundingError, FundingService};
use crate::http::FaucetServer;
use crate::lifecycle::Shutdown;

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("chain setup failed: {0}")]
    Chain(#[from] ChainError),

    #[error("funding setup failed: {0}")]
    Funding(#[from] FundingError),

    #[error("listener setup failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the faucet runs on, wired and ready to serve.
#[derive(Debug)]
pub struct Faucet {
    pub config: FaucetConfig,
    pub service: Arc<FundingService>,
    /// Present in simulated mode.
    pub simulated: Option<Arc<InMemoryNode>>,
}

/// Load the funding account: configured key first, then the environment.
/// Simulated mode falls back to a random key.
pub fn load_account(config: &FaucetConfig) -> Result<FundingAccount, ChainError> {
    let chain_id = config.chain.chain_id;
    match (&config.funding.private_key, config.chain.mode) {
        (Some(key), _) => FundingAccount::from_private_key(key, chain_id),
        (None, ChainMode::Rpc) => FundingAccount::from_env(chain_id),
        (None, ChainMode::Simulated) => FundingAccount::from_env(chain_id).or_else(|_| {
            tracing::warn!("No funding key configured; using a random key on the simulated chain");
            Ok(FundingAccount::random(chain_id))
        }),
    }
}

/// Build the node client, funding account and funding service.
pub async fn build(config: FaucetConfig) -> Result<Faucet, StartupError> {
    let account = load_account(&config)?;

    let (node, simulated): (Arc<dyn NodeClient>, Option<Arc<InMemoryNode>>) = match config.chain.mode {
        ChainMode::Rpc => {
            let client = RpcNodeClient::new(config.chain.clone()).await?;
            (Arc::new(client) as Arc<dyn NodeClient>, None)
        }
        ChainMode::Simulated => {
            let node = Arc::new(InMemoryNode::new(
                config.chain.chain_id,
                Duration::from_millis(config.chain.simulated_block_time_ms),
            ));
            let balance = parse_amount(&config.chain.simulated_funding_balance)
                .map_err(FundingError::from)?;
            node.credit(account.address(), balance);
            tracing::info!(
                address = %account.address(),
                balance = %balance,
                denom = %config.chain.denom,
                "Simulated chain started"
            );
            (node.clone() as Arc<dyn NodeClient>, Some(node))
        }
    };

    let service = Arc::new(FundingService::bootstrap(node, account, &config).await?);

    let status = service.status().await;
    if status.balance.is_some_and(|b| b < status.transfer_amount) {
        tracing::warn!(
            balance = %status.balance.unwrap_or(U256::ZERO),
            transfer_amount = %status.transfer_amount,
            "Funding balance is below one transfer"
        );
    }

    Ok(Faucet {
        config,
        service,
        simulated,
    })
}

/// Start background tasks and serve HTTP on `listener` until `shutdown`.
pub async fn serve(faucet: Faucet, listener: TcpListener, shutdown: Shutdown) -> Result<(), StartupError> {
    let prune_every = Duration::from_secs((faucet.config.confirmation.retention_secs / 10).clamp(1, 60));
    let pruner = faucet
        .service
        .pending()
        .spawn_pruner(prune_every, shutdown.subscribe());

    let server = FaucetServer::new(faucet.config, faucet.service);
    server.run(listener, shutdown.subscribe()).await?;

    let _ = pruner.await;
    Ok(())
}
