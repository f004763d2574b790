//! Faucet service binary.
//!
//! ```text
//!     POST /api/faucet/v1/fund ────────┐
//!     POST /api/faucet/v1/gen-funded ──┤
//!                                      ▼
//!   ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌─────────────┐   ┌──────┐
//!   │ address  │──▶│ sequencer │──▶│ builder/ │──▶│ broadcaster │──▶│ node │
//!   │validation│   │  (nonce)  │   │  signer  │   └──────┬──────┘   └──────┘
//!   └──────────┘   └───────────┘   └──────────┘          │              ▲
//!                                                        ▼              │
//!                                              ┌──────────────────┐     │
//!                                              │ pending registry │     │
//!                                              │ + confirmation   │─────┘
//!                                              │   tracker        │ (poll)
//!                                              └──────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use faucet_service::config::loader::load_config;
use faucet_service::config::{ChainMode, ConfirmationMode, FaucetConfig};
use faucet_service::lifecycle::{self, signals, Shutdown};
use faucet_service::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "faucet-service")]
#[command(about = "Native token faucet for development and test networks", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "FAUCET_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(long)]
    bind_address: Option<String>,

    /// Override the node JSON-RPC URL.
    #[arg(long)]
    rpc_url: Option<String>,

    /// Run against an in-process simulated chain.
    #[arg(long)]
    simulated: bool,

    /// Wait for confirmation before answering /fund.
    #[arg(long)]
    await_confirmation: bool,

    /// Override the log level.
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut FaucetConfig) {
        if let Some(addr) = &self.bind_address {
            config.listener.bind_address = addr.clone();
        }
        if let Some(url) = &self.rpc_url {
            config.chain.rpc_url = url.clone();
        }
        if self.simulated {
            config.chain.mode = ChainMode::Simulated;
        }
        if self.await_confirmation {
            config.funding.confirmation_mode = ConfirmationMode::Await;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref(), |config| args.apply(config))?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "faucet-service starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        chain_mode = ?config.chain.mode,
        chain_id = config.chain.chain_id,
        denom = %config.chain.denom,
        transfer_amount = %config.funding.transfer_amount,
        confirmation_mode = ?config.funding.confirmation_mode,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let faucet = lifecycle::build(config).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    lifecycle::serve(faucet, listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
