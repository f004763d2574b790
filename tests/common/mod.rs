//! Shared utilities for integration and load testing.

use std::sync::Arc;
use std::time::Duration;

use faucet_sdk::FaucetClient;
use faucet_service::chain::InMemoryNode;
use faucet_service::config::{ChainMode, FaucetConfig};
use faucet_service::funding::FundingService;
use faucet_service::lifecycle::{self, Shutdown};
use tokio::net::TcpListener;

/// A faucet served over HTTP on an ephemeral port, backed by a simulated chain.
#[allow(dead_code)]
pub struct TestFaucet {
    pub base_url: String,
    pub client: FaucetClient,
    pub node: Arc<InMemoryNode>,
    pub service: Arc<FundingService>,
    pub shutdown: Shutdown,
}

impl Drop for TestFaucet {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config tuned for fast tests: instant blocks, fast polling, short waits.
pub fn test_config() -> FaucetConfig {
    let mut config = FaucetConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.chain.mode = ChainMode::Simulated;
    config.chain.simulated_block_time_ms = 0;
    config.funding.transfer_amount = "1000000".to_string();
    config.funding.retry_base_delay_ms = 5;
    config.funding.retry_max_delay_ms = 20;
    config.confirmation.poll_interval_ms = 10;
    config.confirmation.timeout_secs = 2;
    config
}

/// Start a faucet with `test_config()` adjusted by `customize`.
pub async fn spawn_faucet<F>(customize: F) -> TestFaucet
where
    F: FnOnce(&mut FaucetConfig),
{
    let mut config = test_config();
    customize(&mut config);

    let faucet = lifecycle::build(config).await.unwrap();
    let node = faucet.simulated.clone().unwrap();
    let service = faucet.service.clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let shutdown = Shutdown::new();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = lifecycle::serve(faucet, listener, server_shutdown).await;
    });

    wait_until_ready(&base_url).await;

    TestFaucet {
        client: FaucetClient::new(&base_url),
        base_url,
        node,
        service,
        shutdown,
    }
}

async fn wait_until_ready(base_url: &str) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client.get(format!("{}/health", base_url)).send().await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("faucet at {} never became ready", base_url);
}

/// A distinct, valid recipient address for index `i`.
#[allow(dead_code)]
pub fn recipient(i: u32) -> String {
    format!("0x{:040x}", 0x1000 + i)
}
