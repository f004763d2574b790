//! End-to-end funding over HTTP against the simulated chain.

use alloy::primitives::{Address, U256};
use faucet_service::chain::NodeClient;
use reqwest::StatusCode;
use std::collections::HashSet;

mod common;

const MALFORMED: &str = "core1hrlnys435ph2gehthddlg2g2s246my30q0gfs2";

#[tokio::test]
async fn test_malformed_address_is_rejected_without_side_effects() {
    let faucet = common::spawn_faucet(|_| {}).await;
    let before = faucet.service.sequencer().peek();

    let err = faucet.client.fund(MALFORMED).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    let body = err.body().unwrap();
    assert_eq!(body.error, "INVALID_ADDRESS");
    assert!(body.tx_hash.is_none());

    assert_eq!(faucet.service.sequencer().peek(), before);
    assert!(faucet.node.accepted_transactions().is_empty());
    // The address itself cannot be used for a balance query either.
    assert!(MALFORMED.parse::<Address>().is_err());
}

#[tokio::test]
async fn test_fund_valid_address_delivers_amount() {
    let faucet = common::spawn_faucet(|_| {}).await;
    let address = common::recipient(1);

    let funded = faucet.client.fund(&address).await.unwrap();
    assert_eq!(funded.tx_hash.len(), 64);
    assert!(funded.tx_hash.chars().all(|c| c.is_ascii_hexdigit()));

    let tx = faucet.client.await_tx(&funded.tx_hash).await.unwrap();
    assert_eq!(tx.status, "confirmed");
    assert!(tx.block_height.is_some());
    assert_eq!(tx.sequence, 0);

    let balance = faucet.node.balance(address.parse().unwrap()).await.unwrap();
    assert_eq!(balance, U256::from(1_000_000u64));
}

#[tokio::test]
async fn test_gen_funded_returns_distinct_fresh_addresses() {
    let faucet = common::spawn_faucet(|_| {}).await;
    let funding = faucet.service.funding_address();

    let mut seen = HashSet::new();
    for _ in 0..5 {
        let funded = faucet.client.gen_funded().await.unwrap();
        let address: Address = funded.address.parse().unwrap();
        assert_ne!(address, funding);
        assert!(seen.insert(address));
        assert_eq!(funded.tx_hash.len(), 64);

        let tx = faucet.client.await_tx(&funded.tx_hash).await.unwrap();
        assert_eq!(tx.status, "confirmed");
        assert_eq!(faucet.node.balance(address).await.unwrap(), U256::from(1_000_000u64));
    }
}

#[tokio::test]
async fn test_tx_lookup() {
    let faucet = common::spawn_faucet(|_| {}).await;
    let funded = faucet.client.fund(&common::recipient(2)).await.unwrap();

    let tx = faucet.client.tx_status(&funded.tx_hash).await.unwrap();
    assert_eq!(tx.tx_hash, funded.tx_hash);
    assert_eq!(tx.recipient.to_lowercase(), common::recipient(2));

    let with_prefix = faucet
        .client
        .tx_status(&format!("0x{}", funded.tx_hash))
        .await
        .unwrap();
    assert_eq!(with_prefix.tx_hash, funded.tx_hash);

    let unknown = faucet.client.tx_status(&"ab".repeat(32)).await.unwrap_err();
    assert_eq!(unknown.status(), Some(StatusCode::NOT_FOUND));

    let garbage = faucet.client.tx_status("xyz").await.unwrap_err();
    assert_eq!(garbage.status(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn test_doubled_hex_prefix_is_a_client_error() {
    let faucet = common::spawn_faucet(|_| {}).await;

    let err = faucet
        .client
        .fund(&format!("0x0x{}", "1".repeat(38)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(err.body().unwrap().error, "INVALID_ADDRESS");
    assert_eq!(faucet.service.sequencer().peek(), 0);

    let err = faucet
        .client
        .tx_status(&format!("0x0x{}", "ab".repeat(31)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(err.body().unwrap().error, "INVALID_TX_HASH");
}

#[tokio::test]
async fn test_waiting_on_untracked_hash_is_not_found_immediately() {
    let faucet = common::spawn_faucet(|_| {}).await;
    let started = std::time::Instant::now();

    let err = faucet.client.await_tx(&"cd".repeat(32)).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert!(started.elapsed() < std::time::Duration::from_secs(1));
}

#[tokio::test]
async fn test_status_and_health() {
    let faucet = common::spawn_faucet(|_| {}).await;
    faucet.client.fund(&common::recipient(3)).await.unwrap();

    let status = faucet.client.status().await.unwrap();
    assert_eq!(status.next_sequence, 1);
    assert_eq!(status.chain_id, 31337);
    assert_eq!(status.transfer_amount, "1000000");
    assert!(status.balance.is_some());
    assert_eq!(
        status.funding_address.parse::<Address>().unwrap(),
        faucet.service.funding_address()
    );

    let health = faucet.client.health().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bad_body_is_json_error() {
    let faucet = common::spawn_faucet(|_| {}).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/faucet/v1/fund", faucet.base_url))
        .header("content-type", "application/json")
        .body("{\"addr\": 1}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_request_id_is_generated_and_propagated() {
    let faucet = common::spawn_faucet(|_| {}).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", faucet.base_url))
        .send()
        .await
        .unwrap();
    let generated = res.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());

    let res = client
        .get(format!("{}/health", faucet.base_url))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "trace-me");
}
