//! In-process simulated chain.
//!
//! Backs `chain.mode = "simulated"` and the test suites. Submitted bytes are
//! decoded and signature-recovered like a real node would, nonces are
//! enforced per sender, and blocks are cut every `block_time` (or on every
//! query when the block time is zero).

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::Decodable2718;
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::chain::client::NodeClient;
use crate::chain::types::{BroadcastError, ChainResult, TxStatus};

/// A transaction accepted into the simulated pool.
#[derive(Debug, Clone)]
pub struct AcceptedTx {
    pub tx_hash: TxHash,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub nonce: u64,
    fee: U256,
}

#[derive(Debug, Clone)]
struct Receipt {
    block_height: u64,
    execution_error: Option<String>,
}

#[derive(Debug)]
struct ChainState {
    height: u64,
    last_block_at: Instant,
    gas_price: u128,
    balances: HashMap<Address, U256>,
    /// Next nonce counting transactions still in the pool.
    pending_nonces: HashMap<Address, u64>,
    mempool: Vec<AcceptedTx>,
    receipts: HashMap<TxHash, Receipt>,
    accepted: Vec<AcceptedTx>,
}

impl ChainState {
    fn balance(&self, address: &Address) -> U256 {
        self.balances.get(address).copied().unwrap_or(U256::ZERO)
    }

    fn produce_block(&mut self, include: bool) {
        self.height += 1;
        if !include {
            return;
        }
        let height = self.height;
        for tx in std::mem::take(&mut self.mempool) {
            let balance = self.balance(&tx.from);
            let execution_error = if balance < tx.value + tx.fee {
                self.balances.insert(tx.from, balance.saturating_sub(tx.fee));
                Some(format!(
                    "insufficient funds: balance {} below transfer {} plus fee {}",
                    balance, tx.value, tx.fee
                ))
            } else {
                self.balances.insert(tx.from, balance - tx.value - tx.fee);
                let credited = self.balance(&tx.to) + tx.value;
                self.balances.insert(tx.to, credited);
                None
            };
            self.receipts.insert(
                tx.tx_hash,
                Receipt {
                    block_height: height,
                    execution_error,
                },
            );
        }
    }
}

/// Simulated node implementing [`NodeClient`].
#[derive(Debug)]
pub struct InMemoryNode {
    chain_id: u64,
    block_time: Duration,
    state: Mutex<ChainState>,
    failing_broadcasts: AtomicU32,
    inclusion_paused: AtomicBool,
    broadcast_delay: Mutex<Option<Duration>>,
}

impl InMemoryNode {
    /// Create an empty chain.
    pub fn new(chain_id: u64, block_time: Duration) -> Self {
        Self {
            chain_id,
            block_time,
            state: Mutex::new(ChainState {
                height: 1,
                last_block_at: Instant::now(),
                gas_price: 1_000_000_000,
                balances: HashMap::new(),
                pending_nonces: HashMap::new(),
                mempool: Vec::new(),
                receipts: HashMap::new(),
                accepted: Vec::new(),
            }),
            failing_broadcasts: AtomicU32::new(0),
            inclusion_paused: AtomicBool::new(false),
            broadcast_delay: Mutex::new(None),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ChainState> {
        self.state.lock().expect("simulated chain mutex poisoned")
    }

    /// Mint `amount` to `address`.
    pub fn credit(&self, address: Address, amount: U256) {
        let mut state = self.state();
        let balance = state.balance(&address) + amount;
        state.balances.insert(address, balance);
    }

    /// Overwrite the balance of `address`.
    pub fn set_balance(&self, address: Address, amount: U256) {
        self.state().balances.insert(address, amount);
    }

    /// Set the account nonce of `address`, as if it had sent transactions
    /// outside the faucet.
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state().pending_nonces.insert(address, nonce);
    }

    /// Set the gas price reported to clients.
    pub fn set_gas_price(&self, gas_price: u128) {
        self.state().gas_price = gas_price;
    }

    /// Make the next `count` broadcasts fail as if the node were down.
    pub fn fail_next_broadcasts(&self, count: u32) {
        self.failing_broadcasts.store(count, Ordering::SeqCst);
    }

    /// Stop (or resume) including pooled transactions in new blocks.
    pub fn pause_inclusion(&self, paused: bool) {
        self.inclusion_paused.store(paused, Ordering::SeqCst);
    }

    /// Delay every broadcast by `delay` before it is processed.
    pub fn set_broadcast_delay(&self, delay: Option<Duration>) {
        *self
            .broadcast_delay
            .lock()
            .expect("simulated chain mutex poisoned") = delay;
    }

    /// Every transaction accepted so far, in acceptance order.
    pub fn accepted_transactions(&self) -> Vec<AcceptedTx> {
        self.state().accepted.clone()
    }

    /// Cut the blocks that are due, or one block when the block time is zero.
    fn advance(&self, state: &mut ChainState) {
        let include = !self.inclusion_paused.load(Ordering::SeqCst);
        if self.block_time.is_zero() {
            state.produce_block(include);
            return;
        }
        let due = state.last_block_at.elapsed().as_millis() / self.block_time.as_millis();
        for _ in 0..due {
            state.produce_block(include);
        }
        if due > 0 {
            state.last_block_at = Instant::now();
        }
    }

    fn admit(&self, raw: &[u8]) -> Result<TxHash, BroadcastError> {
        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| BroadcastError::Rejected(format!("malformed transaction: {}", e)))?;
        let from = envelope
            .recover_signer()
            .map_err(|e| BroadcastError::Rejected(format!("invalid signature: {}", e)))?;

        if envelope.chain_id() != Some(self.chain_id) {
            return Err(BroadcastError::Rejected(format!(
                "invalid chain id {:?}, expected {}",
                envelope.chain_id(),
                self.chain_id
            )));
        }
        let to = envelope.to().ok_or_else(|| {
            BroadcastError::Rejected("contract creation is not supported".to_string())
        })?;

        let tx_hash = *envelope.tx_hash();
        let mut state = self.state();
        if state.receipts.contains_key(&tx_hash) || state.mempool.iter().any(|tx| tx.tx_hash == tx_hash) {
            return Err(BroadcastError::Rejected("already known".to_string()));
        }

        let expected = state.pending_nonces.get(&from).copied().unwrap_or(0);
        let nonce = envelope.nonce();
        if nonce < expected {
            return Err(BroadcastError::Rejected(format!(
                "nonce too low: next nonce {}, tx nonce {}",
                expected, nonce
            )));
        }
        if nonce > expected {
            return Err(BroadcastError::Rejected(format!(
                "nonce too high: next nonce {}, tx nonce {}",
                expected, nonce
            )));
        }

        let fee = U256::from(envelope.gas_limit()) * U256::from(envelope.max_fee_per_gas());
        let value = envelope.value();
        if state.balance(&from) < value + fee {
            return Err(BroadcastError::Rejected(
                "insufficient funds for gas * price + value".to_string(),
            ));
        }

        let accepted = AcceptedTx {
            tx_hash,
            from,
            to,
            value,
            nonce,
            fee,
        };
        state.pending_nonces.insert(from, expected + 1);
        state.mempool.push(accepted.clone());
        state.accepted.push(accepted);
        Ok(tx_hash)
    }
}

#[async_trait]
impl NodeClient for InMemoryNode {
    async fn chain_id(&self) -> ChainResult<u64> {
        Ok(self.chain_id)
    }

    async fn account_sequence(&self, address: Address) -> ChainResult<u64> {
        Ok(self.state().pending_nonces.get(&address).copied().unwrap_or(0))
    }

    async fn gas_price(&self) -> ChainResult<u128> {
        Ok(self.state().gas_price)
    }

    async fn block_height(&self) -> ChainResult<u64> {
        let mut state = self.state();
        self.advance(&mut state);
        Ok(state.height)
    }

    async fn balance(&self, address: Address) -> ChainResult<U256> {
        let mut state = self.state();
        self.advance(&mut state);
        Ok(state.balance(&address))
    }

    async fn broadcast_raw(&self, raw: &[u8]) -> Result<TxHash, BroadcastError> {
        let delay = *self
            .broadcast_delay
            .lock()
            .expect("simulated chain mutex poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failing_broadcasts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(BroadcastError::NodeUnavailable(
                "connection refused (simulated)".to_string(),
            ));
        }

        self.admit(raw)
    }

    async fn tx_status(&self, tx_hash: TxHash) -> ChainResult<TxStatus> {
        let mut state = self.state();
        self.advance(&mut state);
        Ok(match state.receipts.get(&tx_hash) {
            Some(receipt) => TxStatus::Included {
                block_height: receipt.block_height,
                execution_error: receipt.execution_error.clone(),
            },
            None => TxStatus::NotIncluded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::network::{EthereumWallet, TransactionBuilder};
    use alloy::eips::Encodable2718;
    use alloy::rpc::types::TransactionRequest;
    use alloy::signers::local::PrivateKeySigner;

    const CHAIN_ID: u64 = 31337;

    async fn signed_transfer(signer: &PrivateKeySigner, to: Address, value: u64, nonce: u64) -> Vec<u8> {
        let wallet = EthereumWallet::from(signer.clone());
        TransactionRequest::default()
            .with_from(signer.address())
            .with_to(to)
            .with_value(U256::from(value))
            .with_nonce(nonce)
            .with_chain_id(CHAIN_ID)
            .with_gas_limit(21_000)
            .with_gas_price(1)
            .build(&wallet)
            .await
            .unwrap()
            .encoded_2718()
    }

    #[tokio::test]
    async fn test_transfer_lands_in_next_block() {
        let node = InMemoryNode::new(CHAIN_ID, Duration::ZERO);
        let sender = PrivateKeySigner::random();
        let recipient = Address::repeat_byte(7);
        node.credit(sender.address(), U256::from(1_000_000u64));

        let raw = signed_transfer(&sender, recipient, 500, 0).await;
        let hash = node.broadcast_raw(&raw).await.unwrap();

        match node.tx_status(hash).await.unwrap() {
            TxStatus::Included { execution_error, .. } => assert!(execution_error.is_none()),
            other => panic!("expected inclusion, got {:?}", other),
        }
        assert_eq!(node.balance(recipient).await.unwrap(), U256::from(500));
        assert_eq!(node.account_sequence(sender.address()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nonce_mismatch_is_rejected() {
        let node = InMemoryNode::new(CHAIN_ID, Duration::ZERO);
        let sender = PrivateKeySigner::random();
        node.credit(sender.address(), U256::from(1_000_000u64));

        let raw = signed_transfer(&sender, Address::repeat_byte(1), 1, 3).await;
        let err = node.broadcast_raw(&raw).await.unwrap_err();
        assert!(err.is_sequence_mismatch());
        assert!(node.accepted_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_injected_outage_then_recovery() {
        let node = InMemoryNode::new(CHAIN_ID, Duration::ZERO);
        let sender = PrivateKeySigner::random();
        node.credit(sender.address(), U256::from(1_000_000u64));
        node.fail_next_broadcasts(1);

        let raw = signed_transfer(&sender, Address::repeat_byte(1), 1, 0).await;
        assert!(matches!(
            node.broadcast_raw(&raw).await,
            Err(BroadcastError::NodeUnavailable(_))
        ));
        assert!(node.broadcast_raw(&raw).await.is_ok());
    }

    #[tokio::test]
    async fn test_paused_inclusion_keeps_tx_pending() {
        let node = InMemoryNode::new(CHAIN_ID, Duration::ZERO);
        let sender = PrivateKeySigner::random();
        node.credit(sender.address(), U256::from(1_000_000u64));
        node.pause_inclusion(true);

        let raw = signed_transfer(&sender, Address::repeat_byte(1), 1, 0).await;
        let hash = node.broadcast_raw(&raw).await.unwrap();
        assert_eq!(node.tx_status(hash).await.unwrap(), TxStatus::NotIncluded);

        node.pause_inclusion(false);
        assert!(matches!(
            node.tx_status(hash).await.unwrap(),
            TxStatus::Included { .. }
        ));
    }

    #[tokio::test]
    async fn test_wrong_chain_id_is_rejected() {
        let node = InMemoryNode::new(CHAIN_ID + 1, Duration::ZERO);
        let sender = PrivateKeySigner::random();
        node.credit(sender.address(), U256::from(1_000_000u64));

        let raw = signed_transfer(&sender, Address::repeat_byte(1), 1, 0).await;
        assert!(matches!(
            node.broadcast_raw(&raw).await,
            Err(BroadcastError::Rejected(reason)) if reason.contains("chain id")
        ));
    }
}
