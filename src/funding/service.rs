//! Funding orchestration: validate, sequence, sign, broadcast, track.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

use crate::chain::{
    format_tx_hash, validate_recipient, AddressError, BroadcastError, ChainError, FundingAccount,
    KeyGenerator, NodeClient,
};
use crate::config::{ConfirmationMode, FaucetConfig};
use crate::funding::broadcaster::Broadcaster;
use crate::funding::confirmation::{ConfirmationState, ConfirmationTracker};
use crate::funding::pending::{PendingRegistry, PendingTransaction};
use crate::funding::sequencer::Sequencer;
use crate::funding::transaction::{effective_gas_price, BuildError, TxBuilder};
use crate::resilience::RetryBackoff;

/// Every way a funding request can fail.
#[derive(Debug, Error)]
pub enum FundingError {
    #[error("invalid address: {0}")]
    Validation(#[from] AddressError),

    #[error("transaction build failed: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error("transaction {} failed on-chain at block {block_height}: {reason}", format_tx_hash(.tx_hash))]
    OnChainFailure {
        tx_hash: TxHash,
        block_height: u64,
        reason: String,
    },

    #[error("transaction {} not confirmed in time; inclusion unknown", format_tx_hash(.tx_hash))]
    ConfirmationTimeout { tx_hash: TxHash },
}

impl FundingError {
    /// Hash of a transaction that may exist on-chain despite the error.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            FundingError::Broadcast(BroadcastError::Timeout { tx_hash, .. })
            | FundingError::OnChainFailure { tx_hash, .. }
            | FundingError::ConfirmationTimeout { tx_hash } => Some(*tx_hash),
            _ => None,
        }
    }
}

/// Result of a successful `fund`.
#[derive(Debug, Clone)]
pub struct FundReceipt {
    pub tx_hash: TxHash,
    pub sequence: u64,
    /// Set in await mode.
    pub confirmation: Option<ConfirmationState>,
}

/// Result of a successful `generate_and_fund`.
#[derive(Debug, Clone)]
pub struct GenFundedReceipt {
    pub address: Address,
    pub receipt: FundReceipt,
}

/// Faucet state for the status endpoint.
#[derive(Debug, Clone)]
pub struct FaucetStatus {
    pub funding_address: Address,
    pub chain_id: u64,
    pub denom: String,
    pub transfer_amount: U256,
    pub next_sequence: u64,
    /// `None` when the node could not be queried.
    pub balance: Option<U256>,
    pub pending: usize,
}

#[derive(Debug, Clone)]
struct Settings {
    mode: ConfirmationMode,
    backoff: RetryBackoff,
    gas_price_multiplier: f64,
    max_gas_price_gwei: u64,
    confirmation_timeout: Duration,
}

/// The funding pipeline behind `/fund` and `/gen-funded`.
#[derive(Debug)]
pub struct FundingService {
    node: Arc<dyn NodeClient>,
    builder: TxBuilder,
    sequencer: Arc<Sequencer>,
    broadcaster: Broadcaster,
    tracker: ConfirmationTracker,
    pending: PendingRegistry,
    keygen: KeyGenerator,
    settings: Settings,
}

impl FundingService {
    /// Assemble the pipeline around an existing sequencer.
    pub fn new(
        node: Arc<dyn NodeClient>,
        account: FundingAccount,
        sequencer: Arc<Sequencer>,
        config: &FaucetConfig,
    ) -> Result<Self, FundingError> {
        let builder = TxBuilder::new(
            account,
            &config.funding.transfer_amount,
            &config.chain.denom,
            config.chain.gas_limit,
        )?;

        Ok(Self {
            broadcaster: Broadcaster::new(
                node.clone(),
                Duration::from_secs(config.funding.broadcast_timeout_secs),
            ),
            tracker: ConfirmationTracker::new(
                node.clone(),
                Duration::from_millis(config.confirmation.poll_interval_ms),
                config.confirmation.confirmation_blocks,
            ),
            pending: PendingRegistry::new(
                Duration::from_secs(config.confirmation.retention_secs),
                config.confirmation.max_tracked,
            ),
            keygen: KeyGenerator,
            settings: Settings {
                mode: config.funding.confirmation_mode,
                backoff: RetryBackoff::from_config(&config.funding),
                gas_price_multiplier: config.chain.gas_price_multiplier,
                max_gas_price_gwei: config.chain.max_gas_price_gwei,
                confirmation_timeout: Duration::from_secs(config.confirmation.timeout_secs),
            },
            node,
            builder,
            sequencer,
        })
    }

    /// Assemble the pipeline, seeding the sequencer with the node's pending
    /// nonce for the funding account.
    pub async fn bootstrap(
        node: Arc<dyn NodeClient>,
        account: FundingAccount,
        config: &FaucetConfig,
    ) -> Result<Self, FundingError> {
        let next = node.account_sequence(account.address()).await?;
        tracing::info!(
            address = %account.address(),
            next_sequence = next,
            "Funding account sequence bootstrapped"
        );
        Self::new(node, account, Arc::new(Sequencer::new(next)), config)
    }

    pub fn funding_address(&self) -> Address {
        self.builder.sender()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn pending(&self) -> &PendingRegistry {
        &self.pending
    }

    pub fn node(&self) -> &Arc<dyn NodeClient> {
        &self.node
    }

    /// Send the configured amount to `address`.
    pub async fn fund(&self, address: &str) -> Result<FundReceipt, FundingError> {
        let recipient = validate_recipient(address, self.funding_address())?;
        self.fund_validated(recipient).await
    }

    /// Generate a fresh account and fund it. The generated key is discarded.
    pub async fn generate_and_fund(&self) -> Result<GenFundedReceipt, FundingError> {
        let generated = self.keygen.generate(self.funding_address());
        tracing::debug!(address = %generated.address, "Generated recipient account");
        let receipt = self.fund_validated(generated.address).await?;
        Ok(GenFundedReceipt {
            address: generated.address,
            receipt,
        })
    }

    async fn fund_validated(&self, recipient: Address) -> Result<FundReceipt, FundingError> {
        let started = Instant::now();
        let (tx_hash, sequence) = self.submit(recipient).await?;

        tracing::info!(
            recipient = %recipient,
            tx_hash = %format_tx_hash(&tx_hash),
            sequence,
            amount = %self.builder.amount(),
            denom = %self.builder.denom(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Funding transaction broadcast"
        );

        if self.settings.mode == ConfirmationMode::Async {
            self.track_in_background(tx_hash);
            return Ok(FundReceipt {
                tx_hash,
                sequence,
                confirmation: None,
            });
        }

        let state = self
            .tracker
            .await_confirmation(tx_hash, self.settings.confirmation_timeout)
            .await;
        self.pending.resolve(&tx_hash, state.clone());

        match state {
            ConfirmationState::Failed {
                block_height,
                reason,
            } => Err(FundingError::OnChainFailure {
                tx_hash,
                block_height,
                reason,
            }),
            ConfirmationState::TimedOut | ConfirmationState::Pending => {
                Err(FundingError::ConfirmationTimeout { tx_hash })
            }
            confirmed => Ok(FundReceipt {
                tx_hash,
                sequence,
                confirmation: Some(confirmed),
            }),
        }
    }

    /// Acquire a sequence, build, sign and broadcast, settling the sequence
    /// according to the broadcast outcome.
    async fn submit(&self, recipient: Address) -> Result<(TxHash, u64), FundingError> {
        let gas_price = effective_gas_price(
            self.node.gas_price().await?,
            self.settings.gas_price_multiplier,
            self.settings.max_gas_price_gwei,
        )?;

        let mut attempt = 0u32;
        let mut resynced = false;

        loop {
            attempt += 1;
            let lease = self.sequencer.acquire().await;
            let sequence = lease.sequence();

            let transfer = match self.builder.build(sequence, recipient, gas_price).await {
                Ok(transfer) => transfer,
                Err(e) => {
                    lease.release(false);
                    return Err(e.into());
                }
            };

            match self.broadcaster.broadcast(&transfer).await {
                Ok(tx_hash) => {
                    lease.release(true);
                    self.pending.record(tx_hash, sequence, recipient);
                    return Ok((tx_hash, sequence));
                }
                Err(e @ BroadcastError::Timeout { .. }) => {
                    // The node may hold this sequence already.
                    lease.release(true);
                    self.pending.record(transfer.tx_hash, sequence, recipient);
                    self.track_in_background(transfer.tx_hash);
                    tracing::error!(
                        tx_hash = %format_tx_hash(&transfer.tx_hash),
                        sequence,
                        "Broadcast outcome unknown; sequence treated as spent"
                    );
                    return Err(e.into());
                }
                Err(e) if e.is_sequence_mismatch() && !resynced => {
                    lease.release(false);
                    resynced = true;
                    let next = self.node.account_sequence(self.funding_address()).await?;
                    self.sequencer.resync_from(sequence, next).await;
                }
                Err(e @ BroadcastError::NodeUnavailable(_))
                    if self.settings.backoff.allows_retry_after(attempt) =>
                {
                    lease.release(false);
                    let delay = self.settings.backoff.delay(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Node unavailable, retrying broadcast"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    lease.release(false);
                    return Err(e.into());
                }
            }
        }
    }

    fn track_in_background(&self, tx_hash: TxHash) {
        let tracker = self.tracker.clone();
        let pending = self.pending.clone();
        let timeout = self.settings.confirmation_timeout;
        tokio::spawn(async move {
            let state = tracker.await_confirmation(tx_hash, timeout).await;
            pending.resolve(&tx_hash, state);
        });
    }

    /// Registry entry for `tx_hash`, if tracked.
    pub fn transaction(&self, tx_hash: &TxHash) -> Option<PendingTransaction> {
        self.pending.get(tx_hash)
    }

    /// Wait for a tracked `tx_hash` to resolve, up to the confirmation
    /// timeout or until `cancel` completes. `None` if the faucet is not
    /// tracking the hash.
    pub async fn await_transaction<C>(&self, tx_hash: TxHash, cancel: C) -> Option<PendingTransaction>
    where
        C: Future<Output = ()>,
    {
        let tx = self.pending.get(&tx_hash)?;
        if tx.status.is_terminal() && tx.status != ConfirmationState::TimedOut {
            return Some(tx);
        }

        let state = self
            .tracker
            .await_with_cancel(tx_hash, self.settings.confirmation_timeout, cancel)
            .await;
        // A waiter giving up says nothing about the transaction.
        if state == ConfirmationState::TimedOut {
            return Some(PendingTransaction { status: state, ..tx });
        }
        self.pending.resolve(&tx_hash, state.clone());
        Some(
            self.pending
                .get(&tx_hash)
                .unwrap_or(PendingTransaction { status: state, ..tx }),
        )
    }

    /// Snapshot of the faucet's account and configuration.
    pub async fn status(&self) -> FaucetStatus {
        let balance = match self.node.balance(self.funding_address()).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                tracing::warn!(error = %e, "Funding balance query failed");
                None
            }
        };

        FaucetStatus {
            funding_address: self.funding_address(),
            chain_id: self.builder.chain_id(),
            denom: self.builder.denom().to_string(),
            transfer_amount: self.builder.amount(),
            next_sequence: self.sequencer.peek(),
            balance,
            pending: self.pending.unresolved(),
        }
    }
}
