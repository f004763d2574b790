//! Transfer construction and signing.
//!
//! Builds EIP-155 legacy value transfers from the funding account. The only
//! source of non-determinism is the signature.

use alloy::eips::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{keccak256, Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use thiserror::Error;

use crate::chain::types::{ChainError, ChainResult};
use crate::chain::FundingAccount;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Misconfiguration or signing failure while building a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid transfer amount '{0}': must be a positive base-unit integer")]
    InvalidAmount(String),

    #[error("invalid denom '{0}': must be non-empty and alphanumeric")]
    InvalidDenom(String),

    #[error("invalid recipient {0}")]
    InvalidRecipient(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Parse a positive base-unit amount.
pub fn parse_amount(value: &str) -> Result<U256, BuildError> {
    let invalid = || BuildError::InvalidAmount(value.to_string());
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let amount = U256::from_str_radix(value, 10).map_err(|_| invalid())?;
    if amount.is_zero() {
        return Err(invalid());
    }
    Ok(amount)
}

/// Check a denom name.
pub fn validate_denom(denom: &str) -> Result<(), BuildError> {
    if denom.is_empty() || !denom.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BuildError::InvalidDenom(denom.to_string()));
    }
    Ok(())
}

/// Scale the node's gas price and enforce the configured ceiling.
pub fn effective_gas_price(node_price: u128, multiplier: f64, max_gwei: u64) -> ChainResult<u128> {
    let scaled = (node_price as f64 * multiplier).ceil() as u128;
    let max = max_gwei as u128 * WEI_PER_GWEI;
    if scaled > max {
        return Err(ChainError::GasPriceTooHigh {
            current_gwei: (scaled / WEI_PER_GWEI) as u64,
            max_gwei,
        });
    }
    Ok(scaled.max(1))
}

/// A signed transfer ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    /// EIP-2718 encoded transaction.
    pub raw: Vec<u8>,
    /// Hash of `raw`, known before the node sees it.
    pub tx_hash: TxHash,
    pub sequence: u64,
    pub recipient: Address,
}

/// Builds and signs fixed-amount transfers from the funding account.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    account: FundingAccount,
    amount: U256,
    denom: String,
    gas_limit: u64,
}

impl TxBuilder {
    /// Create a builder, validating the configured amount and denom.
    pub fn new(
        account: FundingAccount,
        amount: &str,
        denom: &str,
        gas_limit: u64,
    ) -> Result<Self, BuildError> {
        let amount = parse_amount(amount)?;
        validate_denom(denom)?;
        Ok(Self {
            account,
            amount,
            denom: denom.to_string(),
            gas_limit,
        })
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    pub fn sender(&self) -> Address {
        self.account.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.account.chain_id()
    }

    /// Build and sign the transfer of the configured amount to `recipient`.
    pub async fn build(
        &self,
        sequence: u64,
        recipient: Address,
        gas_price: u128,
    ) -> Result<SignedTransfer, BuildError> {
        if recipient == Address::ZERO || recipient == self.account.address() {
            return Err(BuildError::InvalidRecipient(recipient.to_string()));
        }

        let request = TransactionRequest::default()
            .with_from(self.account.address())
            .with_to(recipient)
            .with_value(self.amount)
            .with_nonce(sequence)
            .with_chain_id(self.account.chain_id())
            .with_gas_limit(self.gas_limit)
            .with_gas_price(gas_price);

        let envelope = request
            .build(self.account.wallet())
            .await
            .map_err(|e| BuildError::Signing(e.to_string()))?;

        let raw = envelope.encoded_2718();
        let tx_hash = keccak256(&raw);

        tracing::debug!(
            sequence,
            recipient = %recipient,
            tx_hash = %crate::chain::format_tx_hash(&tx_hash),
            "Transfer signed"
        );

        Ok(SignedTransfer {
            raw,
            tx_hash,
            sequence,
            recipient,
        })
    }
}
