//! Funding account: the key every faucet transfer is signed with.
//!
//! # Security
//! - The private key comes from config or `FAUCET_FUNDING_PRIVATE_KEY`
//! - Keys are never logged, serialized or returned
//! - Only the derived address leaves this module

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::chain::types::{ChainError, ChainResult};
use crate::config::PRIVATE_KEY_ENV_VAR;

/// Signing identity of the faucet.
#[derive(Clone)]
pub struct FundingAccount {
    /// Signer the wallet wraps; kept for address derivation.
    signer: PrivateKeySigner,
    /// Network wallet used by the transaction builder.
    wallet: EthereumWallet,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl FundingAccount {
    /// Create an account from a hex-encoded private key (with or without `0x`).
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> ChainResult<Self> {
        let key_hex = private_key_hex
            .trim()
            .strip_prefix("0x")
            .unwrap_or(private_key_hex.trim());

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ChainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Funding account loaded"
        );

        Ok(Self::from_signer(signer, chain_id))
    }

    /// Load the account from `FAUCET_FUNDING_PRIVATE_KEY`.
    pub fn from_env(chain_id: u64) -> ChainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            ChainError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key, chain_id)
    }

    /// Wrap an existing signer.
    pub fn from_signer(signer: PrivateKeySigner, chain_id: u64) -> Self {
        let wallet = EthereumWallet::from(signer.clone());
        Self {
            signer,
            wallet,
            chain_id,
        }
    }

    /// A throwaway account with a random key, for the simulated chain.
    pub fn random(chain_id: u64) -> Self {
        Self::from_signer(PrivateKeySigner::random(), chain_id)
    }

    /// Address transfers are sent from.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Chain ID this account signs for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub(crate) fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

impl std::fmt::Debug for FundingAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundingAccount")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
