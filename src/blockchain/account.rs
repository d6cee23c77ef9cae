//! Account identity and signing.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables or passed in directly
//! - Keys are never logged or serialized
//! - An `Account` is immutable once derived

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::{Signature, Signer};

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable holding the requesting account's private key.
pub const ACCOUNT_KEY_ENV_VAR: &str = "MINTER_ACCOUNT_PRIVATE_KEY";

/// An address plus the credential it was derived from.
#[derive(Clone)]
pub struct Account {
    signer: PrivateKeySigner,
}

impl Account {
    /// Derive an account from a hex-encoded private key (with or without 0x prefix).
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let trimmed = private_key_hex.trim();
        let key_hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if key_hex.is_empty() {
            return Err(BlockchainError::InvalidCredential(
                "private key is required".to_string(),
            ));
        }

        let signer: PrivateKeySigner = key_hex.parse().map_err(|e| {
            BlockchainError::InvalidCredential(format!("Invalid private key format: {}", e))
        })?;

        tracing::debug!(address = %signer.address(), "Account derived");

        Ok(Self { signer })
    }

    /// Derive from an optional credential; `None` is reported as missing.
    pub fn derive(credential: Option<&str>) -> BlockchainResult<Self> {
        match credential {
            Some(key) => Self::from_private_key(key),
            None => Err(BlockchainError::InvalidCredential(
                "private key is required".to_string(),
            )),
        }
    }

    /// Load an account from the named environment variable.
    pub fn from_env(var: &str) -> BlockchainResult<Self> {
        let private_key = std::env::var(var).map_err(|_| {
            BlockchainError::InvalidCredential(format!("Environment variable {} not set", var))
        })?;

        Self::from_private_key(&private_key)
    }

    /// The account's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// EIP-55 mixed-case rendering of the address.
    pub fn checksum_address(&self) -> String {
        self.address().to_checksum(None)
    }

    /// Sign a 32-byte digest without any prefix.
    pub async fn sign_hash(&self, hash: B256) -> BlockchainResult<Signature> {
        self.signer
            .sign_hash(&hash)
            .await
            .map_err(|e| BlockchainError::SigningFailed(format!("Signing failed: {}", e)))
    }

    /// Wallet wrapper used to sign transaction envelopes.
    pub fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.checksum_address())
            .finish_non_exhaustive()
    }
}
