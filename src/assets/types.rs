//! Asset operation types and the top-level error taxonomy.

use alloy::primitives::{utils::format_units, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authorization::AuthorizationError;
use crate::blockchain::types::{BlockchainError, ConfirmationResult, TransactionHandle, TxReceipt};

/// Decimals assumed when rendering fungible amounts in logs.
pub const FUNGIBLE_DECIMALS: u8 = 18;

/// Which kind of contract an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// ERC-20 style token minted with `mintWithSignature`.
    Fungible,
    /// ERC-1155 style contract minted with `mintWithPermit`.
    MultiToken,
}

/// What to mint or burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenParams {
    /// Amount in base units.
    Fungible { amount: U256 },
    MultiToken { id: U256, amount: U256 },
}

impl TokenParams {
    pub fn fungible(amount: U256) -> Self {
        TokenParams::Fungible { amount }
    }

    pub fn multi_token(id: u64, amount: u64) -> Self {
        TokenParams::MultiToken {
            id: U256::from(id),
            amount: U256::from(amount),
        }
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            TokenParams::Fungible { .. } => AssetKind::Fungible,
            TokenParams::MultiToken { .. } => AssetKind::MultiToken,
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            TokenParams::Fungible { amount } | TokenParams::MultiToken { amount, .. } => *amount,
        }
    }

    pub fn token_id(&self) -> Option<U256> {
        match self {
            TokenParams::Fungible { .. } => None,
            TokenParams::MultiToken { id, .. } => Some(*id),
        }
    }

    /// Human-readable amount: whole units for fungible tokens, raw count otherwise.
    pub fn display_amount(&self) -> String {
        match self {
            TokenParams::Fungible { amount } => format_units(*amount, FUNGIBLE_DECIMALS)
                .unwrap_or_else(|_| amount.to_string()),
            TokenParams::MultiToken { amount, .. } => amount.to_string(),
        }
    }
}

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network-layer read failure. May be retried.
    Query,
    /// Malformed input. Fatal.
    Validation,
    /// Signing or nonce problem. Re-read the nonce before trying again.
    Authorization,
    /// Broadcast rejected. Fatal.
    Submission,
    /// Included but execution failed.
    OnChainRevert,
    /// Not confirmed in time, or the broadcast went unanswered. The
    /// transaction may still land; poll its hash again later.
    ConfirmationTimeout,
}

/// Errors surfaced by mint, burn and balance operations.
#[derive(Debug, Error)]
pub enum MintError {
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authorization is for chain {authorized} but the network is chain {actual}")]
    ChainMismatch { authorized: u64, actual: u64 },

    #[error("Contract query failed: {0}")]
    ContractQueryFailed(String),

    #[error("Transaction {} reverted", .0.transaction_hash)]
    Reverted(TxReceipt),

    #[error("Transaction {0} not confirmed before timeout")]
    TimedOut(TxHash),
}

impl MintError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MintError::Blockchain(e) => match e {
                BlockchainError::Rpc(_)
                | BlockchainError::Timeout(_)
                | BlockchainError::FeeQueryFailed(_)
                | BlockchainError::TransactionBuildFailed(_) => ErrorKind::Query,
                BlockchainError::InvalidCredential(_)
                | BlockchainError::Validation(_)
                | BlockchainError::GasPriceTooHigh { .. }
                | BlockchainError::ChainMismatch { .. } => ErrorKind::Validation,
                BlockchainError::SigningFailed(_) => ErrorKind::Authorization,
                BlockchainError::SubmissionRejected(_) => ErrorKind::Submission,
                BlockchainError::BroadcastUncertain { .. } => ErrorKind::ConfirmationTimeout,
            },
            MintError::Authorization(e) => match e {
                AuthorizationError::NonceQueryFailed(_)
                | AuthorizationError::ChainQueryFailed(_)
                | AuthorizationError::ContractQueryFailed(_) => ErrorKind::Query,
                AuthorizationError::SigningFailed(_) => ErrorKind::Authorization,
                AuthorizationError::SelfAuthorization(_) => ErrorKind::Validation,
            },
            MintError::Validation(_) => ErrorKind::Validation,
            MintError::ChainMismatch { .. } => ErrorKind::Authorization,
            MintError::ContractQueryFailed(_) => ErrorKind::Query,
            MintError::Reverted(_) => ErrorKind::OnChainRevert,
            MintError::TimedOut(_) => ErrorKind::ConfirmationTimeout,
        }
    }

    /// Only network-layer read failures are worth retrying as-is.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Query
    }

    /// Fold a non-success verdict into an error, for callers that want one.
    pub fn from_outcome(hash: TxHash, outcome: ConfirmationResult) -> Result<TxReceipt, MintError> {
        match outcome {
            ConfirmationResult::Confirmed(receipt) => Ok(receipt),
            ConfirmationResult::Reverted(receipt) => Err(MintError::Reverted(receipt)),
            ConfirmationResult::TimedOut => Err(MintError::TimedOut(hash)),
        }
    }
}

/// Result type for asset operations.
pub type MintResult<T> = Result<T, MintError>;

/// Confirmation verdict plus the handle it concerns.
///
/// A `TimedOut` result can be re-polled later with the same handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub handle: TransactionHandle,
    pub result: ConfirmationResult,
}

impl OperationOutcome {
    pub fn tx_hash(&self) -> TxHash {
        self.handle.hash
    }

    pub fn is_confirmed(&self) -> bool {
        self.result.is_confirmed()
    }

    /// The receipt of a confirmed transaction, or the matching error.
    pub fn into_receipt(self) -> MintResult<TxReceipt> {
        MintError::from_outcome(self.handle.hash, self.result)
    }
}
