//! Chain-specific types and error definitions.

use alloy::primitives::{Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Private key absent or malformed.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Fee history could not be read.
    #[error("Fee query failed: {0}")]
    FeeQueryFailed(String),

    /// A query needed to assemble the transaction failed.
    #[error("Transaction build failed: {0}")]
    TransactionBuildFailed(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Request rejected before it reached the network.
    #[error("Invalid transaction request: {0}")]
    Validation(String),

    /// The account credential could not sign the request.
    #[error("Transaction signing failed: {0}")]
    SigningFailed(String),

    /// The node refused the broadcast.
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// The broadcast got no answer. The transaction may or may not be pooled.
    #[error("Broadcast of {tx_hash} (nonce {nonce}) unacknowledged: {reason}")]
    BroadcastUncertain {
        tx_hash: TxHash,
        nonce: u64,
        reason: String,
    },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl BlockchainError {
    /// Whether the failure came from a read that may succeed if repeated.
    pub fn is_query_failure(&self) -> bool {
        matches!(
            self,
            BlockchainError::Rpc(_)
                | BlockchainError::Timeout(_)
                | BlockchainError::FeeQueryFailed(_)
                | BlockchainError::TransactionBuildFailed(_)
        )
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Fee-market snapshot as reported by the node.
///
/// The EIP-1559 pair is present only when the latest block carries a base fee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

/// The parts of a transaction receipt the watcher reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    /// Execution status; false means the call reverted.
    pub success: bool,
}

/// Returned by submission, consumed by the confirmation watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
    pub hash: TxHash,
    /// Account nonce the transaction was signed with.
    pub nonce: u64,
    pub submitted_value: U256,
    pub submitted_data: Bytes,
    pub gas_limit: u64,
}

/// Terminal verdict of a confirmation wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationResult {
    /// Included with success status and enough confirmations.
    Confirmed(TxReceipt),
    /// Included, but execution failed.
    Reverted(TxReceipt),
    /// Not included before the deadline. It may still land later.
    TimedOut,
}

impl ConfirmationResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationResult::Confirmed(_))
    }

    /// Confirmed or reverted; the transaction's fate is known.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationResult::TimedOut)
    }

    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            ConfirmationResult::Confirmed(r) | ConfirmationResult::Reverted(r) => Some(r),
            ConfirmationResult::TimedOut => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ConfirmationResult::Confirmed(_) => "confirmed",
            ConfirmationResult::Reverted(_) => "reverted",
            ConfirmationResult::TimedOut => "timed_out",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(success: bool) -> TxReceipt {
        TxReceipt {
            transaction_hash: TxHash::ZERO,
            block_number: Some(7),
            gas_used: 21_000,
            effective_gas_price: 1,
            success,
        }
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");

        let err = BlockchainError::GasPriceTooHigh {
            current_gwei: 600,
            max_gwei: 500,
        };
        assert!(err.to_string().contains("600"));
    }

    #[test]
    fn test_query_failures_are_distinguished() {
        assert!(BlockchainError::Rpc("down".into()).is_query_failure());
        assert!(BlockchainError::FeeQueryFailed("x".into()).is_query_failure());
        assert!(!BlockchainError::SubmissionRejected("nonce too low".into()).is_query_failure());
        assert!(!BlockchainError::InvalidCredential("empty".into()).is_query_failure());

        let uncertain = BlockchainError::BroadcastUncertain {
            tx_hash: TxHash::ZERO,
            nonce: 3,
            reason: "timeout".into(),
        };
        assert!(!uncertain.is_query_failure());
    }

    #[test]
    fn test_confirmation_result_accessors() {
        let confirmed = ConfirmationResult::Confirmed(receipt(true));
        assert!(confirmed.is_confirmed());
        assert!(confirmed.is_terminal());
        assert_eq!(confirmed.receipt().map(|r| r.gas_used), Some(21_000));

        let reverted = ConfirmationResult::Reverted(receipt(false));
        assert!(!reverted.is_confirmed());
        assert!(reverted.is_terminal());
        assert_eq!(reverted.label(), "reverted");

        assert!(!ConfirmationResult::TimedOut.is_terminal());
        assert!(ConfirmationResult::TimedOut.receipt().is_none());
    }
}
