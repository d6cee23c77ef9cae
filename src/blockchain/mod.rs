//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private keys)
//!     → account.rs (address derivation, signing)
//!
//! Per operation, under sequencer.rs's per-account lock:
//!     → fees.rs (priority fee from fee history)
//!     → transaction.rs TxBuilder (nonce, chain id, fee fields)
//!     → transaction.rs TxSubmitter (gas estimate, sign, broadcast)
//! then, lock released:
//!     → confirmation.rs (poll receipt until final or timed out)
//!
//! All network access: rpc.rs (ChainRpc) ← client.rs (alloy, timeouts, failover)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod account;
pub mod client;
pub mod confirmation;
pub mod fees;
pub mod rpc;
pub mod sequencer;
pub mod transaction;
pub mod types;

pub use account::Account;
pub use client::BlockchainClient;
pub use confirmation::ConfirmationWatcher;
pub use fees::{estimate_priority_fee, FeeEstimator, FeeQuote};
pub use rpc::ChainRpc;
pub use sequencer::{AccountSequencer, InFlight, NonceLedger};
pub use transaction::{FeeFields, TxBuilder, TxRequest, TxSource, TxSubmitter};
pub use types::{
    BlockchainError, BlockchainResult, ConfirmationResult, FeeData, TransactionHandle, TxReceipt,
};
