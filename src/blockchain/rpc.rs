//! The network boundary.
//!
//! Every component reaches the chain through [`ChainRpc`]. The production
//! implementation is [`BlockchainClient`](crate::blockchain::client::BlockchainClient);
//! tests substitute an in-memory chain.

use std::future::Future;

use alloy::primitives::{Address, Bytes, TxHash};

use crate::blockchain::transaction::TxRequest;
use crate::blockchain::types::{BlockchainResult, FeeData, TxReceipt};

/// JSON-RPC methods consumed by the minting core.
///
/// Everything except `send_raw_transaction` is an idempotent read.
pub trait ChainRpc: Send + Sync {
    /// `eth_chainId`.
    fn chain_id(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// `eth_getTransactionCount` against the pending block.
    fn transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// `eth_blockNumber`.
    fn block_number(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Current gas price and, when the chain has a base fee, EIP-1559 suggestions.
    fn fee_data(&self) -> impl Future<Output = BlockchainResult<FeeData>> + Send;

    /// `eth_feeHistory` ending at the latest block. One reward row per block,
    /// one column per requested percentile.
    fn fee_history(
        &self,
        block_count: u64,
        reward_percentiles: &[f64],
    ) -> impl Future<Output = BlockchainResult<Vec<Vec<u128>>>> + Send;

    /// `eth_call` against the latest block.
    fn call(
        &self,
        to: Address,
        data: Bytes,
    ) -> impl Future<Output = BlockchainResult<Bytes>> + Send;

    /// `eth_estimateGas` for an unsigned request.
    fn estimate_gas(
        &self,
        request: &TxRequest,
    ) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// `eth_sendRawTransaction`. Never retried.
    fn send_raw_transaction(
        &self,
        raw: Bytes,
    ) -> impl Future<Output = BlockchainResult<TxHash>> + Send;

    /// `eth_getTransactionReceipt`; `None` while the transaction is pending.
    fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = BlockchainResult<Option<TxReceipt>>> + Send;
}
