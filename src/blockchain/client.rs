//! Blockchain RPC client with timeout, failover and read retries.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Query chain state (chain id, nonces, fees, receipts, contract reads)
//! - Broadcast signed transactions, once, on the primary endpoint
//! - Handle timeouts and network errors gracefully

use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::TransportResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::transaction::TxRequest;
use crate::blockchain::types::{BlockchainError, BlockchainResult, FeeData, TxReceipt};
use crate::config::NetworkConfig;
use crate::observability::metrics;
use crate::resilience::{retry_idempotent, RetryPolicy};

/// Priority fee suggested when the chain has a base fee (1 gwei).
pub const DEFAULT_PRIORITY_FEE_WEI: u128 = 1_000_000_000;

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<SharedProvider>,
    /// Configuration.
    config: NetworkConfig,
    /// Retry policy for reads.
    retry: RetryPolicy,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Succeeds even if the endpoint is unreachable; a chain-id mismatch is
    /// only logged.
    pub async fn new(config: NetworkConfig, retry: RetryPolicy) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let primary = ProviderBuilder::new().connect_http(primary_url);
        providers.push(Arc::new(primary) as SharedProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                let failover = ProviderBuilder::new().connect_http(url);
                providers.push(Arc::new(failover) as SharedProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            retry,
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    failovers = client.providers.len() - 1,
                    "Blockchain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Blockchain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches the configured expectation, if any.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let Some(expected) = self.config.expected_chain_id else {
            return Ok(());
        };
        let actual = self.chain_id().await?;
        if actual != expected {
            return Err(BlockchainError::ChainMismatch { expected, actual });
        }
        Ok(())
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Run an idempotent read with failover, per-call timeout and retries.
    async fn read<T, F, Fut>(&self, method: &'static str, f: F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut + Send + Sync,
        Fut: Future<Output = TransportResult<T>> + Send,
        T: Send,
    {
        let result = retry_idempotent(
            &self.retry,
            method,
            BlockchainError::is_query_failure,
            || self.read_once(method, &f),
        )
        .await;
        metrics::record_rpc_call(method, result.is_ok());
        result
    }

    async fn read_once<T, F, Fut>(&self, method: &'static str, f: &F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut + Send + Sync,
        Fut: Future<Output = TransportResult<T>> + Send,
        T: Send,
    {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, f(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(
                        provider_idx = i,
                        method = method,
                        error = %e,
                        "RPC error, trying next provider"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        provider_idx = i,
                        method = method,
                        "RPC timeout, trying next provider"
                    );
                }
            }
        }
        Err(BlockchainError::Rpc(format!("All RPC providers failed for {}", method)))
    }
}

impl ChainRpc for BlockchainClient {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.read("eth_chainId", |p| async move { p.get_chain_id().await }).await
    }

    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.read("eth_getTransactionCount", move |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.read("eth_blockNumber", |p| async move { p.get_block_number().await }).await
    }

    async fn fee_data(&self) -> BlockchainResult<FeeData> {
        let gas_price = self
            .read("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await?;
        let latest = self
            .read("eth_getBlockByNumber", |p| async move {
                p.get_block_by_number(BlockNumberOrTag::Latest).await
            })
            .await?;

        let base_fee = latest.and_then(|block| block.header.base_fee_per_gas);
        let fee_data = match base_fee {
            Some(base_fee) => {
                let priority = DEFAULT_PRIORITY_FEE_WEI;
                FeeData {
                    gas_price: Some(gas_price),
                    max_fee_per_gas: Some(u128::from(base_fee) * 2 + priority),
                    max_priority_fee_per_gas: Some(priority),
                }
            }
            None => FeeData {
                gas_price: Some(gas_price),
                max_fee_per_gas: None,
                max_priority_fee_per_gas: None,
            },
        };
        Ok(fee_data)
    }

    async fn fee_history(
        &self,
        block_count: u64,
        reward_percentiles: &[f64],
    ) -> BlockchainResult<Vec<Vec<u128>>> {
        let percentiles = reward_percentiles.to_vec();
        let history = self
            .read("eth_feeHistory", move |p| {
                let percentiles = percentiles.clone();
                async move {
                    p.get_fee_history(block_count, BlockNumberOrTag::Latest, &percentiles)
                        .await
                }
            })
            .await?;
        Ok(history.reward.unwrap_or_default())
    }

    async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        self.read("eth_call", move |p| {
            let request = request.clone();
            async move { p.call(request).await }
        })
        .await
    }

    async fn estimate_gas(&self, request: &TxRequest) -> BlockchainResult<u64> {
        let request = request.to_alloy();
        self.read("eth_estimateGas", move |p| {
            let request = request.clone();
            async move { p.estimate_gas(request).await }
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let provider = self
            .providers
            .first()
            .ok_or_else(|| BlockchainError::Rpc("No RPC provider configured".to_string()))?;

        let sent = timeout(self.timeout_duration, provider.send_raw_transaction(&raw)).await;
        let result = match sent {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            // The node answered with an error: it did not take the transaction
            Ok(Err(e)) if e.as_error_resp().is_some() => {
                Err(BlockchainError::SubmissionRejected(e.to_string()))
            }
            Ok(Err(e)) => Err(BlockchainError::Rpc(e.to_string())),
            Err(_) => Err(BlockchainError::Timeout(self.config.rpc_timeout_secs)),
        };
        metrics::record_rpc_call("eth_sendRawTransaction", result.is_ok());
        result
    }

    async fn transaction_receipt(&self, hash: TxHash) -> BlockchainResult<Option<TxReceipt>> {
        let receipt = self
            .read("eth_getTransactionReceipt", move |p| async move {
                p.get_transaction_receipt(hash).await
            })
            .await?;
        Ok(receipt.as_ref().map(to_receipt))
    }
}

fn to_receipt(receipt: &TransactionReceipt) -> TxReceipt {
    TxReceipt {
        transaction_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        success: receipt.status(),
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("providers", &self.providers.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
