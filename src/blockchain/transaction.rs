//! Transaction building, signing and broadcast.
//!
//! # Responsibilities
//! - Assemble chain-aware requests (nonce, chain id, exactly one fee-field set)
//! - Estimate gas when the request has no limit
//! - Sign with the account credential and broadcast once
//!
//! Broadcast failures are never retried: resending with the same nonce after a
//! conflict would either duplicate work or fail identically.

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use std::sync::Arc;

use crate::blockchain::account::Account;
use crate::blockchain::fees::FeeEstimator;
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{BlockchainError, BlockchainResult, FeeData, TransactionHandle};
use crate::config::{FeeConfig, FeeStrategy};
use crate::observability::metrics;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// The fee fields a request carries: EIP-1559 pair or legacy gas price, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeFields {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

impl FeeFields {
    /// Prefer the EIP-1559 pair when the node offers both halves of it.
    pub fn from_fee_data(fee_data: &FeeData) -> BlockchainResult<Self> {
        match (
            fee_data.max_fee_per_gas,
            fee_data.max_priority_fee_per_gas,
            fee_data.gas_price,
        ) {
            (Some(max_fee_per_gas), Some(max_priority_fee_per_gas), _) => Ok(FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            }),
            (_, _, Some(gas_price)) => Ok(FeeFields::Legacy { gas_price }),
            _ => Err(BlockchainError::TransactionBuildFailed(
                "node returned no usable fee data".to_string(),
            )),
        }
    }

    pub fn is_eip1559(&self) -> bool {
        matches!(self, FeeFields::Eip1559 { .. })
    }

    /// The most the sender may pay per unit of gas.
    pub fn max_fee(&self) -> u128 {
        match self {
            FeeFields::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
            FeeFields::Legacy { gas_price } => *gas_price,
        }
    }

    /// Swap the priority fee, keeping the base-fee headroom of the max fee.
    /// Legacy fields are returned unchanged.
    pub fn with_priority_fee(self, priority_fee: u128) -> Self {
        match self {
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let base_headroom = max_fee_per_gas.saturating_sub(max_priority_fee_per_gas);
                FeeFields::Eip1559 {
                    max_fee_per_gas: base_headroom.saturating_add(priority_fee),
                    max_priority_fee_per_gas: priority_fee,
                }
            }
            legacy => legacy,
        }
    }

    fn validate(&self) -> BlockchainResult<()> {
        if let FeeFields::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } = self
        {
            if max_priority_fee_per_gas > max_fee_per_gas {
                return Err(BlockchainError::Validation(format!(
                    "maxPriorityFeePerGas {} exceeds maxFeePerGas {}",
                    max_priority_fee_per_gas, max_fee_per_gas
                )));
            }
        }
        Ok(())
    }
}

/// A fully specified, unsigned transaction.
///
/// Built once per submission attempt. Only the gas limit can be filled in later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    from: Address,
    to: Address,
    nonce: u64,
    chain_id: u64,
    value: U256,
    data: Bytes,
    fees: FeeFields,
    gas_limit: Option<u64>,
}

impl TxRequest {
    pub fn new(
        from: Address,
        to: Address,
        nonce: u64,
        chain_id: u64,
        value: U256,
        data: Bytes,
        fees: FeeFields,
    ) -> BlockchainResult<Self> {
        if chain_id == 0 {
            return Err(BlockchainError::Validation("chain id must not be 0".to_string()));
        }
        fees.validate()?;
        Ok(Self {
            from,
            to,
            nonce,
            chain_id,
            value,
            data,
            fees,
            gas_limit: None,
        })
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Address {
        self.to
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn fees(&self) -> FeeFields {
        self.fees
    }

    pub fn gas_limit(&self) -> Option<u64> {
        self.gas_limit
    }

    /// Convert into alloy's request type, setting only the chosen fee fields.
    pub fn to_alloy(&self) -> TransactionRequest {
        let tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.to)
            .with_nonce(self.nonce)
            .with_chain_id(self.chain_id)
            .with_value(self.value)
            .with_input(self.data.clone());

        let tx = match self.fees {
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => tx
                .with_max_fee_per_gas(max_fee_per_gas)
                .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
            FeeFields::Legacy { gas_price } => tx.with_gas_price(gas_price),
        };

        match self.gas_limit {
            Some(gas_limit) => tx.with_gas_limit(gas_limit),
            None => tx,
        }
    }
}

/// What to submit: a call to assemble, or a request the caller already built.
#[derive(Debug, Clone)]
pub enum TxSource {
    Call { to: Address, data: Bytes, value: U256 },
    /// Passed through unmodified.
    Prebuilt(TxRequest),
}

/// Transaction builder for contract calls.
pub struct TxBuilder<R> {
    rpc: Arc<R>,
    estimator: FeeEstimator<R>,
    strategy: FeeStrategy,
    max_fee_gwei: u64,
}

impl<R: ChainRpc> TxBuilder<R> {
    /// Create a new transaction builder.
    pub fn new(rpc: Arc<R>, config: &FeeConfig) -> Self {
        Self {
            estimator: FeeEstimator::new(rpc.clone(), config),
            rpc,
            strategy: config.strategy,
            max_fee_gwei: config.max_fee_gwei,
        }
    }

    /// Build a request for `account` calling `to` with `data`.
    ///
    /// Reads the pending nonce, the live chain id and current fee data. The gas
    /// limit is left for submission.
    pub async fn build(
        &self,
        account: &Account,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> BlockchainResult<TxRequest> {
        let from = account.address();

        let nonce = self
            .rpc
            .transaction_count(from)
            .await
            .map_err(|e| build_failed("transaction count", e))?;
        let chain_id = self
            .rpc
            .chain_id()
            .await
            .map_err(|e| build_failed("chain id", e))?;
        let fee_data = self
            .rpc
            .fee_data()
            .await
            .map_err(|e| build_failed("fee data", e))?;

        let mut fees = FeeFields::from_fee_data(&fee_data)?;
        if self.strategy == FeeStrategy::FeeHistory && fees.is_eip1559() {
            let quote = self
                .estimator
                .quote()
                .await
                .map_err(|e| build_failed("fee history", e))?;
            if quote.basis > 0 {
                fees = fees.with_priority_fee(quote.priority_fee);
            }
        }
        self.check_fee_cap(&fees)?;

        let request = TxRequest::new(from, to, nonce, chain_id, value, data, fees)?;

        tracing::debug!(
            from = %from,
            to = %to,
            nonce = nonce,
            chain_id = chain_id,
            eip1559 = fees.is_eip1559(),
            "Transaction request built"
        );

        Ok(request)
    }

    /// Build from a call, or pass a prebuilt request through untouched.
    pub async fn resolve(
        &self,
        account: &Account,
        source: TxSource,
    ) -> BlockchainResult<TxRequest> {
        match source {
            TxSource::Call { to, data, value } => self.build(account, to, data, value).await,
            TxSource::Prebuilt(request) => Ok(request),
        }
    }

    fn check_fee_cap(&self, fees: &FeeFields) -> BlockchainResult<()> {
        let cap_wei = u128::from(self.max_fee_gwei).saturating_mul(WEI_PER_GWEI);
        if fees.max_fee() > cap_wei {
            let current_gwei = fees.max_fee().div_ceil(WEI_PER_GWEI);
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: u64::try_from(current_gwei).unwrap_or(u64::MAX),
                max_gwei: self.max_fee_gwei,
            });
        }
        Ok(())
    }
}

fn build_failed(what: &str, err: BlockchainError) -> BlockchainError {
    BlockchainError::TransactionBuildFailed(format!("{} query failed: {}", what, err))
}

/// Signs requests with the account credential and broadcasts them.
pub struct TxSubmitter<R> {
    rpc: Arc<R>,
    gas_limit_multiplier: f64,
}

impl<R: ChainRpc> TxSubmitter<R> {
    pub fn new(rpc: Arc<R>, config: &FeeConfig) -> Self {
        Self {
            rpc,
            gas_limit_multiplier: config.gas_limit_multiplier,
        }
    }

    /// Sign and broadcast. Returns as soon as the node acknowledges the transaction.
    pub async fn submit(
        &self,
        account: &Account,
        request: TxRequest,
    ) -> BlockchainResult<TransactionHandle> {
        if request.from() != account.address() {
            return Err(BlockchainError::Validation(format!(
                "request is from {} but signing account is {}",
                request.from(),
                account.address()
            )));
        }

        let gas_limit = match request.gas_limit() {
            Some(limit) => limit,
            None => {
                let estimate = self.rpc.estimate_gas(&request).await.map_err(|e| {
                    metrics::record_submission(false);
                    BlockchainError::SubmissionRejected(format!("gas estimation failed: {}", e))
                })?;
                scale_gas_limit(estimate, self.gas_limit_multiplier)
            }
        };
        let request = request.with_gas_limit(gas_limit);

        let wallet = account.wallet();
        let unsigned = request.to_alloy();
        let envelope =
            <TransactionRequest as TransactionBuilder<Ethereum>>::build(unsigned, &wallet)
                .await
                .map_err(|e| BlockchainError::SigningFailed(e.to_string()))?;
        let local_hash = *envelope.tx_hash();
        let raw = Bytes::from(envelope.encoded_2718());

        let hash = match self.rpc.send_raw_transaction(raw).await {
            Ok(hash) => hash,
            Err(e) => {
                metrics::record_submission(false);
                tracing::warn!(
                    account = %account.address(),
                    nonce = request.nonce(),
                    tx_hash = %local_hash,
                    error = %e,
                    "Transaction broadcast failed"
                );
                // Only an explicit refusal proves the node dropped it
                return Err(match e {
                    BlockchainError::SubmissionRejected(_) => e,
                    other => BlockchainError::BroadcastUncertain {
                        tx_hash: local_hash,
                        nonce: request.nonce(),
                        reason: other.to_string(),
                    },
                });
            }
        };

        if hash != local_hash {
            tracing::warn!(
                local = %local_hash,
                remote = %hash,
                "Node reported a different transaction hash"
            );
        }
        metrics::record_submission(true);
        tracing::info!(
            account = %account.address(),
            tx_hash = %hash,
            nonce = request.nonce(),
            gas_limit = gas_limit,
            "Transaction submitted"
        );

        Ok(TransactionHandle {
            hash,
            nonce: request.nonce(),
            submitted_value: request.value(),
            submitted_data: request.data().clone(),
            gas_limit,
        })
    }
}

/// Apply a safety multiplier to a gas estimate, rounding up.
pub fn scale_gas_limit(estimate: u64, multiplier: f64) -> u64 {
    if multiplier <= 1.0 {
        return estimate;
    }
    (estimate as f64 * multiplier).ceil() as u64
}
