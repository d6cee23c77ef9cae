//! Confirmation monitoring.
//!
//! The watcher only reads. Calling it again with the same handle repeats the
//! same lookups and, once the transaction is final, yields the same verdict.

use alloy::primitives::TxHash;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{ConfirmationResult, TransactionHandle};
use crate::config::ConfirmationConfig;
use crate::observability::metrics;

/// Polls for a receipt until the transaction is final or the deadline passes.
pub struct ConfirmationWatcher<R> {
    rpc: Arc<R>,
    poll_interval: Duration,
    required_confirmations: u64,
    timeout: Duration,
}

impl<R: ChainRpc> ConfirmationWatcher<R> {
    pub fn new(rpc: Arc<R>, config: &ConfirmationConfig) -> Self {
        Self {
            rpc,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            required_confirmations: config.required_confirmations,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Wait with the configured confirmation depth and timeout.
    pub async fn wait(&self, handle: &TransactionHandle) -> ConfirmationResult {
        self.wait_with(handle, self.required_confirmations, self.timeout)
            .await
    }

    /// Wait for `required_confirmations` blocks (the inclusion block counts as
    /// one) or until `deadline` elapses.
    ///
    /// A revert is reported as soon as the receipt shows it. Lookup errors are
    /// logged and polling continues; only the deadline ends an unresolved wait.
    pub async fn wait_with(
        &self,
        handle: &TransactionHandle,
        required_confirmations: u64,
        deadline: Duration,
    ) -> ConfirmationResult {
        let required = required_confirmations.max(1);
        let verdict = timeout(deadline, self.poll(handle.hash, required))
            .await
            .unwrap_or(ConfirmationResult::TimedOut);

        metrics::record_confirmation(verdict.label());
        match &verdict {
            ConfirmationResult::Confirmed(receipt) => tracing::info!(
                tx_hash = %handle.hash,
                block_number = ?receipt.block_number,
                gas_used = receipt.gas_used,
                "Transaction confirmed"
            ),
            ConfirmationResult::Reverted(receipt) => tracing::warn!(
                tx_hash = %handle.hash,
                block_number = ?receipt.block_number,
                "Transaction reverted"
            ),
            ConfirmationResult::TimedOut => tracing::warn!(
                tx_hash = %handle.hash,
                timeout_ms = deadline.as_millis() as u64,
                "Transaction not confirmed before timeout"
            ),
        }
        verdict
    }

    async fn poll(&self, tx_hash: TxHash, required: u64) -> ConfirmationResult {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let receipt = match self.rpc.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => receipt,
                Ok(None) => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed");
                    continue;
                }
            };

            if !receipt.success {
                return ConfirmationResult::Reverted(receipt);
            }

            let Some(tx_block) = receipt.block_number else {
                continue;
            };
            if required == 1 {
                return ConfirmationResult::Confirmed(receipt);
            }

            let current_block = match self.rpc.block_number().await {
                Ok(block) => block,
                Err(e) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Block number lookup failed");
                    continue;
                }
            };
            let confirmations = current_block.saturating_sub(tx_block) + 1;
            if confirmations >= required {
                return ConfirmationResult::Confirmed(receipt);
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations = confirmations,
                required = required,
                "Waiting for confirmations"
            );
        }
    }
}
