//! Priority fee estimation from recent fee history.
//!
//! Blocks whose reward at the chosen percentile is zero had no competing
//! priority fee; they are dropped before averaging so they do not drag the
//! estimate toward zero.

use std::sync::Arc;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::FeeConfig;
use crate::observability::metrics;

/// A recommended priority fee and how many samples it was averaged from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    /// Wei per gas.
    pub priority_fee: u128,
    /// Number of non-zero samples averaged. Zero means no usable history.
    pub basis: usize,
}

/// Average the non-zero rewards in column `percentile_index`, rounded to nearest.
///
/// Rows missing the column count as zero. With no usable sample the result is 0.
pub fn estimate_priority_fee(rewards: &[Vec<u128>], percentile_index: usize) -> FeeQuote {
    let samples: Vec<u128> = rewards
        .iter()
        .filter_map(|row| row.get(percentile_index).copied())
        .filter(|fee| *fee != 0)
        .collect();

    let divisor = samples.len().max(1) as u128;
    let sum = samples.iter().fold(0u128, |acc, fee| acc.saturating_add(*fee));

    FeeQuote {
        // round half up
        priority_fee: sum.saturating_add(divisor / 2) / divisor,
        basis: samples.len(),
    }
}

/// Queries fee history and turns it into a [`FeeQuote`]. Nothing is cached.
pub struct FeeEstimator<R> {
    rpc: Arc<R>,
    block_count: u64,
    reward_percentile: f64,
}

impl<R: ChainRpc> FeeEstimator<R> {
    pub fn new(rpc: Arc<R>, config: &FeeConfig) -> Self {
        Self {
            rpc,
            block_count: config.history_blocks,
            reward_percentile: config.reward_percentile,
        }
    }

    /// Fetch the latest history window and estimate the priority fee.
    pub async fn quote(&self) -> BlockchainResult<FeeQuote> {
        let rewards = self
            .rpc
            .fee_history(self.block_count, &[self.reward_percentile])
            .await
            .map_err(|e| BlockchainError::FeeQueryFailed(e.to_string()))?;

        let quote = estimate_priority_fee(&rewards, 0);
        metrics::record_fee_quote(quote.basis);
        tracing::debug!(
            blocks = rewards.len(),
            basis = quote.basis,
            priority_fee = %quote.priority_fee,
            "Priority fee estimated"
        );
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[u128]) -> Vec<Vec<u128>> {
        values.iter().map(|v| vec![*v]).collect()
    }

    #[test]
    fn test_zero_samples_are_ignored() {
        let quote = estimate_priority_fee(&column(&[0, 0, 5, 10, 0, 15]), 0);
        assert_eq!(quote, FeeQuote { priority_fee: 10, basis: 3 });
    }

    #[test]
    fn test_all_zero_history() {
        let quote = estimate_priority_fee(&column(&[0, 0, 0]), 0);
        assert_eq!(quote, FeeQuote { priority_fee: 0, basis: 0 });

        let quote = estimate_priority_fee(&[], 0);
        assert_eq!(quote, FeeQuote { priority_fee: 0, basis: 0 });
    }

    #[test]
    fn test_rounds_to_nearest() {
        // 1.5 rounds up
        assert_eq!(estimate_priority_fee(&column(&[1, 2]), 0).priority_fee, 2);
        // 4/3 rounds down
        assert_eq!(estimate_priority_fee(&column(&[1, 1, 2]), 0).priority_fee, 1);
        // 5/3 rounds up
        assert_eq!(estimate_priority_fee(&column(&[1, 2, 2]), 0).priority_fee, 2);
    }

    #[test]
    fn test_selects_percentile_column() {
        let rewards = vec![vec![1, 100], vec![0, 0], vec![3, 300], vec![5]];
        let quote = estimate_priority_fee(&rewards, 1);
        assert_eq!(quote, FeeQuote { priority_fee: 200, basis: 2 });
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let quote = estimate_priority_fee(&column(&[u128::MAX, u128::MAX]), 0);
        assert_eq!(quote.basis, 2);
        assert!(quote.priority_fee > 0);
    }
}
