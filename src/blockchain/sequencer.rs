//! Per-account serialization and authorization-nonce reservation.
//!
//! Nonces are read from the chain and then used, with no atomic reservation on
//! the node side. Two operations for the same account must therefore not
//! interleave between reading a nonce and broadcasting the transaction that
//! embeds it. Different accounts share nothing and run in parallel.

use alloy::primitives::{Address, TxHash};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per account address.
#[derive(Clone, Default)]
pub struct AccountSequencer {
    locks: Arc<DashMap<Address, Arc<Mutex<()>>>>,
}

impl AccountSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `account`. Released when the guard drops.
    pub async fn lock(&self, account: Address) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(account).or_default().clone();
        lock.lock_owned().await
    }

    /// Number of accounts that have been sequenced so far.
    pub fn tracked_accounts(&self) -> usize {
        self.locks.len()
    }
}

/// The transaction a reserved nonce was embedded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub tx_hash: TxHash,
    /// Account nonce the transaction was signed with.
    pub tx_nonce: u64,
}

/// Authorization nonces embedded in transactions that have no verdict yet.
///
/// The contract's `nonces(account)` only moves once a transaction lands, so a
/// fresh read while an earlier mint is pending returns a nonce that is already
/// spoken for. The ledger hands out the next free one instead. A reservation
/// without a transaction belongs to an authorization not broadcast yet.
#[derive(Clone, Default)]
pub struct NonceLedger {
    pending: Arc<DashMap<(Address, Address), BTreeMap<u64, Option<InFlight>>>>,
}

impl NonceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the nonce to embed for (`account`, `contract`) given the
    /// contract's current on-chain value.
    ///
    /// Entries below `on_chain` have been consumed and are dropped.
    pub fn reserve(&self, account: Address, contract: Address, on_chain: u64) -> u64 {
        let mut pending = self.pending.entry((account, contract)).or_default();
        pending.retain(|nonce, _| *nonce >= on_chain);

        let next = pending
            .last_key_value()
            .map_or(on_chain, |(last, _)| last.saturating_add(1).max(on_chain));
        pending.insert(next, None);
        next
    }

    /// Record the transaction carrying a reserved nonce. Unknown nonces are ignored.
    pub fn track(&self, account: Address, contract: Address, nonce: u64, tx: InFlight) {
        if let Some(mut pending) = self.pending.get_mut(&(account, contract)) {
            if let Some(slot) = pending.get_mut(&nonce) {
                *slot = Some(tx);
            }
        }
    }

    /// Forget a reservation once its transaction confirmed, reverted or never
    /// reached the network.
    pub fn release(&self, account: Address, contract: Address, nonce: u64) {
        if let Some(mut pending) = self.pending.get_mut(&(account, contract)) {
            pending.remove(&nonce);
        }
    }

    /// Reserved nonces for (`account`, `contract`), ascending.
    pub fn pending(&self, account: Address, contract: Address) -> Vec<u64> {
        self.pending
            .get(&(account, contract))
            .map(|pending| pending.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Reservations whose transaction has been handed to the network.
    pub fn in_flight(&self, account: Address, contract: Address) -> Vec<(u64, InFlight)> {
        self.pending
            .get(&(account, contract))
            .map(|pending| {
                pending
                    .iter()
                    .filter_map(|(nonce, tx)| tx.map(|tx| (*nonce, tx)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
