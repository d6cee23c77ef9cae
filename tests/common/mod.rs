//! Shared utilities for integration tests.
//!
//! [`MockChain`] is an in-memory chain behind the same `ChainRpc` seam the
//! production client implements. It decodes signed transactions, enforces
//! account nonces, and executes the two asset contracts closely enough to
//! accept or revert mints on the same grounds a real deployment would.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, Signature, TxHash, B256, U256};
use alloy::sol_types::{Eip712Domain, SolInterface, SolStruct, SolValue};

use permit_minter::assets::contracts::IAdminMintableERC1155::IAdminMintableERC1155Calls;
use permit_minter::assets::contracts::IAdminMintableERC20::IAdminMintableERC20Calls;
use permit_minter::assets::AssetMinter;
use permit_minter::authorization::{Mint, MintRequest};
use permit_minter::blockchain::transaction::TxRequest;
use permit_minter::blockchain::{
    Account, BlockchainError, BlockchainResult, ChainRpc, FeeData, TxReceipt,
};
use permit_minter::config::MinterConfig;

// Anvil's well-known development keys
pub const ADMIN_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const REQUESTER_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const OTHER_KEY: &str = "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

pub const CHAIN_ID: u64 = 31337;
pub const GWEI: u128 = 1_000_000_000;
pub const BASE_FEE: u128 = 2 * GWEI;
pub const GAS_ESTIMATE: u64 = 80_000;
pub const GAS_USED: u64 = 60_000;

pub const NFT: Address = Address::repeat_byte(0x11);
pub const TOKEN: Address = Address::repeat_byte(0x22);
pub const NFT_DOMAIN_NAME: &str = "AdminMintableERC1155";
pub const TOKEN_NAME: &str = "Permit Token";

pub fn admin() -> Account {
    Account::from_private_key(ADMIN_KEY).unwrap()
}

pub fn requester() -> Account {
    Account::from_private_key(REQUESTER_KEY).unwrap()
}

pub fn other_requester() -> Account {
    Account::from_private_key(OTHER_KEY).unwrap()
}

/// Configuration pointing at the mock contracts with short waits.
pub fn test_config() -> MinterConfig {
    let mut config = MinterConfig::default();
    config.contracts.nft.address = NFT.to_string();
    config.contracts.token.address = TOKEN.to_string();
    config.network.explorer_tx_url = None;
    config.confirmation.poll_interval_ms = 10;
    config.confirmation.timeout_ms = 2_000;
    config.retries.enabled = false;
    config
}

pub fn minter(chain: &Arc<MockChain>) -> AssetMinter<MockChain> {
    AssetMinter::new(chain.clone(), admin(), &test_config()).unwrap()
}

pub fn short_timeout(config: &mut MinterConfig, timeout: Duration) {
    config.confirmation.timeout_ms = timeout.as_millis() as u64;
}

/// What `send_raw_transaction` does with a valid transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastMode {
    /// Mine it at once, after anything already pooled.
    #[default]
    Mine,
    /// Keep it in the pool, then report an RPC timeout.
    PoolThenTimeout,
    /// Acknowledge it, then forget it ever existed.
    Drop,
}

#[derive(Default)]
struct ChainState {
    block: u64,
    account_nonces: HashMap<Address, u64>,
    contract_nonces: HashMap<(Address, Address), u64>,
    nft_balances: HashMap<(Address, U256), U256>,
    token_balances: HashMap<Address, U256>,
    receipts: HashMap<TxHash, TxReceipt>,
    sent: Vec<TxEnvelope>,
    pool: Vec<(Address, TxEnvelope)>,
}

impl ChainState {
    fn account_nonce(&self, account: Address) -> u64 {
        self.account_nonces.get(&account).copied().unwrap_or_default()
    }

    /// Account nonce counting pooled transactions, like the `pending` tag.
    fn pending_nonce(&self, account: Address) -> u64 {
        let pooled = self.pool.iter().filter(|(sender, _)| *sender == account).count();
        self.account_nonce(account) + pooled as u64
    }
}

/// In-memory chain with two asset contracts and an administrator.
pub struct MockChain {
    admin: Address,
    state: Mutex<ChainState>,
    legacy_fees: Mutex<bool>,
    withhold_receipts: Mutex<bool>,
    broadcast_mode: Mutex<BroadcastMode>,
    failing: Mutex<HashSet<&'static str>>,
    rewards: Mutex<Vec<Vec<u128>>>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            admin: admin().address(),
            state: Mutex::new(ChainState {
                block: 100,
                ..ChainState::default()
            }),
            legacy_fees: Mutex::new(false),
            withhold_receipts: Mutex::new(false),
            broadcast_mode: Mutex::new(BroadcastMode::Mine),
            failing: Mutex::new(HashSet::new()),
            rewards: Mutex::new(vec![vec![GWEI]; 25]),
        })
    }

    /// Report only `gasPrice` from `fee_data`.
    pub fn use_legacy_fees(&self) {
        *self.legacy_fees.lock().unwrap() = true;
    }

    /// Accept transactions but never report a receipt.
    pub fn withhold_receipts(&self, withhold: bool) {
        *self.withhold_receipts.lock().unwrap() = withhold;
    }

    pub fn set_broadcast_mode(&self, mode: BroadcastMode) {
        *self.broadcast_mode.lock().unwrap() = mode;
    }

    /// Transactions accepted into the pool but not mined.
    pub fn pooled(&self) -> Vec<TxEnvelope> {
        let state = self.state.lock().unwrap();
        state.pool.iter().map(|(_, envelope)| envelope.clone()).collect()
    }

    /// Mine everything in the pool, oldest first.
    pub fn mine_pool(&self) {
        let mut state = self.state.lock().unwrap();
        self.drain_pool(&mut state);
    }

    /// Make `method` fail until cleared.
    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn set_rewards(&self, rewards: Vec<Vec<u128>>) {
        *self.rewards.lock().unwrap() = rewards;
    }

    pub fn mine_blocks(&self, count: u64) {
        self.state.lock().unwrap().block += count;
    }

    pub fn sent(&self) -> Vec<TxEnvelope> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn contract_nonce(&self, contract: Address, owner: Address) -> u64 {
        let state = self.state.lock().unwrap();
        state
            .contract_nonces
            .get(&(contract, owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn nft_balance(&self, owner: Address, id: u64) -> U256 {
        let state = self.state.lock().unwrap();
        state
            .nft_balances
            .get(&(owner, U256::from(id)))
            .copied()
            .unwrap_or_default()
    }

    pub fn token_balance(&self, owner: Address) -> U256 {
        let state = self.state.lock().unwrap();
        state.token_balances.get(&owner).copied().unwrap_or_default()
    }

    pub fn nft_domain() -> Eip712Domain {
        Eip712Domain::new(
            Some(NFT_DOMAIN_NAME.into()),
            Some("1".into()),
            Some(U256::from(CHAIN_ID)),
            Some(NFT),
            None,
        )
    }

    pub fn token_domain() -> Eip712Domain {
        Eip712Domain::new(
            Some(TOKEN_NAME.into()),
            Some("1".into()),
            Some(U256::from(CHAIN_ID)),
            Some(TOKEN),
            None,
        )
    }

    fn check(&self, method: &'static str) -> BlockchainResult<()> {
        if self.failing.lock().unwrap().contains(method) {
            return Err(BlockchainError::Rpc(format!("{} unavailable", method)));
        }
        Ok(())
    }

    fn signed_by_admin(&self, hash: B256, signature: &Bytes) -> bool {
        Signature::try_from(signature.as_ref())
            .ok()
            .and_then(|sig| sig.recover_address_from_prehash(&hash).ok())
            .is_some_and(|signer| signer == self.admin)
    }

    /// Run a contract call; `false` means the transaction reverts.
    fn execute(&self, state: &mut ChainState, sender: Address, to: Address, input: &Bytes) -> bool {
        if to == NFT {
            let Ok(call) = IAdminMintableERC1155Calls::abi_decode(input) else {
                return false;
            };
            match call {
                IAdminMintableERC1155Calls::mintWithPermit(call) => {
                    let expected = state
                        .contract_nonces
                        .get(&(NFT, call.to))
                        .copied()
                        .unwrap_or_default();
                    if call.nonce != U256::from(expected) {
                        return false;
                    }
                    let request = MintRequest {
                        to: call.to,
                        id: call.id,
                        amount: call.amount,
                        nonce: call.nonce,
                    };
                    let hash = request.eip712_signing_hash(&Self::nft_domain());
                    if !self.signed_by_admin(hash, &call.signature) {
                        return false;
                    }
                    state.contract_nonces.insert((NFT, call.to), expected + 1);
                    *state.nft_balances.entry((call.to, call.id)).or_default() += call.amount;
                    true
                }
                IAdminMintableERC1155Calls::burn(call) => {
                    if call.from != sender {
                        return false;
                    }
                    let balance = state.nft_balances.entry((call.from, call.id)).or_default();
                    if *balance < call.amount {
                        return false;
                    }
                    *balance -= call.amount;
                    true
                }
                _ => false,
            }
        } else if to == TOKEN {
            let Ok(call) = IAdminMintableERC20Calls::abi_decode(input) else {
                return false;
            };
            match call {
                IAdminMintableERC20Calls::mintWithSignature(call) => {
                    let expected = state
                        .contract_nonces
                        .get(&(TOKEN, sender))
                        .copied()
                        .unwrap_or_default();
                    if call.nonce != U256::from(expected) {
                        return false;
                    }
                    let mint = Mint {
                        to: sender,
                        amount: call.amount,
                        nonce: call.nonce,
                        deadline: call.deadline,
                    };
                    let hash = mint.eip712_signing_hash(&Self::token_domain());
                    if !self.signed_by_admin(hash, &call.signature) {
                        return false;
                    }
                    state.contract_nonces.insert((TOKEN, sender), expected + 1);
                    *state.token_balances.entry(sender).or_default() += call.amount;
                    true
                }
                IAdminMintableERC20Calls::burn(call) => {
                    let balance = state.token_balances.entry(sender).or_default();
                    if *balance < call.amount {
                        return false;
                    }
                    *balance -= call.amount;
                    true
                }
                _ => false,
            }
        } else {
            false
        }
    }

    fn drain_pool(&self, state: &mut ChainState) {
        for (sender, envelope) in std::mem::take(&mut state.pool) {
            self.mine(state, sender, envelope);
        }
    }

    /// Include `envelope` in a new block and record its receipt.
    fn mine(&self, state: &mut ChainState, sender: Address, envelope: TxEnvelope) {
        let nonce = state.account_nonce(sender);
        state.account_nonces.insert(sender, nonce + 1);

        let success = match envelope.to() {
            Some(to) => self.execute(state, sender, to, envelope.input()),
            None => false,
        };

        state.block += 1;
        let hash = *envelope.tx_hash();
        let receipt = TxReceipt {
            transaction_hash: hash,
            block_number: Some(state.block),
            gas_used: GAS_USED,
            effective_gas_price: envelope.gas_price().unwrap_or(envelope.max_fee_per_gas()),
            success,
        };
        state.receipts.insert(hash, receipt);
        state.sent.push(envelope);
    }

    fn read(&self, to: Address, data: &Bytes) -> BlockchainResult<Bytes> {
        let state = self.state.lock().unwrap();
        let revert = || BlockchainError::Rpc("execution reverted".to_string());

        let encoded = if to == NFT {
            match IAdminMintableERC1155Calls::abi_decode(data).map_err(|_| revert())? {
                IAdminMintableERC1155Calls::nonces(call) => {
                    self.check("nonces")?;
                    let nonce = state
                        .contract_nonces
                        .get(&(NFT, call.owner))
                        .copied()
                        .unwrap_or_default();
                    U256::from(nonce).abi_encode()
                }
                IAdminMintableERC1155Calls::balanceOf(call) => state
                    .nft_balances
                    .get(&(call.account, call.id))
                    .copied()
                    .unwrap_or_default()
                    .abi_encode(),
                IAdminMintableERC1155Calls::token_name(call) => {
                    format!("Token #{}", call.id).abi_encode()
                }
                _ => return Err(revert()),
            }
        } else if to == TOKEN {
            match IAdminMintableERC20Calls::abi_decode(data).map_err(|_| revert())? {
                IAdminMintableERC20Calls::nonces(call) => {
                    self.check("nonces")?;
                    let nonce = state
                        .contract_nonces
                        .get(&(TOKEN, call.owner))
                        .copied()
                        .unwrap_or_default();
                    U256::from(nonce).abi_encode()
                }
                IAdminMintableERC20Calls::name(_) => TOKEN_NAME.to_string().abi_encode(),
                IAdminMintableERC20Calls::balanceOf(call) => state
                    .token_balances
                    .get(&call.account)
                    .copied()
                    .unwrap_or_default()
                    .abi_encode(),
                _ => return Err(revert()),
            }
        } else {
            return Err(revert());
        };

        Ok(Bytes::from(encoded))
    }
}

impl ChainRpc for MockChain {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.check("chain_id")?;
        Ok(CHAIN_ID)
    }

    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.check("transaction_count")?;
        Ok(self.state.lock().unwrap().pending_nonce(address))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.check("block_number")?;
        Ok(self.state.lock().unwrap().block)
    }

    async fn fee_data(&self) -> BlockchainResult<FeeData> {
        self.check("fee_data")?;
        if *self.legacy_fees.lock().unwrap() {
            return Ok(FeeData {
                gas_price: Some(BASE_FEE),
                max_fee_per_gas: None,
                max_priority_fee_per_gas: None,
            });
        }
        Ok(FeeData {
            gas_price: Some(BASE_FEE),
            max_fee_per_gas: Some(2 * BASE_FEE + GWEI),
            max_priority_fee_per_gas: Some(GWEI),
        })
    }

    async fn fee_history(
        &self,
        block_count: u64,
        _reward_percentiles: &[f64],
    ) -> BlockchainResult<Vec<Vec<u128>>> {
        self.check("fee_history")?;
        let rewards = self.rewards.lock().unwrap();
        Ok(rewards.iter().take(block_count as usize).cloned().collect())
    }

    async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        self.check("call")?;
        self.read(to, &data)
    }

    async fn estimate_gas(&self, _request: &TxRequest) -> BlockchainResult<u64> {
        self.check("estimate_gas")?;
        Ok(GAS_ESTIMATE)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        self.check("send_raw_transaction")
            .map_err(|e| BlockchainError::SubmissionRejected(e.to_string()))?;

        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).map_err(|e| {
            BlockchainError::SubmissionRejected(format!("malformed transaction: {}", e))
        })?;
        let sender = envelope
            .recover_signer()
            .map_err(|e| BlockchainError::SubmissionRejected(format!("invalid signature: {}", e)))?;

        if envelope.chain_id() != Some(CHAIN_ID) {
            return Err(BlockchainError::SubmissionRejected("wrong chain id".to_string()));
        }
        if envelope.to().is_none() {
            return Err(BlockchainError::SubmissionRejected(
                "contract creation not supported".to_string(),
            ));
        }

        let mut state = self.state.lock().unwrap();
        let expected = state.pending_nonce(sender);
        if envelope.nonce() != expected {
            return Err(BlockchainError::SubmissionRejected(format!(
                "nonce mismatch: expected {}, got {}",
                expected,
                envelope.nonce()
            )));
        }

        let hash = *envelope.tx_hash();
        match *self.broadcast_mode.lock().unwrap() {
            BroadcastMode::Mine => {
                self.drain_pool(&mut state);
                self.mine(&mut state, sender, envelope);
                Ok(hash)
            }
            BroadcastMode::PoolThenTimeout => {
                state.pool.push((sender, envelope));
                Err(BlockchainError::Timeout(10))
            }
            BroadcastMode::Drop => Ok(hash),
        }
    }

    async fn transaction_receipt(&self, hash: TxHash) -> BlockchainResult<Option<TxReceipt>> {
        self.check("transaction_receipt")?;
        if *self.withhold_receipts.lock().unwrap() {
            return Ok(None);
        }
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }
}
