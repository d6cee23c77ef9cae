//! Administrator co-signing.
//!
//! The administrator account is handed to the signer at construction and never
//! read from ambient state. It only signs; it never pays gas.

use alloy::primitives::{Address, U256};
use alloy::sol_types::Eip712Domain;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::contracts::{call_view, IAdminMintableERC1155, IAdminMintableERC20};
use crate::assets::types::{AssetKind, TokenParams};
use crate::authorization::types::{
    AuthorizationError, AuthorizationMessage, AuthorizationResult, Mint, MintAuthorization,
    MintRequest,
};
use crate::blockchain::account::Account;
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::sequencer::{InFlight, NonceLedger};
use crate::blockchain::types::BlockchainResult;
use crate::config::ContractConfig;
use crate::observability::metrics;

/// EIP-712 name and version a contract declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSpec {
    /// `None` reads `name()` from the contract on each authorization.
    pub name: Option<String>,
    pub version: String,
}

impl Default for DomainSpec {
    fn default() -> Self {
        Self {
            name: None,
            version: "1".to_string(),
        }
    }
}

impl From<&ContractConfig> for DomainSpec {
    fn from(config: &ContractConfig) -> Self {
        Self {
            name: config.domain_name.clone(),
            version: config.domain_version.clone(),
        }
    }
}

/// Produces administrator-signed mint authorizations.
pub struct AuthorizationSigner<R> {
    rpc: Arc<R>,
    admin: Account,
    ledger: NonceLedger,
    domains: HashMap<Address, DomainSpec>,
    deadline: U256,
}

impl<R: ChainRpc> AuthorizationSigner<R> {
    pub fn new(rpc: Arc<R>, admin: Account) -> Self {
        Self {
            rpc,
            admin,
            ledger: NonceLedger::new(),
            domains: HashMap::new(),
            deadline: U256::ZERO,
        }
    }

    /// Register the domain a contract declares.
    pub fn with_domain(mut self, contract: Address, domain: DomainSpec) -> Self {
        self.domains.insert(contract, domain);
        self
    }

    /// Value for the fungible `deadline` field. Passed through verbatim.
    pub fn with_deadline(mut self, deadline: U256) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn admin_address(&self) -> Address {
        self.admin.address()
    }

    pub fn ledger(&self) -> &NonceLedger {
        &self.ledger
    }

    /// Authorize `account` to mint `params` on `contract`.
    ///
    /// Reads the contract nonce and the live chain id, reserves the next free
    /// nonce for (`account`, `contract`) and signs with the administrator key.
    /// The reservation stays until released by whoever submits the result, or
    /// until a later call finds its transaction dropped.
    pub async fn authorize(
        &self,
        account: &Account,
        contract: Address,
        params: &TokenParams,
    ) -> AuthorizationResult<MintAuthorization> {
        let requester = account.address();
        if requester == self.admin.address() {
            return Err(AuthorizationError::SelfAuthorization(requester));
        }

        let on_chain = self.contract_nonce(contract, requester, params.kind()).await?;
        let chain_id = self
            .rpc
            .chain_id()
            .await
            .map_err(|e| AuthorizationError::ChainQueryFailed(e.to_string()))?;
        let domain = self.domain(contract, chain_id).await?;

        self.reconcile(requester, contract, on_chain).await;
        let nonce = self.ledger.reserve(requester, contract, on_chain);
        let message = self.message(requester, nonce, params);

        let signature = match self.admin.sign_hash(message.signing_hash(&domain)).await {
            Ok(signature) => signature,
            Err(e) => {
                self.ledger.release(requester, contract, nonce);
                return Err(AuthorizationError::SigningFailed(e.to_string()));
            }
        };

        metrics::record_authorization(message.role().primary_type());
        tracing::info!(
            account = %requester,
            contract = %contract,
            nonce = nonce,
            chain_id = chain_id,
            schema = message.role().primary_type(),
            "Mint authorized"
        );

        Ok(MintAuthorization {
            domain,
            fields: message.role().fields(),
            message,
            signature,
        })
    }

    /// Release reservations whose transaction can no longer land.
    ///
    /// A transaction that reverted frees its nonce. One without a receipt that
    /// the node no longer counts among the account's pending transactions was
    /// dropped. Anything that cannot be checked stays reserved.
    async fn reconcile(&self, account: Address, contract: Address, on_chain: u64) {
        for (nonce, tx) in self.ledger.in_flight(account, contract) {
            if nonce < on_chain {
                continue;
            }
            match self.is_abandoned(account, &tx).await {
                Ok(true) => {
                    tracing::warn!(
                        account = %account,
                        contract = %contract,
                        nonce = nonce,
                        tx_hash = %tx.tx_hash,
                        "Pending mint was dropped, releasing its nonce"
                    );
                    self.ledger.release(account, contract, nonce);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(
                        tx_hash = %tx.tx_hash,
                        error = %e,
                        "Pending mint status unknown, keeping its nonce"
                    );
                }
            }
        }
    }

    async fn is_abandoned(&self, account: Address, tx: &InFlight) -> BlockchainResult<bool> {
        if let Some(receipt) = self.rpc.transaction_receipt(tx.tx_hash).await? {
            // A successful mint is pruned once the contract nonce moves past it
            return Ok(!receipt.success);
        }
        let pending_count = self.rpc.transaction_count(account).await?;
        Ok(pending_count <= tx.tx_nonce)
    }

    async fn contract_nonce(
        &self,
        contract: Address,
        owner: Address,
        kind: AssetKind,
    ) -> AuthorizationResult<u64> {
        let nonce = match kind {
            AssetKind::MultiToken => {
                call_view(&*self.rpc, contract, IAdminMintableERC1155::noncesCall { owner }).await
            }
            AssetKind::Fungible => {
                call_view(&*self.rpc, contract, IAdminMintableERC20::noncesCall { owner }).await
            }
        }
        .map_err(|e| AuthorizationError::NonceQueryFailed(e.to_string()))?;

        u64::try_from(nonce).map_err(|_| {
            AuthorizationError::NonceQueryFailed(format!("Nonce {} out of range", nonce))
        })
    }

    async fn domain(&self, contract: Address, chain_id: u64) -> AuthorizationResult<Eip712Domain> {
        let spec = self.domains.get(&contract).cloned().unwrap_or_default();
        let name = match spec.name {
            Some(name) => name,
            None => call_view(&*self.rpc, contract, IAdminMintableERC20::nameCall {})
                .await
                .map_err(|e| AuthorizationError::ContractQueryFailed(e.to_string()))?,
        };

        Ok(Eip712Domain::new(
            Some(Cow::Owned(name)),
            Some(Cow::Owned(spec.version)),
            Some(U256::from(chain_id)),
            Some(contract),
            None,
        ))
    }

    fn message(&self, to: Address, nonce: u64, params: &TokenParams) -> AuthorizationMessage {
        let nonce = U256::from(nonce);
        match *params {
            TokenParams::MultiToken { id, amount } => {
                AuthorizationMessage::MultiToken(MintRequest { to, id, amount, nonce })
            }
            TokenParams::Fungible { amount } => AuthorizationMessage::Fungible(Mint {
                to,
                amount,
                nonce,
                deadline: self.deadline,
            }),
        }
    }
}
