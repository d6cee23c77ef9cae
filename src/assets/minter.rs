//! The operation surface: mint, burn and balance queries.
//!
//! Authorize, build, sign and submit run under the account's sequencer lock so
//! two operations for one account never race for a nonce. The confirmation wait
//! runs after the lock is released.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use std::str::FromStr;
use std::sync::Arc;

use crate::assets::contracts::{
    call_view, encode_burn, encode_mint, IAdminMintableERC1155, IAdminMintableERC20,
};
use crate::assets::types::{AssetKind, MintError, MintResult, OperationOutcome, TokenParams};
use crate::authorization::{AuthorizationSigner, DomainSpec, MintAuthorization};
use crate::blockchain::account::Account;
use crate::blockchain::confirmation::ConfirmationWatcher;
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::sequencer::{AccountSequencer, InFlight};
use crate::blockchain::transaction::{TxBuilder, TxSubmitter};
use crate::blockchain::types::{BlockchainError, TransactionHandle};
use crate::config::{ContractConfig, MinterConfig};

/// Chains authorization, building, submission and confirmation.
pub struct AssetMinter<R> {
    rpc: Arc<R>,
    signer: AuthorizationSigner<R>,
    builder: TxBuilder<R>,
    submitter: TxSubmitter<R>,
    watcher: ConfirmationWatcher<R>,
    sequencer: AccountSequencer,
    token: Address,
    nft: Address,
    explorer_tx_url: Option<String>,
}

impl<R: ChainRpc> AssetMinter<R> {
    /// Wire every component to `rpc`. `admin` only ever co-signs.
    pub fn new(rpc: Arc<R>, admin: Account, config: &MinterConfig) -> MintResult<Self> {
        let token = parse_contract("contracts.token", &config.contracts.token)?;
        let nft = parse_contract("contracts.nft", &config.contracts.nft)?;

        let signer = AuthorizationSigner::new(rpc.clone(), admin)
            .with_domain(token, DomainSpec::from(&config.contracts.token))
            .with_domain(nft, DomainSpec::from(&config.contracts.nft))
            .with_deadline(U256::from(config.authorization.deadline));

        Ok(Self {
            signer,
            builder: TxBuilder::new(rpc.clone(), &config.fees),
            submitter: TxSubmitter::new(rpc.clone(), &config.fees),
            watcher: ConfirmationWatcher::new(rpc.clone(), &config.confirmation),
            sequencer: AccountSequencer::new(),
            rpc,
            token,
            nft,
            explorer_tx_url: config.network.explorer_tx_url.clone(),
        })
    }

    /// Fungible-token contract address.
    pub fn token_contract(&self) -> Address {
        self.token
    }

    /// Multi-token contract address.
    pub fn nft_contract(&self) -> Address {
        self.nft
    }

    pub fn signer(&self) -> &AuthorizationSigner<R> {
        &self.signer
    }

    pub fn watcher(&self) -> &ConfirmationWatcher<R> {
        &self.watcher
    }

    /// Obtain an administrator authorization for `params` and redeem it.
    pub async fn mint(
        &self,
        account: &Account,
        contract: Address,
        params: TokenParams,
    ) -> MintResult<OperationOutcome> {
        self.check_kind(contract, &params)?;
        self.log_intent("is minting 📥", account, contract, &params)
            .await;

        let (handle, auth) = {
            let _guard = self.sequencer.lock(account.address()).await;
            let auth = self.signer.authorize(account, contract, &params).await?;
            let handle = self.send_authorized(account, contract, &auth).await?;
            (handle, auth)
        };

        self.finish(account, contract, handle, Some(&auth)).await
    }

    /// Redeem an authorization the caller already holds.
    ///
    /// The authorization must be bound to the live chain, to `contract` and to
    /// `account` as recipient. Whether its nonce is still unused is for the
    /// contract to decide. A reservation made for it by [`Self::signer`] is
    /// settled exactly as in [`Self::mint`].
    pub async fn mint_with_authorization(
        &self,
        account: &Account,
        contract: Address,
        auth: &MintAuthorization,
    ) -> MintResult<OperationOutcome> {
        let chain_id = self.rpc.chain_id().await?;
        match auth.chain_id() {
            Some(authorized) if authorized == chain_id => {}
            authorized => {
                return Err(MintError::ChainMismatch {
                    authorized: authorized.unwrap_or_default(),
                    actual: chain_id,
                })
            }
        }
        if auth.verifying_contract() != Some(contract) {
            return Err(MintError::Validation(format!(
                "authorization is bound to {:?}, not {}",
                auth.verifying_contract(),
                contract
            )));
        }
        if auth.recipient() != account.address() {
            return Err(MintError::Validation(format!(
                "authorization names {} as recipient, not {}",
                auth.recipient(),
                account.address()
            )));
        }

        let handle = {
            let _guard = self.sequencer.lock(account.address()).await;
            self.send_authorized(account, contract, auth).await?
        };

        self.finish(account, contract, handle, Some(auth)).await
    }

    /// Burn `params` held by `account`. No authorization is involved.
    pub async fn burn(
        &self,
        account: &Account,
        contract: Address,
        params: TokenParams,
    ) -> MintResult<OperationOutcome> {
        self.check_kind(contract, &params)?;
        self.log_intent("is burning 🔥", account, contract, &params)
            .await;

        let handle = {
            let _guard = self.sequencer.lock(account.address()).await;
            self.send(account, contract, encode_burn(account.address(), &params))
                .await?
        };

        self.finish(account, contract, handle, None).await
    }

    /// `balanceOf(owner)` on a fungible contract, or `balanceOf(owner, id)`
    /// on a multi-token one.
    pub async fn balance_of(
        &self,
        owner: Address,
        contract: Address,
        token_id: Option<U256>,
    ) -> MintResult<U256> {
        let balance = match token_id {
            Some(id) => {
                call_view(
                    &*self.rpc,
                    contract,
                    IAdminMintableERC1155::balanceOfCall { account: owner, id },
                )
                .await
            }
            None => {
                call_view(
                    &*self.rpc,
                    contract,
                    IAdminMintableERC20::balanceOfCall { account: owner },
                )
                .await
            }
        }
        .map_err(|e| MintError::ContractQueryFailed(e.to_string()))?;

        tracing::debug!(
            owner = %owner,
            contract = %contract,
            token_id = ?token_id,
            balance = %balance,
            "Balance read"
        );
        Ok(balance)
    }

    /// Balances of each id in `ids`, in order.
    pub async fn multi_token_balances(
        &self,
        owner: Address,
        contract: Address,
        ids: impl IntoIterator<Item = U256>,
    ) -> MintResult<Vec<(U256, U256)>> {
        let mut balances = Vec::new();
        for id in ids {
            let balance = self.balance_of(owner, contract, Some(id)).await?;
            tracing::info!(owner = %owner, token_id = %id, balance = %balance, "Token balance");
            balances.push((id, balance));
        }
        Ok(balances)
    }

    /// Display name of the asset: `token_name(id)` or `name()`.
    pub async fn token_label(
        &self,
        contract: Address,
        params: &TokenParams,
    ) -> MintResult<String> {
        match params.token_id() {
            Some(id) => {
                call_view(
                    &*self.rpc,
                    contract,
                    IAdminMintableERC1155::token_nameCall { id },
                )
                .await
            }
            None => call_view(&*self.rpc, contract, IAdminMintableERC20::nameCall {}).await,
        }
        .map_err(|e| MintError::ContractQueryFailed(e.to_string()))
    }

    /// `mint`, reduced to whether it confirmed. Every failure is logged.
    pub async fn mint_and_report(
        &self,
        account: &Account,
        contract: Address,
        params: TokenParams,
    ) -> bool {
        report("mint", self.mint(account, contract, params).await)
    }

    /// `burn`, reduced to whether it confirmed. Every failure is logged.
    pub async fn burn_and_report(
        &self,
        account: &Account,
        contract: Address,
        params: TokenParams,
    ) -> bool {
        report("burn", self.burn(account, contract, params).await)
    }

    /// Contract for an asset kind, as configured.
    pub fn contract_for(&self, kind: AssetKind) -> Address {
        match kind {
            AssetKind::Fungible => self.token,
            AssetKind::MultiToken => self.nft,
        }
    }

    /// Parameters of one asset kind never go to the other kind's contract.
    fn check_kind(&self, contract: Address, params: &TokenParams) -> MintResult<()> {
        let configured = contract == self.token || contract == self.nft;
        if configured && self.contract_for(params.kind()) != contract {
            return Err(MintError::Validation(format!(
                "{:?} parameters do not fit contract {}",
                params.kind(),
                contract
            )));
        }
        Ok(())
    }

    /// Send a mint carrying `auth` and settle its nonce reservation.
    ///
    /// A refused transaction frees the nonce. One whose broadcast went
    /// unanswered may still land, so its reservation stays with the hash
    /// attached.
    async fn send_authorized(
        &self,
        account: &Account,
        contract: Address,
        auth: &MintAuthorization,
    ) -> MintResult<TransactionHandle> {
        match self.send(account, contract, encode_mint(auth)).await {
            Ok(handle) => {
                self.track(account, contract, auth, handle.hash, handle.nonce);
                Ok(handle)
            }
            Err(
                e @ MintError::Blockchain(BlockchainError::BroadcastUncertain {
                    tx_hash, nonce, ..
                }),
            ) => {
                self.track(account, contract, auth, tx_hash, nonce);
                Err(e)
            }
            Err(e) => {
                self.release(account, contract, auth);
                Err(e)
            }
        }
    }

    async fn send(
        &self,
        account: &Account,
        contract: Address,
        data: Bytes,
    ) -> MintResult<TransactionHandle> {
        let request = self
            .builder
            .build(account, contract, data, U256::ZERO)
            .await?;
        let handle = self.submitter.submit(account, request).await?;

        if let Some(link) = self.explorer_link(handle.hash) {
            tracing::info!(tx_hash = %handle.hash, link = %link, "Track transaction");
        }
        Ok(handle)
    }

    async fn finish(
        &self,
        account: &Account,
        contract: Address,
        handle: TransactionHandle,
        auth: Option<&MintAuthorization>,
    ) -> MintResult<OperationOutcome> {
        let result = self.watcher.wait(&handle).await;
        if result.is_terminal() {
            if let Some(auth) = auth {
                self.release(account, contract, auth);
            }
        }
        Ok(OperationOutcome { handle, result })
    }

    fn track(
        &self,
        account: &Account,
        contract: Address,
        auth: &MintAuthorization,
        tx_hash: TxHash,
        tx_nonce: u64,
    ) {
        if let Ok(nonce) = u64::try_from(auth.nonce()) {
            self.signer.ledger().track(
                account.address(),
                contract,
                nonce,
                InFlight { tx_hash, tx_nonce },
            );
        }
    }

    fn release(&self, account: &Account, contract: Address, auth: &MintAuthorization) {
        if let Ok(nonce) = u64::try_from(auth.nonce()) {
            self.signer
                .ledger()
                .release(account.address(), contract, nonce);
        }
    }

    fn explorer_link(&self, hash: TxHash) -> Option<String> {
        self.explorer_tx_url
            .as_ref()
            .map(|prefix| format!("{}{}", prefix, hash))
    }

    async fn log_intent(
        &self,
        action: &str,
        account: &Account,
        contract: Address,
        params: &TokenParams,
    ) {
        let label = match self.token_label(contract, params).await {
            Ok(label) => label,
            Err(e) => {
                tracing::debug!(contract = %contract, error = %e, "Token name unavailable");
                contract.to_string()
            }
        };
        tracing::info!(
            account = %account.checksum_address(),
            contract = %contract,
            amount = %params.display_amount(),
            token = %label,
            "{} {}",
            account.checksum_address(),
            action
        );
    }
}

fn parse_contract(field: &str, config: &ContractConfig) -> MintResult<Address> {
    Address::from_str(&config.address)
        .map_err(|e| MintError::Validation(format!("{}: invalid address: {}", field, e)))
}

fn report(operation: &str, outcome: MintResult<OperationOutcome>) -> bool {
    match outcome {
        Ok(outcome) if outcome.is_confirmed() => true,
        Ok(outcome) => {
            let kind = MintError::from_outcome(outcome.tx_hash(), outcome.result)
                .err()
                .map(|e| e.kind());
            tracing::warn!(
                operation = operation,
                tx_hash = %outcome.handle.hash,
                kind = ?kind,
                "Operation did not confirm"
            );
            false
        }
        Err(e) => {
            tracing::error!(
                operation = operation,
                kind = ?e.kind(),
                error = %e,
                "Operation failed"
            );
            false
        }
    }
}
