//! Permit minter CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──▶ config ──▶ BlockchainClient (alloy, failover, retries)
//!   environment ──▶ requester Account, administrator Account
//!
//!   subcommand ──▶ AssetMinter
//!                    ├─ AuthorizationSigner  (EIP-712 co-signature)
//!                    ├─ TxBuilder            (nonce, chain id, fees)
//!                    ├─ TxSubmitter          (gas, sign, broadcast)
//!                    └─ ConfirmationWatcher  (receipt polling)
//! ```

use alloy::primitives::utils::parse_units;
use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use permit_minter::assets::types::FUNGIBLE_DECIMALS;
use permit_minter::assets::{AssetKind, AssetMinter, MintError, OperationOutcome, TokenParams};
use permit_minter::blockchain::account::ACCOUNT_KEY_ENV_VAR;
use permit_minter::blockchain::{Account, BlockchainClient};
use permit_minter::config::{load_config, MinterConfig};
use permit_minter::observability::logging::init_logging;
use permit_minter::resilience::RetryPolicy;

#[derive(Parser)]
#[command(name = "permit-minter")]
#[command(about = "Mint and burn administrator-authorized assets", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint multi-token assets with an administrator permit
    MintNft {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        amount: u64,
    },
    /// Burn multi-token assets
    BurnNft {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        amount: u64,
    },
    /// Mint fungible tokens (amount in whole tokens, 18 decimals)
    MintToken {
        #[arg(long)]
        amount: String,
    },
    /// Burn fungible tokens (amount in whole tokens, 18 decimals)
    BurnToken {
        #[arg(long)]
        amount: String,
    },
    /// Balance on the token contract, or the multi-token contract with --token-id
    Balance {
        #[arg(long)]
        token_id: Option<u64>,
    },
    /// Multi-token balances for a range of ids
    NftBalances {
        #[arg(long, default_value_t = 1)]
        from: u64,
        #[arg(long, default_value_t = 4)]
        to: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            let kind = e.downcast_ref::<MintError>().map(MintError::kind);
            tracing::error!(kind = ?kind, error = %e, "permit-minter failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MinterConfig::default(),
    };
    init_logging(&config.observability);

    tracing::info!(
        rpc_url = %config.network.rpc_url,
        failover_count = config.network.failover_urls.len(),
        token = %config.contracts.token.address,
        nft = %config.contracts.nft.address,
        "Configuration loaded"
    );

    let client = BlockchainClient::new(
        config.network.clone(),
        RetryPolicy::from_config(&config.retries),
    )
    .await?;
    let rpc = Arc::new(client);

    let account = Account::from_env(ACCOUNT_KEY_ENV_VAR)?;

    let confirmed = match cli.command {
        Commands::Balance { token_id } => {
            let minter = read_only_minter(rpc, &config, &account)?;
            let kind = if token_id.is_some() {
                AssetKind::MultiToken
            } else {
                AssetKind::Fungible
            };
            let balance = minter
                .balance_of(
                    account.address(),
                    minter.contract_for(kind),
                    token_id.map(U256::from),
                )
                .await?;
            print_value(cli.json, serde_json::json!({ "balance": balance.to_string() }));
            true
        }
        Commands::NftBalances { from, to } => {
            let minter = read_only_minter(rpc, &config, &account)?;
            let balances = minter
                .multi_token_balances(
                    account.address(),
                    minter.nft_contract(),
                    (from..=to).map(U256::from),
                )
                .await?;
            let rows: Vec<_> = balances
                .iter()
                .map(|(id, balance)| {
                    serde_json::json!({ "id": id.to_string(), "balance": balance.to_string() })
                })
                .collect();
            print_value(cli.json, serde_json::Value::Array(rows));
            true
        }
        Commands::MintNft { id, amount } => {
            let params = TokenParams::multi_token(id, amount);
            transact(rpc, &config, &account, Action::Mint, params, cli.json).await?
        }
        Commands::BurnNft { id, amount } => {
            let params = TokenParams::multi_token(id, amount);
            transact(rpc, &config, &account, Action::Burn, params, cli.json).await?
        }
        Commands::MintToken { amount } => {
            let params = TokenParams::fungible(parse_token_amount(&amount)?);
            transact(rpc, &config, &account, Action::Mint, params, cli.json).await?
        }
        Commands::BurnToken { amount } => {
            let params = TokenParams::fungible(parse_token_amount(&amount)?);
            transact(rpc, &config, &account, Action::Burn, params, cli.json).await?
        }
    };

    Ok(confirmed)
}

enum Action {
    Mint,
    Burn,
}

async fn transact(
    rpc: Arc<BlockchainClient>,
    config: &MinterConfig,
    account: &Account,
    action: Action,
    params: TokenParams,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let admin = Account::from_env(&config.authorization.admin_key_env)?;
    let minter = AssetMinter::new(rpc, admin, config)?;
    let contract = minter.contract_for(params.kind());

    let outcome = match action {
        Action::Mint => minter.mint(account, contract, params).await?,
        Action::Burn => minter.burn(account, contract, params).await?,
    };

    print_outcome(json, &outcome);
    Ok(outcome.is_confirmed())
}

/// Balance queries never sign; the requester fills the administrator slot.
fn read_only_minter(
    rpc: Arc<BlockchainClient>,
    config: &MinterConfig,
    account: &Account,
) -> Result<AssetMinter<BlockchainClient>, Box<dyn std::error::Error>> {
    Ok(AssetMinter::new(rpc, account.clone(), config)?)
}

fn parse_token_amount(amount: &str) -> Result<U256, Box<dyn std::error::Error>> {
    Ok(parse_units(amount, FUNGIBLE_DECIMALS)?.get_absolute())
}

fn print_outcome(json: bool, outcome: &OperationOutcome) {
    let value = serde_json::json!({
        "tx_hash": outcome.tx_hash().to_string(),
        "result": outcome.result.label(),
        "receipt": outcome.result.receipt(),
    });
    print_value(json, value);
}

fn print_value(json: bool, value: serde_json::Value) {
    if json {
        println!("{}", value);
    } else {
        match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", value),
        }
    }
}
