//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the minter.
//! All types derive Serde traits for deserialization from config files.
//! Private keys are deliberately absent; they come from the environment.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MinterConfig {
    /// RPC endpoint settings.
    pub network: NetworkConfig,

    /// The fungible-token and multi-token contracts.
    pub contracts: ContractsConfig,

    /// Administrator co-signature settings.
    pub authorization: AuthorizationConfig,

    /// Fee selection.
    pub fees: FeeConfig,

    /// Confirmation wait.
    pub confirmation: ConfirmationConfig,

    /// Retry configuration for idempotent reads.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs, tried in order for reads.
    pub failover_urls: Vec<String>,

    /// Chain the endpoint is expected to serve. Checked at startup only;
    /// signing always uses the live chain id.
    pub expected_chain_id: Option<u64>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Block explorer prefix for transaction links in logs.
    pub explorer_tx_url: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://base-sepolia.drpc.org".to_string(),
            failover_urls: Vec::new(),
            expected_chain_id: Some(84532),
            rpc_timeout_secs: 10,
            explorer_tx_url: Some("https://sepolia.basescan.org/tx/".to_string()),
        }
    }
}

/// Both asset contracts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Fungible token with `mintWithSignature`.
    pub token: ContractConfig,

    /// Multi-token (ERC-1155) contract with `mintWithPermit`.
    pub nft: ContractConfig,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            token: ContractConfig {
                address: "0x9dFc743e45c71E24078F1a0dA670f48b25bED053".to_string(),
                domain_name: None,
                domain_version: "1".to_string(),
            },
            nft: ContractConfig {
                address: "0x0846E84883d68144EAEA181E52c217551A5C5ae3".to_string(),
                domain_name: Some("AdminMintableERC1155".to_string()),
                domain_version: "1".to_string(),
            },
        }
    }
}

/// A single asset contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Contract address (hex).
    pub address: String,

    /// EIP-712 domain name. `None` reads `name()` from the contract.
    pub domain_name: Option<String>,

    /// EIP-712 domain version.
    pub domain_version: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            domain_name: None,
            domain_version: "1".to_string(),
        }
    }
}

/// Administrator co-signature settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Value placed in the fungible `deadline` field. 0 means no expiry.
    pub deadline: u64,

    /// Environment variable holding the administrator's private key.
    pub admin_key_env: String,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            deadline: 0,
            admin_key_env: "MINTER_ADMIN_PRIVATE_KEY".to_string(),
        }
    }
}

/// Where the priority fee comes from.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeeStrategy {
    /// Use the node's fee suggestion as-is.
    #[default]
    Network,
    /// Replace the priority fee with the fee-history average.
    FeeHistory,
}

/// Fee selection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    pub strategy: FeeStrategy,

    /// Blocks of fee history to sample.
    pub history_blocks: u64,

    /// Reward percentile requested from `eth_feeHistory`.
    pub reward_percentile: f64,

    /// Maximum fee per gas in gwei (protection against spikes).
    pub max_fee_gwei: u64,

    /// Multiplier applied to estimated gas limits (1.0 = as estimated).
    pub gas_limit_multiplier: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            strategy: FeeStrategy::Network,
            history_blocks: 25,
            reward_percentile: 20.0,
            max_fee_gwei: 500,
            gas_limit_multiplier: 1.2,
        }
    }
}

/// Confirmation wait configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Blocks (including the inclusion block) before a success is final.
    pub required_confirmations: u64,

    /// Give up waiting after this many milliseconds.
    pub timeout_ms: u64,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            required_confirmations: 1,
            timeout_ms: 60_000,
            poll_interval_ms: 2_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts per read.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
