//! Administrator co-signed minting and burning on EVM chains.

pub mod assets;
pub mod authorization;
pub mod blockchain;
pub mod config;
pub mod observability;
pub mod resilience;

pub use assets::{AssetMinter, ErrorKind, MintError, MintResult, OperationOutcome, TokenParams};
pub use authorization::{AuthorizationSigner, MintAuthorization};
pub use blockchain::{Account, BlockchainClient, ChainRpc, ConfirmationResult};
pub use config::schema::MinterConfig;
