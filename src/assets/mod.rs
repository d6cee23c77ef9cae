//! Asset contracts and the mint/burn/balance surface.
//!
//! # Data Flow
//! ```text
//! mint(account, contract, params)
//!     → AccountSequencer lock
//!     → AuthorizationSigner::authorize
//!     → contracts.rs (mintWithPermit / mintWithSignature call data)
//!     → TxBuilder::build → TxSubmitter::submit
//!     → lock released
//!     → ConfirmationWatcher::wait → OperationOutcome
//! ```

pub mod contracts;
pub mod minter;
pub mod types;

pub use minter::AssetMinter;
pub use types::{AssetKind, ErrorKind, MintError, MintResult, OperationOutcome, TokenParams};
