//! Administrator co-signed mint authorizations.
//!
//! # Data Flow
//! ```text
//! requester Account + contract + TokenParams
//!     → signer.rs (contract nonce, live chain id, domain name)
//!     → NonceLedger reservation
//!     → types.rs (MintRequest / Mint EIP-712 digest)
//!     → administrator signature → MintAuthorization
//! ```

pub mod signer;
pub mod types;

pub use signer::{AuthorizationSigner, DomainSpec};
pub use types::{
    AuthorizationError, AuthorizationMessage, AuthorizationResult, AuthorizationRole, Mint,
    MintAuthorization, MintRequest, MINT_FIELDS, MINT_REQUEST_FIELDS,
};
