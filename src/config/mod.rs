//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MinterConfig (validated, immutable)
//!
//! environment
//!     → account key, administrator key (never in the file)
//! ```
//!
//! Every field has a default so a minimal file works.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuthorizationConfig, ConfirmationConfig, ContractConfig, ContractsConfig, FeeConfig,
    FeeStrategy, MinterConfig, NetworkConfig, ObservabilityConfig, RetryConfig,
};
