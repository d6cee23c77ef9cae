//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Idempotent read (nonce, fee history, receipt, balance):
//!     → client.rs applies the per-call timeout and provider failover
//!     → On failure: retries.rs waits (jittered exponential backoff) and tries again
//!
//! Broadcast:
//!     → sent once, failures surface to the caller untouched
//! ```

pub mod retries;

pub use retries::{retry_idempotent, RetryPolicy};
