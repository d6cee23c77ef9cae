//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters)
//! ```
//!
//! Log fields carry addresses, nonces and hashes. Keys and signatures over
//! keys are never logged.

pub mod logging;
pub mod metrics;
