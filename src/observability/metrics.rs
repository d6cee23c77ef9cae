//! Metrics collection.
//!
//! # Metrics
//! - `minter_rpc_calls_total` (counter): RPC calls by method and outcome
//! - `minter_fee_quotes_total` (counter): fee-history quotes by whether any sample was usable
//! - `minter_authorizations_total` (counter): co-signatures issued by schema
//! - `minter_submissions_total` (counter): broadcasts by outcome
//! - `minter_confirmations_total` (counter): watcher verdicts
//!
//! Recorded through the `metrics` facade; without an installed recorder they are no-ops.

use metrics::counter;

pub fn record_rpc_call(method: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("minter_rpc_calls_total", "method" => method, "outcome" => outcome).increment(1);
}

pub fn record_fee_quote(basis: usize) {
    let usable = if basis > 0 { "samples" } else { "empty" };
    counter!("minter_fee_quotes_total", "basis" => usable).increment(1);
}

pub fn record_authorization(schema: &'static str) {
    counter!("minter_authorizations_total", "schema" => schema).increment(1);
}

pub fn record_submission(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    counter!("minter_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_confirmation(verdict: &'static str) {
    counter!("minter_confirmations_total", "verdict" => verdict).increment(1);
}
