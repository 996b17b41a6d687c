//! Optional chunk retry with backoff.
//!
//! Classifies transport failures (timeouts, throttling, connection errors)
//! and computes exponential backoff. Only chunk sends go through this; the
//! finalize call is never retried.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
