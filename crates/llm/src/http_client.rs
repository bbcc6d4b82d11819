//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with the
//! per-provider request timeout. The surrounding application imposes an
//! overall wall-clock budget per turn; the client timeout bounds a single
//! provider call inside it.

use std::time::Duration;

/// Build a `reqwest::Client` with the given request timeout.
pub fn build_http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to build reqwest client")
}
