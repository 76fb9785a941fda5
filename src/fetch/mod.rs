//! Remote data retrieval.
//!
//! Downloads the Scryfall bulk data file and provides the HTTP plumbing
//! (client construction, retries) shared with the rules updater.

pub mod bulk;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_server;

pub use bulk::{download_default_cards, find_latest_default_cards};

use std::time::Duration;

/// Build an HTTP client with the given user agent and request timeout.
pub fn build_client(user_agent: &str, timeout_seconds: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
}
