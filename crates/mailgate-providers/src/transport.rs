//! Shared reqwest client construction

use std::time::Duration;

use mailgate_core::{Error, Result};

/// Per-request transport timeout applied to every provider call, so a hung
/// provider resolves to failed items instead of stalling a batch.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the pooled HTTP client used by a provider instance.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("mailgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Transport(e.to_string()))
}
