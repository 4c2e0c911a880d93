//! UniOne provider
//!
//! UniOne's transactional endpoint takes one message per call (up to 500
//! recipients inside it), so a batch is sent sequentially, one email at a
//! time, to keep per-email results.

mod wire;

use std::time::Instant;

use async_trait::async_trait;
use mailgate_core::{Email, EmailProvider, ProviderCapabilities, Result, SendResult};
use secrecy::{ExposeSecret, SecretString};

use crate::transport::http_client;

const SEND_PATH: &str = "/en/transactional/api/v1/email/send.json";

// UniOne max recipients per request.
const BATCH_SIZE: usize = 500;
const RATE_LIMIT: u32 = 10;

/// UniOne hosting region, which selects the API base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniOneRegion {
    /// `us1.unione.io`
    #[default]
    Us,
    /// `eu1.unione.io`
    Eu,
}

impl UniOneRegion {
    /// Parse a region from configuration; anything but `"eu"` maps to US.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("eu") => Self::Eu,
            _ => Self::Us,
        }
    }

    fn base_url(self) -> &'static str {
        match self {
            Self::Us => "https://us1.unione.io",
            Self::Eu => "https://eu1.unione.io",
        }
    }
}

/// UniOne implementation of the provider contract.
pub struct UniOneProvider {
    client: reqwest::Client,
    base_url: String,
}

impl UniOneProvider {
    /// Create a provider for the given region.
    ///
    /// # Errors
    ///
    /// Returns [`mailgate_core::Error::Transport`] if the HTTP client
    /// cannot be constructed.
    pub fn new(region: UniOneRegion) -> Result<Self> {
        Self::with_base_url(region.base_url())
    }

    /// Create a provider against a custom base URL (used by tests to point
    /// at a mock server).
    ///
    /// # Errors
    ///
    /// Returns [`mailgate_core::Error::Transport`] if the HTTP client
    /// cannot be constructed.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into(),
        })
    }

    async fn send_single(&self, email: &Email, credential: &SecretString) -> SendResult {
        let url = format!("{}{}", self.base_url, SEND_PATH);
        let request = wire::to_unione_request(email);

        let response = match self
            .client
            .post(&url)
            .header("X-API-KEY", credential.expose_secret())
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "unione request failed");
                return SendResult::failed(e.to_string());
            }
        };

        let status = response.status();
        let parsed = match response.json::<wire::UniOneResponse>().await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(error = %e, "unione response unreadable");
                return SendResult::failed(e.to_string());
            }
        };

        if !status.is_success() {
            let message = parsed
                .message
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::error!(status = status.as_u16(), %message, code = ?parsed.code, "unione API error");
            return SendResult::failed(message);
        }

        if parsed.status.as_deref() == Some("error") {
            let message = parsed.message.unwrap_or_else(|| "Unknown error".into());
            tracing::error!(%message, code = ?parsed.code, "unione send error");
            return SendResult::failed(message);
        }

        let job_id = parsed.job_id.unwrap_or_default();

        if let Some(failed) = parsed
            .failed_emails
            .as_ref()
            .filter(|failed| !failed.is_empty())
        {
            tracing::warn!(failed = ?failed.keys().collect::<Vec<_>>(), "unione partial failure");

            // Only an email whose every recipient was rejected counts as
            // failed; otherwise the provider accepted it.
            if failed.len() == email.to.len() {
                let detail = serde_json::to_string(failed).unwrap_or_default();
                return SendResult::failed(format!("All recipients failed: {detail}"));
            }
        }

        tracing::debug!(job_id = %job_id, accepted = ?parsed.emails, "unione email sent");
        SendResult::queued(job_id)
    }
}

#[async_trait]
impl EmailProvider for UniOneProvider {
    fn name(&self) -> &'static str {
        "unione"
    }

    fn batch_size(&self) -> usize {
        BATCH_SIZE
    }

    fn rate_limit(&self) -> u32 {
        RATE_LIMIT
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            batch: true,
            tracking: false,
            events: false,
            suppressions: false,
        }
    }

    async fn send_batch(
        &self,
        emails: &[Email],
        credential: &SecretString,
    ) -> Result<Vec<SendResult>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        tracing::info!(total_emails = emails.len(), "starting unione batch send");

        let mut results = Vec::with_capacity(emails.len());
        for email in emails {
            results.push(self.send_single(email, credential).await);
        }

        let successful = results.iter().filter(|r| !r.is_failed()).count();
        tracing::info!(
            total_emails = emails.len(),
            successful,
            failed = results.len() - successful,
            duration_ms = started.elapsed().as_millis() as u64,
            "unione batch send complete"
        );

        Ok(results)
    }
}
