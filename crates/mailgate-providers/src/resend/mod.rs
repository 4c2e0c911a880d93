//! Resend provider
//!
//! Dispatches through Resend's batch endpoint (`POST /emails/batch`, up to
//! 100 emails per call) using the core batch pipeline for concurrency and
//! pacing. Transport and API failures become per-item failed results inside
//! the worker closure, so a bad chunk never aborts the rest of a batch.

mod wire;

use std::time::Instant;

use async_trait::async_trait;
use mailgate_core::{
    BatchOptions, Email, EmailProvider, ProviderCapabilities, Result, SendResult, process_batches,
};
use secrecy::{ExposeSecret, SecretString};

use crate::transport::http_client;

/// Production API endpoint.
pub const RESEND_BASE_URL: &str = "https://api.resend.com";

const BATCH_SIZE: usize = 100;
// Resend allows 10 requests/second.
const RATE_LIMIT: u32 = 10;
const CONCURRENCY: usize = 5;

/// Resend implementation of the provider contract.
pub struct ResendProvider {
    client: reqwest::Client,
    base_url: String,
    options: BatchOptions,
}

impl ResendProvider {
    /// Create a provider pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`mailgate_core::Error::Transport`] if the HTTP client
    /// cannot be constructed.
    pub fn new() -> Result<Self> {
        Self::with_base_url(RESEND_BASE_URL)
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
            options: BatchOptions {
                concurrency: CONCURRENCY,
                rate_limit: RATE_LIMIT,
            },
        })
    }

    /// Override the default concurrency/pacing, e.g. from gateway
    /// configuration.
    pub fn batch_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Send one chunk, mapping every failure mode to per-item results.
    async fn send_chunk(
        &self,
        batch: Vec<Email>,
        credential: &SecretString,
    ) -> Result<Vec<SendResult>> {
        let url = format!("{}/emails/batch", self.base_url);
        let body = wire::to_resend_batch(&batch);

        let response = match self
            .client
            .post(&url)
            .bearer_auth(credential.expose_secret())
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "resend request failed");
                return Ok(fail_all(&batch, e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<wire::ErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::error!(status = status.as_u16(), %message, "resend batch rejected");
            return Ok(fail_all(&batch, message));
        }

        let parsed = match response.json::<wire::BatchResponse>().await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(error = %e, "resend response unreadable");
                return Ok(fail_all(&batch, e.to_string()));
            }
        };

        if parsed.data.len() != batch.len() {
            tracing::warn!(
                expected = batch.len(),
                got = parsed.data.len(),
                "resend returned unexpected result count"
            );
            let mismatch = mailgate_core::Error::ResultCountMismatch {
                expected: batch.len(),
                got: parsed.data.len(),
            };
            return Ok(fail_all(&batch, mismatch.to_string()));
        }

        tracing::debug!(count = parsed.data.len(), "resend chunk accepted");
        Ok(parsed
            .data
            .into_iter()
            .map(|message| SendResult::queued(message.id))
            .collect())
    }
}

fn fail_all(batch: &[Email], error: String) -> Vec<SendResult> {
    batch
        .iter()
        .map(|_| SendResult::failed(error.as_str()))
        .collect()
}

#[async_trait]
impl EmailProvider for ResendProvider {
    fn name(&self) -> &'static str {
        "resend"
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
            tracking: true,
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
        tracing::info!(total_emails = emails.len(), "starting resend batch send");

        let results = process_batches(emails, BATCH_SIZE, &self.options, |batch| {
            self.send_chunk(batch, credential)
        })
        .await?;

        let successful = results.iter().filter(|r| !r.is_failed()).count();
        tracing::info!(
            total_emails = emails.len(),
            successful,
            failed = results.len() - successful,
            duration_ms = started.elapsed().as_millis() as u64,
            "resend batch send complete"
        );

        Ok(results)
    }
}
