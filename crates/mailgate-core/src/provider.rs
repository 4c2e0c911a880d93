//! Outbound provider contract
//!
//! The gateway treats a provider purely as a capability: a declared batch
//! size, a request-rate ceiling, and an order-preserving batch send. The
//! credential travels with every call; providers hold no keys.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::email::{Email, SendResult};
use crate::error::Result;

/// Feature flags a provider advertises through the discovery endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Supports multi-email dispatch in one API call.
    pub batch: bool,
    /// Supports open/click tracking options.
    pub tracking: bool,
    /// Exposes a delivery-event feed.
    pub events: bool,
    /// Exposes a suppression list.
    pub suppressions: bool,
}

/// An outbound email-sending capability.
///
/// Implementations must return exactly one [`SendResult`] per input email,
/// in input order, and must convert transport or API failures into per-item
/// failed results rather than letting them escape — the batch pipeline
/// propagates worker errors and aborts remaining work otherwise.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Registry name, e.g. `"resend"`.
    fn name(&self) -> &'static str;

    /// Maximum emails per dispatch call.
    fn batch_size(&self) -> usize;

    /// Request-rate ceiling, in requests per second.
    fn rate_limit(&self) -> u32;

    /// Advertised feature flags.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Send `emails` using the caller's `credential`.
    ///
    /// # Errors
    ///
    /// Implementations reserve errors for conditions that invalidate the
    /// whole submission (for example a malformed credential rejected before
    /// any dispatch); per-email failures come back as failed results.
    async fn send_batch(&self, emails: &[Email], credential: &SecretString)
    -> Result<Vec<SendResult>>;
}
