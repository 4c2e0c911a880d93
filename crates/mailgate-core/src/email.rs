//! Provider-agnostic email representation
//!
//! Both HTTP surfaces normalize into [`Email`] before anything touches a
//! provider; the per-provider wire translators start from here.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Per-recipient template variables, as loose JSON objects.
pub type Substitutions = HashMap<String, serde_json::Map<String, serde_json::Value>>;

/// A single outbound email, normalized from either API surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    /// Sender, either `addr@example.com` or `Name <addr@example.com>`.
    pub from: String,

    /// Recipient addresses.
    pub to: Vec<String>,

    /// Subject line.
    pub subject: String,

    /// HTML body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Plain-text body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Free-form tags forwarded to the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Per-recipient substitution variables, keyed by recipient address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitutions: Option<Substitutions>,
}

/// Outcome of sending one email through a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    /// Provider-assigned message identifier; empty on failure.
    pub id: String,

    /// Delivery handoff status.
    pub status: SendStatus,

    /// Human-readable error when `status` is [`SendStatus::Failed`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResult {
    /// A successfully queued email with the provider's message id.
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SendStatus::Queued,
            error: None,
        }
    }

    /// A failed email with a human-readable reason.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            status: SendStatus::Failed,
            error: Some(error.into()),
        }
    }

    /// Whether the provider rejected this email.
    pub fn is_failed(&self) -> bool {
        self.status == SendStatus::Failed
    }
}

/// Handoff status reported by a provider for one email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    /// Accepted by the provider, delivery pending.
    Queued,
    /// Confirmed sent by the provider.
    Sent,
    /// Rejected by the provider or the transport.
    Failed,
}

static NAME_ADDR_RE: LazyLock<Regex> = LazyLock::new(|| {
    // "Display Name <local@domain>" — the regex is infallible at compile time.
    Regex::new(r"^(.+?)\s*<([^>]+)>$").expect("valid address regex")
});

static BARE_ADDR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid address regex"));

static BRACKETED_ADDR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^\s@]+@[^\s@]+\.[^\s@]+>$").expect("valid address regex"));

/// An address split into its bare email and optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    /// Bare `local@domain` part.
    pub email: String,
    /// Display name, when the input used `Name <addr>` form.
    pub name: Option<String>,
}

/// Parse `"Name <addr@example.com>"` or a bare `"addr@example.com"`.
pub fn parse_address(raw: &str) -> ParsedAddress {
    let trimmed = raw.trim();
    if let Some(caps) = NAME_ADDR_RE.captures(trimmed) {
        return ParsedAddress {
            email: caps[2].trim().to_owned(),
            name: Some(caps[1].trim().to_owned()),
        };
    }
    ParsedAddress {
        email: trimmed.to_owned(),
        name: None,
    }
}

/// Extract the bare address from either input form.
pub fn extract_address(raw: &str) -> String {
    parse_address(raw).email
}

/// Loose shape check used by request validation; accepts both the bare and
/// the `Name <addr>` forms.
pub fn looks_like_address(raw: &str) -> bool {
    BARE_ADDR_RE.is_match(raw) || BRACKETED_ADDR_RE.is_match(raw)
}
