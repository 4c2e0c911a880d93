//! Universal API request/response shapes and validation
//!
//! Requests deserialize with every field optional so validation can report
//! per-field errors instead of failing on the first missing key.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mailgate_core::email::{extract_address, looks_like_address};
use mailgate_core::{Email, JobStatus, ProviderCapabilities, SendStatus};
use serde::{Deserialize, Serialize};

/// Address in either bare-string or structured form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AddressInput {
    /// `"addr@example.com"` or `"Name <addr@example.com>"`.
    Bare(String),
    /// `{"email": "...", "name": "..."}`.
    Structured {
        email: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl AddressInput {
    /// Render as `Name <addr>` when a display name is present.
    pub fn normalize(&self) -> String {
        match self {
            Self::Bare(raw) => raw.clone(),
            Self::Structured {
                email,
                name: Some(name),
            } => format!("{name} <{email}>"),
            Self::Structured { email, name: None } => email.clone(),
        }
    }

    /// The bare address, stripped of any display name.
    pub fn bare_email(&self) -> String {
        match self {
            Self::Bare(raw) => extract_address(raw),
            Self::Structured { email, .. } => email.clone(),
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            Self::Bare(raw) => looks_like_address(raw),
            Self::Structured { email, .. } => looks_like_address(email),
        }
    }
}

/// Body content; at least one of the two must be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailContent {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// `POST /api/v1/emails` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub from: Option<AddressInput>,
    #[serde(default)]
    pub to: Option<Vec<AddressInput>>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub content: Option<EmailContent>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// `POST /api/v1/emails/batch` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSendRequest {
    #[serde(default)]
    pub emails: Option<Vec<SendEmailRequest>>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// One field-level validation failure.
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

const MAX_RECIPIENTS: usize = 50;
const MAX_SUBJECT_LEN: usize = 998;
const MAX_TAGS: usize = 5;

/// Maximum emails accepted in one batch submission.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Validate a single-send request, collecting every field failure.
pub fn validate_email_request(request: &SendEmailRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match &request.from {
        None => errors.push(FieldError::new("from", "Sender address is required")),
        Some(from) if !from.is_valid() => {
            errors.push(FieldError::new("from", "Invalid sender email address"));
        }
        Some(_) => {}
    }

    match &request.to {
        None => errors.push(FieldError::new("to", "At least one recipient is required")),
        Some(to) if to.is_empty() => {
            errors.push(FieldError::new("to", "Recipients must be a non-empty array"));
        }
        Some(to) if to.len() > MAX_RECIPIENTS => {
            errors.push(FieldError::new("to", "Maximum 50 recipients per email"));
        }
        Some(to) => {
            if to.iter().any(|addr| !addr.is_valid()) {
                errors.push(FieldError::new(
                    "to",
                    "One or more recipient addresses are invalid",
                ));
            }
        }
    }

    match &request.subject {
        None => errors.push(FieldError::new("subject", "Subject is required")),
        Some(subject) if subject.is_empty() => {
            errors.push(FieldError::new("subject", "Subject is required"));
        }
        Some(subject) if subject.chars().count() > MAX_SUBJECT_LEN => {
            errors.push(FieldError::new(
                "subject",
                "Subject cannot exceed 998 characters",
            ));
        }
        Some(_) => {}
    }

    match &request.content {
        None => errors.push(FieldError::new("content", "Content is required")),
        Some(content) if content.html.is_none() && content.text.is_none() => {
            errors.push(FieldError::new(
                "content",
                "Either html or text content is required",
            ));
        }
        Some(_) => {}
    }

    if let Some(tags) = &request.tags
        && tags.len() > MAX_TAGS
    {
        errors.push(FieldError::new("tags", "Maximum 5 tags per email"));
    }

    errors
}

/// Validate a batch request; per-email failures are prefixed with their
/// index, e.g. `emails[3].subject`.
pub fn validate_batch_request(request: &BatchSendRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match &request.emails {
        None => errors.push(FieldError::new("emails", "Emails array is required")),
        Some(emails) if emails.is_empty() => {
            errors.push(FieldError::new("emails", "At least one email is required"));
        }
        Some(emails) if emails.len() > MAX_BATCH_SIZE => {
            errors.push(FieldError::new("emails", "Maximum 1000 emails per batch"));
        }
        Some(emails) => {
            for (index, email) in emails.iter().enumerate() {
                for error in validate_email_request(email) {
                    errors.push(FieldError::new(
                        format!("emails[{index}].{}", error.field),
                        error.message,
                    ));
                }
            }
        }
    }

    errors
}

/// Build the internal email from a request that already passed validation;
/// missing fields fall back to empty values rather than panicking.
pub fn to_internal_email(request: &SendEmailRequest) -> Email {
    let content = request.content.clone().unwrap_or_default();
    Email {
        from: request
            .from
            .as_ref()
            .map(AddressInput::normalize)
            .unwrap_or_default(),
        to: request
            .to
            .as_ref()
            .map(|to| to.iter().map(AddressInput::bare_email).collect())
            .unwrap_or_default(),
        subject: request.subject.clone().unwrap_or_default(),
        html: content.html,
        text: content.text,
        tags: request.tags.clone(),
        substitutions: None,
    }
}

/// `POST /api/v1/emails` success body.
#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub id: String,
    pub status: SendStatus,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `POST /api/v1/emails/batch` acceptance body (202).
#[derive(Debug, Serialize)]
pub struct BatchJobResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub total: u32,
    pub submitted_at: DateTime<Utc>,
    pub status_url: String,
}

/// Aggregate counters inside a job-status response.
#[derive(Debug, Serialize)]
pub struct JobProgress {
    pub total: u32,
    pub sent: u32,
    pub failed: u32,
    pub pending: u32,
}

/// One failed item inside a job-status response.
#[derive(Debug, Serialize)]
pub struct JobErrorDetail {
    pub index: u32,
    pub recipient: String,
    pub code: String,
    pub message: String,
}

/// `GET /api/v1/jobs/{id}` body.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<JobErrorDetail>>,
}

/// `GET /api/v1` discovery body.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub api_version: &'static str,
    pub provider: ProviderInfo,
    pub capabilities: ProviderCapabilities,
}

/// Default provider summary inside the discovery body.
#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub batch_size: usize,
    pub rate_limit: u32,
}
