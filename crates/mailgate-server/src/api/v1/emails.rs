//! Single and batch send handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use mailgate_core::{Email, EmailProvider, Error};
use serde_json::{Value, json};
use uuid::Uuid;

use super::types::{
    BatchJobResponse, BatchSendRequest, SendEmailRequest, SendEmailResponse, to_internal_email,
    validate_batch_request, validate_email_request,
};
use crate::api::auth::BearerApiKey;
use crate::api::error::ApiError;
use crate::dispatch::spawn_batch_dispatch;
use crate::state::AppState;

fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|e| ApiError::validation("invalid_request", e.to_string()))
}

fn validation_failed(errors: Vec<super::types::FieldError>) -> ApiError {
    ApiError::validation("invalid_request", "Request validation failed")
        .with_details(json!({ "fields": errors }))
}

fn lookup_provider(
    state: &AppState,
    requested: Option<&str>,
) -> Result<Arc<dyn EmailProvider>, ApiError> {
    let name = requested.unwrap_or("");
    state.registry.get(name).map_err(|_| {
        ApiError::validation(
            "invalid_provider",
            format!(
                "Unknown provider \"{name}\". Available: {}",
                state.registry.names().join(", ")
            ),
        )
    })
}

/// `POST /api/v1/emails` — synchronous single send.
pub async fn send_email(
    State(state): State<AppState>,
    auth: BearerApiKey,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let request: SendEmailRequest = parse_body(body)?;

    let errors = validate_email_request(&request);
    if !errors.is_empty() {
        return Err(validation_failed(errors));
    }

    let provider = lookup_provider(&state, request.provider.as_deref())?;
    let email = to_internal_email(&request);

    tracing::info!(
        provider = provider.name(),
        recipients = email.to.len(),
        "sending single email"
    );

    let results = provider
        .send_batch(std::slice::from_ref(&email), &auth.0)
        .await
        .map_err(|e| ApiError::provider(e.to_string()))?;

    match results.first() {
        Some(result) if !result.is_failed() => {
            let response = SendEmailResponse {
                id: generate_id("msg"),
                status: result.status,
                provider: provider.name().to_owned(),
                provider_id: (!result.id.is_empty()).then(|| result.id.clone()),
                created_at: Utc::now(),
            };
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        other => {
            let message = other
                .and_then(|result| result.error.clone())
                .unwrap_or_else(|| "Failed to send email".to_owned());
            tracing::error!(error = %message, "email send failed");
            Err(ApiError::provider(message))
        }
    }
}

/// `POST /api/v1/emails/batch` — asynchronous batch send, answered with a
/// pollable job.
pub async fn send_email_batch(
    State(state): State<AppState>,
    auth: BearerApiKey,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let request: BatchSendRequest = parse_body(body)?;

    let errors = validate_batch_request(&request);
    if !errors.is_empty() {
        return Err(validation_failed(errors));
    }

    let provider = lookup_provider(&state, request.provider.as_deref())?;
    let emails_in = request.emails.unwrap_or_default();
    let emails: Vec<Email> = emails_in.iter().map(to_internal_email).collect();

    // Job items track the first recipient of each email.
    let recipients: Vec<String> = emails_in.iter().map(first_recipient).collect();

    let job_id = generate_id("job");
    let job = state
        .jobs
        .create(&job_id, recipients)
        .map_err(|e| match e {
            Error::StoreFull => ApiError::capacity(),
            _ => ApiError::server(),
        })?;

    tracing::info!(
        job_id = %job.id,
        provider = provider.name(),
        email_count = job.total,
        "starting batch email job"
    );

    spawn_batch_dispatch(
        Arc::clone(&state.jobs),
        provider,
        emails,
        auth.0,
        job_id.clone(),
    );

    let response = BatchJobResponse {
        job_id: job.id,
        status: job.status,
        total: job.total,
        submitted_at: job.created_at,
        status_url: format!("/api/v1/jobs/{job_id}"),
    };
    Ok((StatusCode::ACCEPTED, Json(response)).into_response())
}

fn first_recipient(request: &SendEmailRequest) -> String {
    request
        .to
        .as_ref()
        .and_then(|to| to.first())
        .map(super::types::AddressInput::bare_email)
        .unwrap_or_default()
}
