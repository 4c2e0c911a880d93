//! Per-request credential extraction
//!
//! The gateway never stores provider credentials; each surface extracts
//! them from the request and threads them through to the provider call.
//!
//! - `/v3` uses Mailgun-style Basic auth: username `api`, password = the
//!   provider API key.
//! - `/api/v1` accepts a Bearer token or an `X-API-Key` header.

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::SecretString;
use serde_json::json;

use super::error::ApiError;

/// Provider credential taken from Mailgun-style Basic auth.
pub struct BasicApiKey(pub SecretString);

impl<S: Send + Sync> FromRequestParts<S> for BasicApiKey {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header_value) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            tracing::warn!("missing authorization header");
            return Err(mailgun_unauthorized("Authentication required"));
        };

        let Some(encoded) = header_value.strip_prefix("Basic ") else {
            tracing::warn!("invalid authorization header format");
            return Err(mailgun_unauthorized("Invalid authentication format"));
        };

        let Some(credentials) = BASE64
            .decode(encoded.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
        else {
            return Err(mailgun_unauthorized("Invalid authentication"));
        };

        // Mailgun uses "api" as the username and the API key as the password.
        let Some(("api", password)) = credentials.split_once(':') else {
            tracing::warn!("invalid credentials format");
            return Err(mailgun_unauthorized("Invalid credentials"));
        };
        if password.is_empty() {
            return Err(mailgun_unauthorized("Invalid credentials"));
        }

        Ok(Self(SecretString::new(
            password.to_owned().into_boxed_str(),
        )))
    }
}

fn mailgun_unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
}

/// Provider credential taken from a Bearer token or `X-API-Key` header.
pub struct BearerApiKey(pub SecretString);

impl<S: Send + Sync> FromRequestParts<S> for BearerApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let api_key = match bearer {
            Some(token) => token,
            None => parts
                .headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    ApiError::authentication(
                        "missing_credentials",
                        "API key required. Use Bearer token or X-API-Key header.",
                    )
                })?,
        };

        if api_key.trim().is_empty() {
            return Err(ApiError::authentication(
                "invalid_api_key",
                "API key cannot be empty.",
            ));
        }

        Ok(Self(SecretString::new(
            api_key.to_owned().into_boxed_str(),
        )))
    }
}
