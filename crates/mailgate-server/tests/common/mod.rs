//! Shared helpers for router-level tests

// Each test binary compiles this module separately and uses a subset.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use mailgate_core::ProviderRegistry;
use mailgate_providers::{ResendProvider, UniOneProvider};
use mailgate_server::api;
use mailgate_server::config::ServerConfig;
use mailgate_server::jobs::JobStore;
use mailgate_server::ratelimit::RateLimitStore;
use mailgate_server::state::AppState;
use serde_json::Value;

/// Port with nothing listening, for tests that must not reach a provider.
pub const DEAD_URL: &str = "http://127.0.0.1:9";

/// Router with both providers pointed at the given base URLs.
pub fn router_with(config: ServerConfig, resend_url: &str, unione_url: &str) -> Router {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(
        ResendProvider::with_base_url(resend_url).expect("resend provider"),
    ));
    registry.register(Arc::new(
        UniOneProvider::with_base_url(unione_url).expect("unione provider"),
    ));

    let jobs = JobStore::new(config.job_store);
    let state = AppState::new(registry, jobs, config);
    api::router(state, Arc::new(RateLimitStore::new()))
}

/// Router whose providers are unreachable.
pub fn router(config: ServerConfig) -> Router {
    router_with(config, DEAD_URL, DEAD_URL)
}

/// JSON POST with Universal-API bearer auth.
pub fn v1_post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, "Bearer test-key")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// GET with Universal-API bearer auth.
pub fn v1_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, "Bearer test-key")
        .body(Body::empty())
        .expect("request")
}

/// Form-encoded POST with Mailgun-style basic auth.
pub fn v3_post(uri: &str, form: &str) -> Request<Body> {
    let encoded = BASE64.encode("api:test-key");
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Basic {encoded}"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .expect("request")
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
