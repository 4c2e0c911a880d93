//! HTTP surface assembly
//!
//! Routes, admission-control layering, and CORS. Rate limiting is wired
//! here so each surface keeps its own rejection body while sharing one
//! entry store: the send tier covers both send surfaces, the health tier
//! covers `/health`, and the global tier covers everything else (skipping
//! requests already charged by a scoped rule).

pub mod auth;
pub mod error;
pub mod v1;
pub mod v3;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::ratelimit::{RateLimitRule, RateLimitStore, RateLimiter, RejectionStyle};
use crate::state::AppState;

/// Build the complete application router.
pub fn router(state: AppState, limiter_store: Arc<RateLimitStore>) -> Router {
    let settings = state.config.rate_limit;

    let mut v3_routes = Router::new().route("/{domain}/messages", post(v3::send_message));

    let mut v1_send_routes = Router::new()
        .route("/emails", post(v1::emails::send_email))
        .route("/emails/batch", post(v1::emails::send_email_batch));

    let v1_other_routes = Router::new()
        .route("/", get(v1::discovery::api_info))
        .route("/jobs/{id}", get(v1::jobs::get_job));

    let mut health_routes = Router::new().route("/health", get(health));

    if settings.enabled {
        let send_rule = RateLimitRule::per_minute(settings.send_per_minute);

        v3_routes = v3_routes.route_layer(middleware::from_fn_with_state(
            RateLimiter::new(
                Arc::clone(&limiter_store),
                send_rule,
                RejectionStyle::Mailgun,
            ),
            RateLimiter::enforce,
        ));

        v1_send_routes = v1_send_routes.route_layer(middleware::from_fn_with_state(
            RateLimiter::new(
                Arc::clone(&limiter_store),
                send_rule,
                RejectionStyle::Universal,
            ),
            RateLimiter::enforce,
        ));

        health_routes = health_routes.route_layer(middleware::from_fn_with_state(
            RateLimiter::new(
                Arc::clone(&limiter_store),
                RateLimitRule::per_minute(settings.health_per_minute),
                RejectionStyle::Plain,
            ),
            RateLimiter::enforce,
        ));
    }

    let mut app = Router::new()
        .merge(health_routes)
        .nest("/v3", v3_routes)
        .nest("/api/v1", v1_other_routes.merge(v1_send_routes))
        .fallback(not_found)
        .with_state(state);

    if settings.enabled {
        // Outermost tier; scoped rules above already charged their routes.
        app = app.layer(middleware::from_fn_with_state(
            RateLimiter::new(
                Arc::clone(&limiter_store),
                RateLimitRule::per_minute(settings.global_per_minute),
                RejectionStyle::Plain,
            )
            .with_skip(covered_by_scoped_rule),
            RateLimiter::enforce,
        ));
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

fn covered_by_scoped_rule(request: &Request<Body>) -> bool {
    let path = request.uri().path();
    path == "/health"
        || (path.starts_with("/v3/") && path.ends_with("/messages"))
        || path.starts_with("/api/v1/emails")
}

/// `GET /health` — liveness plus registered providers, no auth.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "provider": state.config.default_provider,
        "providers": state.registry.names(),
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Not found" })),
    )
}
