//! Router-level tests for both API surfaces: auth, validation, job
//! polling, and admission control.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use mailgate_server::config::ServerConfig;
use serde_json::json;
use tower::ServiceExt;

use common::{body_json, router, v1_get, v1_post, v3_post};

#[tokio::test]
async fn health_reports_registered_providers() {
    let app = router(ServerConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "resend");
    assert_eq!(body["providers"], json!(["resend", "unione"]));
}

#[tokio::test]
async fn discovery_requires_no_auth() {
    let app = router(ServerConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "mailgate");
    assert_eq!(body["api_version"], "v1");
    assert_eq!(body["provider"]["name"], "resend");
    assert_eq!(body["provider"]["batch_size"], 100);
    assert_eq!(body["provider"]["rate_limit"], 10);
    assert_eq!(body["capabilities"]["batch"], true);
}

#[tokio::test]
async fn v1_send_without_credentials_is_401() {
    let app = router(ServerConfig::default());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/emails")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "authentication_error");
    assert_eq!(body["error"]["code"], "missing_credentials");
}

#[tokio::test]
async fn v1_send_validation_reports_field_errors() {
    let app = router(ServerConfig::default());

    let response = app
        .oneshot(v1_post(
            "/api/v1/emails",
            &json!({ "from": "not-an-address", "subject": "hi" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "validation_error");
    let fields: Vec<&str> = body["error"]["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"from"));
    assert!(fields.contains(&"to"));
    assert!(fields.contains(&"content"));
}

#[tokio::test]
async fn v1_send_unknown_provider_is_rejected() {
    let app = router(ServerConfig::default());

    let response = app
        .oneshot(v1_post(
            "/api/v1/emails",
            &json!({
                "from": "s@example.com",
                "to": ["t@example.com"],
                "subject": "hi",
                "content": { "text": "t" },
                "provider": "sendgrid"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "invalid_provider");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("resend, unione")
    );
}

#[tokio::test]
async fn unknown_job_polls_as_404() {
    let app = router(ServerConfig::default());

    let response = app
        .oneshot(v1_get("/api/v1/jobs/job_does_not_exist"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "not_found_error");
    assert_eq!(body["error"]["code"], "job_not_found");
}

#[tokio::test]
async fn v3_send_without_credentials_is_401() {
    let app = router(ServerConfig::default());

    let request = Request::builder()
        .method("POST")
        .uri("/v3/example.com/messages")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("from=s%40example.com"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn v3_send_missing_fields_is_400() {
    let app = router(ServerConfig::default());

    let response = app
        .oneshot(v3_post("/v3/example.com/messages", "from=s%40example.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Missing required fields: from, to, subject");
}

#[tokio::test]
async fn v3_rejects_unsupported_content_type() {
    let app = router(ServerConfig::default());

    let encoded = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        "api:test-key",
    );
    let request = Request::builder()
        .method("POST")
        .uri("/v3/example.com/messages")
        .header(header::AUTHORIZATION, format!("Basic {encoded}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Unsupported Content-Type");
}

fn low_send_limit_config(limit: u32) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.rate_limit.send_per_minute = limit;
    config
}

#[tokio::test]
async fn send_tier_rejects_over_limit_with_universal_body() {
    let app = router(low_send_limit_config(2));
    // Invalid body: the handler answers 400 without a provider call, but
    // admission is still charged.
    let body = json!({});

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(v1_post("/api/v1/emails", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key("x-ratelimit-limit"));
        assert!(response.headers().contains_key("x-ratelimit-remaining"));
        assert!(response.headers().contains_key("x-ratelimit-reset"));
    }

    let response = app
        .clone()
        .oneshot(v1_post("/api/v1/emails", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "rate_limit_error");
    assert_eq!(body["error"]["code"], "rate_limit_exceeded");
    assert_eq!(body["error"]["details"]["limit"], 2);
}

#[tokio::test]
async fn v3_rejection_uses_mailgun_body() {
    let app = router(low_send_limit_config(1));

    let first = app
        .clone()
        .oneshot(v3_post("/v3/example.com/messages", "from=s%40example.com"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let second = app
        .clone()
        .oneshot(v3_post("/v3/example.com/messages", "from=s%40example.com"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(second).await;
    assert_eq!(
        body["message"],
        "Rate limit exceeded. Please retry after the specified time."
    );
}

#[tokio::test]
async fn rate_limit_buckets_by_forwarded_ip() {
    let app = router(low_send_limit_config(1));

    let send = |ip: &'static str| {
        let app = app.clone();
        async move {
            let mut request = v1_post("/api/v1/emails", &json!({}));
            request
                .headers_mut()
                .insert("x-forwarded-for", ip.parse().unwrap());
            app.oneshot(request).await.unwrap()
        }
    };

    assert_eq!(send("203.0.113.1").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        send("203.0.113.1").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    // A different client is unaffected.
    assert_eq!(send("203.0.113.2").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scoped_routes_are_not_double_charged_by_global_tier() {
    let mut config = ServerConfig::default();
    // Global tier tighter than the send tier: if sends were double
    // charged, the second request would already be rejected.
    config.rate_limit.global_per_minute = 1;
    config.rate_limit.send_per_minute = 10;
    let app = router(config);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(v1_post("/api/v1/emails", &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // Unscoped paths are charged by the global tier.
    let first = app
        .clone()
        .oneshot(v1_get("/api/v1/jobs/some_job"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::NOT_FOUND);

    let second = app
        .clone()
        .oneshot(v1_get("/api/v1/jobs/some_job"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn disabling_rate_limit_removes_headers() {
    let mut config = ServerConfig::default();
    config.rate_limit.enabled = false;
    let app = router(config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-ratelimit-limit"));
}
