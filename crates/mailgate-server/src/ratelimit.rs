//! Sliding-window admission control
//!
//! A weighted two-window approximation of a true sliding window: O(1) per
//! request, no per-request timestamp log. The previous window's count decays
//! linearly as the current window progresses, which removes the
//! burst-at-boundary flaw of fixed windows. The approximation can slightly
//! over-admit right at a window boundary under bursty traffic; that is
//! accepted behavior and the tests pin it down rather than tightening the
//! algorithm.
//!
//! The admission arithmetic is shared by every surface; only the rejection
//! body differs. Limiter failures are never fatal to a request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::task::JoinHandle;

/// Entries whose window started longer ago than this are swept.
const STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Per-key counters for the live and previous windows.
#[derive(Debug, Clone, Copy)]
struct SlidingWindowEntry {
    count: u32,
    window_start: u64,
    previous_count: u32,
    #[allow(dead_code)]
    previous_window_start: u64,
}

/// One admission rule: a request ceiling per window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    /// Maximum effective requests per window.
    pub limit: u32,
    /// Window length.
    pub window: Duration,
}

impl RateLimitRule {
    /// Rule with the default one-minute window.
    pub fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of one admission check.
///
/// All fields derive from the same arithmetic, so identical inputs always
/// produce identical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Configured ceiling.
    pub limit: u32,
    /// Whole requests left in the current window.
    pub remaining: u32,
    /// Unix seconds when the current window closes.
    pub reset: u64,
    /// Seconds until a retry can succeed.
    pub retry_after: u64,
}

/// Key-indexed table of sliding-window entries.
///
/// Constructed once at startup and shared across every rule; a background
/// sweep bounds its memory.
#[derive(Default)]
pub struct RateLimitStore {
    entries: Mutex<HashMap<String, SlidingWindowEntry>>,
}

impl RateLimitStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count this request against `key` and decide admission.
    ///
    /// The whole read-modify-write runs under one lock acquisition; there
    /// is no await point between the lookup and the write, so two
    /// concurrent requests for the same key cannot double-admit.
    pub fn check(&self, key: &str, rule: &RateLimitRule, now_ms: u64) -> RateLimitDecision {
        let window_ms = (rule.window.as_millis() as u64).max(1);
        let window_start = now_ms / window_ms * window_ms;

        let entry = {
            let mut entries = lock(&self.entries);
            let updated = match entries.get(key) {
                // Still in the stored window: count this request.
                Some(entry) if entry.window_start == window_start => SlidingWindowEntry {
                    count: entry.count + 1,
                    ..*entry
                },
                // The stored window is the one we just left: it becomes the
                // previous window and a fresh live window opens.
                Some(entry) if entry.window_start == window_start.saturating_sub(window_ms) => {
                    SlidingWindowEntry {
                        count: 1,
                        window_start,
                        previous_count: entry.count,
                        previous_window_start: entry.window_start,
                    }
                }
                // Older or absent: both windows start empty.
                _ => SlidingWindowEntry {
                    count: 1,
                    window_start,
                    previous_count: 0,
                    previous_window_start: window_start.saturating_sub(window_ms),
                },
            };
            entries.insert(key.to_owned(), updated);
            updated
        };

        // Weight the previous window by how much of it still overlaps the
        // sliding window ending now.
        let progress = (now_ms - window_start) as f64 / window_ms as f64;
        let effective = f64::from(entry.count) + f64::from(entry.previous_count) * (1.0 - progress);

        let window_end = window_start + window_ms;
        RateLimitDecision {
            allowed: effective <= f64::from(rule.limit),
            limit: rule.limit,
            remaining: (f64::from(rule.limit) - effective).floor().max(0.0) as u32,
            reset: window_end.div_ceil(1000),
            retry_after: (window_end - now_ms).div_ceil(1000),
        }
    }

    /// Drop entries whose window started longer ago than [`STALE_AFTER`].
    pub fn sweep(&self, now_ms: u64) {
        let stale_ms = STALE_AFTER.as_millis() as u64;
        let mut entries = lock(&self.entries);
        entries.retain(|_, entry| now_ms.saturating_sub(entry.window_start) <= stale_ms);
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<'a>(
    entries: &'a Mutex<HashMap<String, SlidingWindowEntry>>,
) -> std::sync::MutexGuard<'a, HashMap<String, SlidingWindowEntry>> {
    match entries.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Spawn the periodic eviction task for a shared store.
pub fn spawn_sweeper(store: Arc<RateLimitStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            store.sweep(unix_now_ms());
        }
    })
}

/// Rejection body flavor, per API surface.
#[derive(Debug, Clone, Copy)]
pub enum RejectionStyle {
    /// `{"message": ...}` as Mailgun clients expect.
    Mailgun,
    /// The Universal API error envelope.
    Universal,
    /// `{"message": ..., "retryAfter": ...}` for unscoped routes.
    Plain,
}

impl RejectionStyle {
    fn body(self, decision: &RateLimitDecision) -> serde_json::Value {
        match self {
            Self::Mailgun => json!({
                "message": "Rate limit exceeded. Please retry after the specified time.",
            }),
            Self::Universal => json!({
                "error": {
                    "type": "rate_limit_error",
                    "code": "rate_limit_exceeded",
                    "message": "Too many requests, please try again later",
                    "details": {
                        "retryAfter": decision.retry_after,
                        "limit": decision.limit,
                    },
                },
            }),
            Self::Plain => json!({
                "message": "Too many requests, please try again later",
                "retryAfter": decision.retry_after,
            }),
        }
    }
}

/// Extracts the admission key from request headers.
pub type KeyExtractor = fn(&HeaderMap) -> String;

/// Bypass predicate, used to keep overlapping rules from double-charging a
/// request.
pub type SkipPredicate = fn(&Request<Body>) -> bool;

/// One admission rule bound to a store, a rejection style, and optional key
/// extraction / bypass hooks; applied as axum middleware.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<RateLimitStore>,
    rule: RateLimitRule,
    style: RejectionStyle,
    key_extractor: KeyExtractor,
    skip: Option<SkipPredicate>,
}

impl RateLimiter {
    /// Bind a rule to a shared store with the default key extraction.
    pub fn new(store: Arc<RateLimitStore>, rule: RateLimitRule, style: RejectionStyle) -> Self {
        Self {
            store,
            rule,
            style,
            key_extractor: client_key,
            skip: None,
        }
    }

    /// Replace the key extraction function.
    pub fn with_key_extractor(mut self, key_extractor: KeyExtractor) -> Self {
        self.key_extractor = key_extractor;
        self
    }

    /// Skip admission entirely for matching requests.
    pub fn with_skip(mut self, skip: SkipPredicate) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Middleware entry point for
    /// [`axum::middleware::from_fn_with_state`].
    pub async fn enforce(
        State(limiter): State<RateLimiter>,
        request: Request,
        next: Next,
    ) -> Response {
        if limiter.skip.is_some_and(|skip| skip(&request)) {
            return next.run(request).await;
        }

        let key = (limiter.key_extractor)(request.headers());
        let decision = limiter.store.check(&key, &limiter.rule, unix_now_ms());

        if decision.allowed {
            let mut response = next.run(request).await;
            apply_headers(response.headers_mut(), &decision);
            return response;
        }

        tracing::warn!(
            ip = %key,
            path = %request.uri().path(),
            limit = decision.limit,
            "rate limit exceeded"
        );

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(limiter.style.body(&decision)),
        )
            .into_response();
        apply_headers(response.headers_mut(), &decision);
        if let Ok(value) = HeaderValue::from_str(&decision.retry_after.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

/// Default admission key: first hop of `x-forwarded-for`, then
/// `x-real-ip`, then a shared bucket for direct connections. Extraction
/// never fails the request.
pub fn client_key(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
        && !first.trim().is_empty()
    {
        return first.trim().to_owned();
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok())
        && !real_ip.trim().is_empty()
    {
        return real_ip.trim().to_owned();
    }

    "direct".to_owned()
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let pairs = [
        ("x-ratelimit-limit", decision.limit.to_string()),
        ("x-ratelimit-remaining", decision.remaining.to_string()),
        ("x-ratelimit-reset", decision.reset.to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
