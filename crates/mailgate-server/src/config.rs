//! Environment-derived server configuration
//!
//! Values only; unset or unparseable variables fall back to defaults so a
//! bad environment never prevents startup.

use std::str::FromStr;
use std::time::Duration;

use mailgate_core::BatchOptions;
use mailgate_providers::UniOneRegion;

use crate::jobs::JobStoreConfig;

/// Complete gateway configuration.
///
/// Loaded once at startup and shared read-only through [`crate::AppState`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on (`PORT`, default 3001).
    pub port: u16,

    /// Provider used by the form surface and discovery
    /// (`MAIL_PROVIDER`, default `"resend"`).
    pub default_provider: String,

    /// UniOne hosting region (`UNIONE_REGION`, default `us`).
    pub unione_region: UniOneRegion,

    /// Admission-control tiers.
    pub rate_limit: RateLimitSettings,

    /// Job store capacity and TTL.
    pub job_store: JobStoreConfig,

    /// Concurrency/pacing overrides applied to batch-capable providers.
    pub batch: BatchOptions,
}

/// Per-tier requests-per-minute ceilings.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    /// Master switch (`RATE_LIMIT_ENABLED`, default true; only the literal
    /// `"false"` disables).
    pub enabled: bool,

    /// Send endpoints (`RATE_LIMIT_SEND_PER_MINUTE`, default 60).
    pub send_per_minute: u32,

    /// Health endpoint (`RATE_LIMIT_HEALTH_PER_MINUTE`, default 120).
    pub health_per_minute: u32,

    /// Everything else (`RATE_LIMIT_GLOBAL_PER_MINUTE`, default 200).
    pub global_per_minute: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            send_per_minute: 60,
            health_per_minute: 120,
            global_per_minute: 200,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            default_provider: "resend".to_owned(),
            unione_region: UniOneRegion::Us,
            rate_limit: RateLimitSettings::default(),
            job_store: JobStoreConfig::default(),
            batch: BatchOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Looks for:
    /// - `PORT`, `MAIL_PROVIDER`, `UNIONE_REGION`
    /// - `RATE_LIMIT_ENABLED`, `RATE_LIMIT_SEND_PER_MINUTE`,
    ///   `RATE_LIMIT_HEALTH_PER_MINUTE`, `RATE_LIMIT_GLOBAL_PER_MINUTE`
    /// - `JOB_STORE_MAX_JOBS`, `JOB_STORE_TTL_SECS`
    /// - `BATCH_CONCURRENCY`, `BATCH_RATE_LIMIT`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env_parse("PORT", defaults.port),
            default_provider: std::env::var("MAIL_PROVIDER")
                .unwrap_or(defaults.default_provider),
            unione_region: UniOneRegion::parse(std::env::var("UNIONE_REGION").ok().as_deref()),
            rate_limit: RateLimitSettings {
                enabled: std::env::var("RATE_LIMIT_ENABLED").as_deref() != Ok("false"),
                send_per_minute: env_parse(
                    "RATE_LIMIT_SEND_PER_MINUTE",
                    defaults.rate_limit.send_per_minute,
                ),
                health_per_minute: env_parse(
                    "RATE_LIMIT_HEALTH_PER_MINUTE",
                    defaults.rate_limit.health_per_minute,
                ),
                global_per_minute: env_parse(
                    "RATE_LIMIT_GLOBAL_PER_MINUTE",
                    defaults.rate_limit.global_per_minute,
                ),
            },
            job_store: JobStoreConfig {
                max_jobs: env_parse("JOB_STORE_MAX_JOBS", defaults.job_store.max_jobs),
                ttl: Duration::from_secs(env_parse(
                    "JOB_STORE_TTL_SECS",
                    defaults.job_store.ttl.as_secs(),
                )),
            },
            batch: BatchOptions {
                concurrency: env_parse("BATCH_CONCURRENCY", defaults.batch.concurrency),
                rate_limit: env_parse("BATCH_RATE_LIMIT", defaults.batch.rate_limit),
            },
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.default_provider, "resend");
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.send_per_minute, 60);
        assert_eq!(config.rate_limit.health_per_minute, 120);
        assert_eq!(config.rate_limit.global_per_minute, 200);
        assert_eq!(config.job_store.max_jobs, 1000);
        assert_eq!(config.job_store.ttl, Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.batch.concurrency, 5);
        assert_eq!(config.batch.rate_limit, 10);
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        // Key that certainly is not set.
        assert_eq!(env_parse("MAILGATE_TEST_UNSET_KEY", 42u32), 42);
    }
}
