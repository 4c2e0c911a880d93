//! mailgate gateway server
//!
//! Wires the core pipeline into two HTTP surfaces:
//!
//! - [`ratelimit`] - sliding-window admission control applied as axum
//!   middleware
//! - [`jobs`] - bounded, TTL-evicting store for asynchronous batch
//!   submissions
//! - [`dispatch`] - supervised background batch orchestration
//! - [`api`] - the Mailgun-compatible (`/v3`) and Universal (`/api/v1`)
//!   routers
//! - [`config`] / [`state`] - env-derived settings and shared application
//!   state

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod dispatch;
pub mod jobs;
pub mod ratelimit;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;
