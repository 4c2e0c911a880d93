//! Shared application state
//!
//! All long-lived components are constructed once in `main` and handed to
//! request handlers by reference through this state; there are no process
//! globals.

use std::sync::Arc;

use mailgate_core::ProviderRegistry;

use crate::config::ServerConfig;
use crate::jobs::JobStore;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Registered outbound providers.
    pub registry: Arc<ProviderRegistry>,

    /// Batch-submission job store.
    pub jobs: Arc<JobStore>,

    /// Loaded configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Assemble state from its components.
    pub fn new(registry: ProviderRegistry, jobs: JobStore, config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            jobs: Arc::new(jobs),
            config: Arc::new(config),
        }
    }
}
