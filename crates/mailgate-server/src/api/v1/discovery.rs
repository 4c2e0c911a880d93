//! API info and feature discovery (no auth)

use axum::Json;
use axum::extract::State;
use mailgate_core::ProviderCapabilities;

use super::types::{ApiInfoResponse, ProviderInfo};
use crate::state::AppState;

/// `GET /api/v1`
pub async fn api_info(State(state): State<AppState>) -> Json<ApiInfoResponse> {
    let provider_name = &state.config.default_provider;

    let (provider, capabilities) = match state.registry.get(provider_name) {
        Ok(provider) => (
            ProviderInfo {
                name: provider.name().to_owned(),
                batch_size: provider.batch_size(),
                rate_limit: provider.rate_limit(),
            },
            provider.capabilities(),
        ),
        // Unconfigured default: advertise conservative values.
        Err(_) => (
            ProviderInfo {
                name: provider_name.clone(),
                batch_size: 100,
                rate_limit: 10,
            },
            ProviderCapabilities {
                batch: true,
                tracking: false,
                events: false,
                suppressions: false,
            },
        ),
    };

    Json(ApiInfoResponse {
        name: "mailgate",
        version: env!("CARGO_PKG_VERSION"),
        api_version: "v1",
        provider,
        capabilities,
    })
}
