//! Job polling handler

use axum::Json;
use axum::extract::{Path, State};
use mailgate_core::ItemStatus;

use super::types::{JobErrorDetail, JobProgress, JobStatusResponse};
use crate::api::auth::BearerApiKey;
use crate::api::error::ApiError;
use crate::state::AppState;

/// Failed items included in a poll response are capped to the first few.
const MAX_REPORTED_ERRORS: usize = 10;

/// `GET /api/v1/jobs/{id}` — best-known state, never blocks on completion.
pub async fn get_job(
    State(state): State<AppState>,
    _auth: BearerApiKey,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let Some(job) = state.jobs.get(&id) else {
        return Err(ApiError::not_found(
            "job_not_found",
            format!("Job \"{id}\" not found"),
        ));
    };

    let errors: Vec<JobErrorDetail> = job
        .results
        .iter()
        .filter(|item| item.status == ItemStatus::Failed && item.error.is_some())
        .take(MAX_REPORTED_ERRORS)
        .map(|item| JobErrorDetail {
            index: item.index,
            recipient: item.recipient.clone(),
            code: "send_failed".to_owned(),
            message: item
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_owned()),
        })
        .collect();

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        status: job.status,
        progress: JobProgress {
            total: job.total,
            sent: job.sent,
            failed: job.failed,
            pending: job.pending,
        },
        created_at: job.created_at,
        started_at: job.started_at,
        completed_at: job.completed_at,
        errors: (!errors.is_empty()).then_some(errors),
    }))
}
