//! Background batch dispatch
//!
//! A batch submission is handed to a supervised task pair: the inner task
//! runs the provider call and applies results; the outer task observes the
//! inner handle so that even a panic forces the job to `Failed`. A job can
//! never be left in `Processing`.

use std::sync::Arc;

use mailgate_core::{Email, EmailProvider, ItemOutcome, ItemStatus, JobStatus, SecretString};
use tokio::task::JoinHandle;

use crate::jobs::JobStore;

/// Spawn the supervised dispatch task for one batch job.
///
/// Returns the supervisor handle; callers may await it in tests but the
/// request path does not.
pub fn spawn_batch_dispatch(
    jobs: Arc<JobStore>,
    provider: Arc<dyn EmailProvider>,
    emails: Vec<Email>,
    credential: SecretString,
    job_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let worker = tokio::spawn(run_batch(
            Arc::clone(&jobs),
            provider,
            emails,
            credential,
            job_id.clone(),
        ));

        if let Err(join_error) = worker.await {
            tracing::error!(job_id = %job_id, error = %join_error, "batch dispatch task aborted");
            jobs.update_status(&job_id, JobStatus::Failed);
        }
    })
}

async fn run_batch(
    jobs: Arc<JobStore>,
    provider: Arc<dyn EmailProvider>,
    emails: Vec<Email>,
    credential: SecretString,
    job_id: String,
) {
    jobs.update_status(&job_id, JobStatus::Processing);

    let results = match provider.send_batch(&emails, &credential).await {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "batch job failed");
            jobs.update_status(&job_id, JobStatus::Failed);
            return;
        }
    };

    for index in 0..emails.len() {
        let outcome = match results.get(index) {
            Some(result) => ItemOutcome::from(result),
            // A provider short on results must still resolve every item.
            None => ItemOutcome {
                status: ItemStatus::Failed,
                provider_id: None,
                error: Some("no result from provider".to_owned()),
            },
        };
        jobs.update_email_result(&job_id, index, outcome);
    }

    if let Some(job) = jobs.get(&job_id) {
        let final_status = job.final_status();
        jobs.update_status(&job_id, final_status);
        tracing::info!(
            job_id = %job_id,
            status = ?final_status,
            sent = job.sent,
            failed = job.failed,
            "batch job finished"
        );
    }
}
