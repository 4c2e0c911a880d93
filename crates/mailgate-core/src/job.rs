//! Job tracking types for asynchronous batch submissions
//!
//! A [`Job`] turns a fire-and-forget batch send into a pollable resource:
//! created with every item pending, mutated as chunk results arrive, frozen
//! once it reaches a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::email::{SendResult, SendStatus};

/// Lifecycle status of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, background dispatch not yet started.
    Pending,
    /// Background dispatch in flight.
    Processing,
    /// Every item was handed off successfully.
    Completed,
    /// Every item failed.
    Failed,
    /// Some items succeeded and some failed.
    Partial,
}

impl JobStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Partial)
    }
}

/// Per-item delivery status inside a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// No result received yet.
    Pending,
    /// Accepted by the provider, delivery pending.
    Queued,
    /// Confirmed sent.
    Sent,
    /// Rejected.
    Failed,
}

impl From<SendStatus> for ItemStatus {
    fn from(status: SendStatus) -> Self {
        match status {
            SendStatus::Queued => Self::Queued,
            SendStatus::Sent => Self::Sent,
            SendStatus::Failed => Self::Failed,
        }
    }
}

/// Result slot for one email inside a job, ordered by submission index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobItemResult {
    /// Position in the submitted batch.
    pub index: u32,

    /// First recipient of the email at this position.
    pub recipient: String,

    /// Current delivery status.
    pub status: ItemStatus,

    /// Provider-assigned message id, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// Failure reason, when `status` is [`ItemStatus::Failed`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome applied to a single job item as provider results arrive.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    /// New delivery status; never [`ItemStatus::Pending`].
    pub status: ItemStatus,
    /// Provider-assigned message id, if the provider returned one.
    pub provider_id: Option<String>,
    /// Failure reason, if any.
    pub error: Option<String>,
}

impl From<&SendResult> for ItemOutcome {
    fn from(result: &SendResult) -> Self {
        Self {
            status: result.status.into(),
            provider_id: (!result.id.is_empty()).then(|| result.id.clone()),
            error: result.error.clone(),
        }
    }
}

/// One asynchronous batch submission.
///
/// Invariant: `sent + failed + pending == total` at all times; the counters
/// only move when an item first leaves [`ItemStatus::Pending`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque identifier, unique within the process.
    pub id: String,

    /// Lifecycle status.
    pub status: JobStatus,

    /// Number of emails in the submission.
    pub total: u32,

    /// Items handed off successfully so far.
    pub sent: u32,

    /// Items failed so far.
    pub failed: u32,

    /// Items without a result yet.
    pub pending: u32,

    /// Per-item results, in submission order.
    pub results: Vec<JobItemResult>,

    /// Submission time.
    pub created_at: DateTime<Utc>,

    /// Stamped once, on the first transition into `Processing`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Stamped once, on the first transition into a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a pending job with one pending item per recipient.
    pub fn new(id: impl Into<String>, recipients: Vec<String>) -> Self {
        let total = recipients.len() as u32;
        let results = recipients
            .into_iter()
            .enumerate()
            .map(|(index, recipient)| JobItemResult {
                index: index as u32,
                recipient,
                status: ItemStatus::Pending,
                provider_id: None,
                error: None,
            })
            .collect();

        Self {
            id: id.into(),
            status: JobStatus::Pending,
            total,
            sent: 0,
            failed: 0,
            pending: total,
            results,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Final status once every item has a result.
    pub fn final_status(&self) -> JobStatus {
        if self.failed == self.total {
            JobStatus::Failed
        } else if self.failed > 0 {
            JobStatus::Partial
        } else {
            JobStatus::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_all_pending() {
        let job = Job::new("job_1", vec!["a@example.com".into(), "b@example.com".into()]);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total, 2);
        assert_eq!(job.pending, 2);
        assert_eq!(job.sent + job.failed, 0);
        assert_eq!(job.results.len(), 2);
        assert_eq!(job.results[1].index, 1);
        assert_eq!(job.results[1].recipient, "b@example.com");
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Partial.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn final_status_partitioning() {
        let mut job = Job::new("job_2", vec!["a@x.com".into(), "b@x.com".into()]);
        job.failed = 2;
        assert_eq!(job.final_status(), JobStatus::Failed);
        job.failed = 1;
        assert_eq!(job.final_status(), JobStatus::Partial);
        job.failed = 0;
        assert_eq!(job.final_status(), JobStatus::Completed);
    }

    #[test]
    fn outcome_from_send_result_drops_empty_id() {
        let outcome = ItemOutcome::from(&SendResult::failed("bounced"));
        assert_eq!(outcome.status, ItemStatus::Failed);
        assert!(outcome.provider_id.is_none());
        assert_eq!(outcome.error.as_deref(), Some("bounced"));

        let outcome = ItemOutcome::from(&SendResult::queued("msg_9"));
        assert_eq!(outcome.status, ItemStatus::Queued);
        assert_eq!(outcome.provider_id.as_deref(), Some("msg_9"));
    }
}
