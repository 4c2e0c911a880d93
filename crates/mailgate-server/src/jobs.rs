//! In-memory job store for asynchronous batch submissions
//!
//! Bounded by capacity and TTL; eviction runs opportunistically when a
//! create finds the store full. Every read-modify-write completes inside a
//! single lock acquisition, so concurrent handlers cannot interleave a
//! partial update.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use mailgate_core::{Error, ItemOutcome, ItemStatus, Job, JobStatus, Result};

/// Capacity and retention settings.
#[derive(Debug, Clone, Copy)]
pub struct JobStoreConfig {
    /// Maximum tracked jobs before creation is refused.
    pub max_jobs: usize,

    /// Age past which a job may be evicted.
    pub ttl: Duration,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self {
            max_jobs: 1000,
            ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Registry of in-flight and completed batch jobs.
pub struct JobStore {
    jobs: Mutex<HashMap<String, Job>>,
    config: JobStoreConfig,
}

impl JobStore {
    /// Create a store with the given limits.
    pub fn new(config: JobStoreConfig) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Create a pending job with one item per recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreFull`] when the store is at capacity and the
    /// cleanup pass frees no room.
    pub fn create(&self, id: &str, recipients: Vec<String>) -> Result<Job> {
        let mut jobs = self.lock();

        if jobs.len() >= self.config.max_jobs {
            Self::cleanup(&mut jobs, &self.config);
            if jobs.len() >= self.config.max_jobs {
                return Err(Error::StoreFull);
            }
        }

        let job = Job::new(id, recipients);
        jobs.insert(id.to_owned(), job.clone());
        Ok(job)
    }

    /// Snapshot of a job, if it is still tracked.
    pub fn get(&self, id: &str) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    /// Transition a job's status.
    ///
    /// No-op when the job is absent or already terminal. `started_at` is
    /// stamped only on the first entry into `Processing`, `completed_at`
    /// only on the first entry into a terminal status; re-applying the same
    /// status never re-stamps.
    pub fn update_status(&self, id: &str, status: JobStatus) {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(id) else {
            return;
        };
        if job.status.is_terminal() {
            return;
        }

        job.status = status;

        if status == JobStatus::Processing && job.started_at.is_none() {
            job.started_at = Some(Utc::now());
        }
        if status.is_terminal() && job.completed_at.is_none() {
            job.completed_at = Some(Utc::now());
        }
    }

    /// Apply one provider result to the item at `index`.
    ///
    /// No-op when the job or index is absent. Aggregate counters move only
    /// the first time an item leaves `Pending`; re-applying a result
    /// refreshes the stored detail without double-counting.
    pub fn update_email_result(&self, id: &str, index: usize, outcome: ItemOutcome) {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(id) else {
            return;
        };
        if job.status.is_terminal() {
            return;
        }
        let Some(item) = job.results.get_mut(index) else {
            return;
        };

        let was_pending = item.status == ItemStatus::Pending;

        item.status = outcome.status;
        item.provider_id = outcome.provider_id;
        item.error = outcome.error;

        if was_pending && outcome.status != ItemStatus::Pending {
            job.pending -= 1;
            if outcome.status == ItemStatus::Failed {
                job.failed += 1;
            } else {
                job.sent += 1;
            }
        }
    }

    /// Number of tracked jobs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store tracks no jobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Job>> {
        match self.jobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Evict expired jobs, then trim oldest-first if still over capacity.
    fn cleanup(jobs: &mut HashMap<String, Job>, config: &JobStoreConfig) {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(config.ttl).unwrap_or(chrono::Duration::MAX);

        let expired: Vec<String> = jobs
            .iter()
            .filter(|(_, job)| now - job.created_at > ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            jobs.remove(id);
        }
        if !expired.is_empty() {
            tracing::debug!(evicted = expired.len(), "evicted expired jobs");
        }

        if jobs.len() > config.max_jobs {
            let mut by_age: Vec<(String, chrono::DateTime<Utc>)> = jobs
                .iter()
                .map(|(id, job)| (id.clone(), job.created_at))
                .collect();
            by_age.sort_by_key(|(_, created_at)| *created_at);

            let excess = jobs.len() - config.max_jobs;
            for (id, _) in by_age.into_iter().take(excess) {
                jobs.remove(&id);
            }
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(JobStoreConfig::default())
    }
}
