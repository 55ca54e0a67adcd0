//! Job status tracking
//!
//! Holds every known `BatchJob` for polling. Terminal jobs are retained for
//! a bounded window (24h by default) for audit, then pruned. No cross-process
//! durability: a durable store is an external collaborator if required.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::batch::BatchOutcome;
use crate::models::job::{BatchJob, BatchOptions, RecordError};

/// How often a bounded waiter re-polls
const WAIT_POLL_INTERVAL: StdDuration = StdDuration::from_millis(25);

/// Tracks batch job lifecycles and exposes polling
///
/// Cheap to clone; clones share the same job map.
#[derive(Clone)]
pub struct JobStatusTracker {
    jobs: Arc<RwLock<HashMap<Uuid, BatchJob>>>,
    retention: Duration,
}

impl Default for JobStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStatusTracker {
    /// Tracker with the default 24h retention for terminal jobs
    pub fn new() -> Self {
        Self::with_retention(Duration::hours(24))
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Create a job in Pending and return its id
    pub async fn start_job(
        &self,
        campus_id: &str,
        options: &BatchOptions,
        now: DateTime<Utc>,
    ) -> Uuid {
        let job = BatchJob::new(campus_id.to_string(), options, now);
        let id = job.id();
        self.jobs.write().await.insert(id, job);
        id
    }

    /// Pending -> Running
    pub async fn mark_running(&self, id: Uuid, now: DateTime<Utc>) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.begin(now);
        }
    }

    /// Refresh counters mid-run
    pub async fn record_progress(
        &self,
        id: Uuid,
        processed: u64,
        applied: u64,
        skipped_existing: u64,
        errors: Vec<RecordError>,
    ) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.record_progress(processed, applied, skipped_existing, errors);
        }
    }

    /// Running -> Completed with final counters
    pub async fn complete(&self, id: Uuid, outcome: &BatchOutcome, now: DateTime<Utc>) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.record_progress(
                outcome.processed,
                outcome.applied,
                outcome.skipped_existing,
                outcome.errors.clone(),
            );
            job.complete(now);
        }
    }

    /// Running -> Failed
    pub async fn fail(&self, id: Uuid, reason: String, now: DateTime<Utc>) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.fail(reason, now);
        }
    }

    /// Snapshot of a job's current counters and status
    pub async fn job_status(&self, id: Uuid) -> Option<BatchJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Poll until the job reaches a terminal state or the timeout elapses
    ///
    /// A timeout gives up on the *waiter* only; the underlying job keeps
    /// running and remains pollable.
    pub async fn wait_for_completion(
        &self,
        id: Uuid,
        timeout: StdDuration,
    ) -> Option<BatchJob> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.job_status(id).await {
                None => return None,
                Some(job) if job.status().is_terminal() => return Some(job),
                Some(_) => {}
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(job_id = %id, "gave up waiting for job completion; job continues");
                return None;
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Drop terminal jobs older than the retention window
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| match (job.status(), job.completed_at()) {
            (status, Some(completed_at)) if status.is_terminal() => {
                now - completed_at < self.retention
            }
            _ => true,
        });
        let pruned = before - jobs.len();
        if pruned > 0 {
            debug!(pruned, "pruned expired batch jobs");
        }
        pruned
    }

    /// Number of tracked jobs (any status)
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
