//! Batch job lifecycle
//!
//! A `BatchJob` tracks one campus batch run:
//! Pending -> Running -> Completed | Failed. Terminal jobs are retained for a
//! bounded window for audit/polling, then pruned by the tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed or Failed jobs never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A record that failed after exhausting its retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordError {
    pub record_id: String,
    pub message: String,
}

/// Per-run processing options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Compute and record outcomes without persisting any charge
    pub dry_run: bool,

    /// Page size for overdue-record pagination
    pub batch_size: usize,

    /// Retries per record for transient repository failures
    pub max_retries: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            batch_size: 100,
            max_retries: 3,
        }
    }
}

/// One campus batch run
///
/// Created Pending by the tracker when a run starts; mutated only by the
/// processor executing it; terminal once Completed or Failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    id: Uuid,
    campus_id: String,
    status: JobStatus,
    dry_run: bool,
    batch_size: usize,
    max_retries: u32,
    processed: u64,
    applied: u64,
    skipped_existing: u64,
    errors: Vec<RecordError>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new(campus_id: String, options: &BatchOptions, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            campus_id,
            status: JobStatus::Pending,
            dry_run: options.dry_run,
            batch_size: options.batch_size,
            max_retries: options.max_retries,
            processed: 0,
            applied: 0,
            skipped_existing: 0,
            errors: Vec::new(),
            failure_reason: None,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn campus_id(&self) -> &str {
        &self.campus_id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Records examined, including skipped and zero-fee records
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Charges actually persisted this run
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Records skipped because a charge already existed for the period
    pub fn skipped_existing(&self) -> u64 {
        self.skipped_existing
    }

    pub fn errors(&self) -> &[RecordError] {
        &self.errors
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Pending -> Running when processing begins
    pub fn begin(&mut self, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, JobStatus::Pending, "job started twice");
        self.status = JobStatus::Running;
        self.started_at = Some(now);
    }

    /// Update counters mid-run (after each processed page)
    pub fn record_progress(
        &mut self,
        processed: u64,
        applied: u64,
        skipped_existing: u64,
        errors: Vec<RecordError>,
    ) {
        self.processed = processed;
        self.applied = applied;
        self.skipped_existing = skipped_existing;
        self.errors = errors;
    }

    /// Running -> Completed with final counters
    pub fn complete(&mut self, now: DateTime<Utc>) {
        debug_assert!(!self.status.is_terminal(), "job completed twice");
        self.status = JobStatus::Completed;
        self.completed_at = Some(now);
    }

    /// Running -> Failed on infrastructure-level failure
    pub fn fail(&mut self, reason: String, now: DateTime<Utc>) {
        debug_assert!(!self.status.is_terminal(), "job failed twice");
        self.status = JobStatus::Failed;
        self.failure_reason = Some(reason);
        self.completed_at = Some(now);
    }
}
