//! Per-campus batch processor
//!
//! Pages through a campus's overdue records in due-date order, runs the
//! calculator per record against one immutable policy snapshot, and applies
//! or simulates the charges.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ConfigError, PolicyConfigStore};
use crate::core::calendar;
use crate::core::clock::{days_overdue, BillingPeriod, Clock};
use crate::fees::{self, BreakdownEntry};
use crate::models::job::{BatchOptions, RecordError};
use crate::models::policy::{ConfigScope, FeePolicy};
use crate::models::record::OverdueFeeRecord;
use crate::repo::{FeeRecordRepository, RepositoryError};
use crate::scheduler::tracker::JobStatusTracker;

/// Base delay for the exponential retry backoff
const RETRY_BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Backoff ceiling per attempt
const RETRY_BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Would-be charge recorded by a dry run
#[derive(Debug, Clone, PartialEq)]
pub struct ChargePreview {
    pub enrollment_fee_id: String,
    pub amount: i64,
    pub breakdown: Vec<BreakdownEntry>,
}

/// Counters and errors for one campus run
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Records examined (includes skips and zero-fee records)
    pub processed: u64,

    /// Charges persisted
    pub applied: u64,

    /// Records already charged for the period (idempotent no-ops)
    pub skipped_existing: u64,

    /// Records that failed after exhausting retries
    pub errors: Vec<RecordError>,

    /// Dry-run previews (empty on live runs)
    pub previews: Vec<ChargePreview>,
}

/// Batch-level errors
#[derive(Debug, Error)]
pub enum BatchError {
    /// The repository became unreachable; remaining pages for this campus
    /// were abandoned. Other campuses are unaffected.
    #[error("campus {campus_id} batch run aborted: {source}")]
    Infrastructure {
        campus_id: String,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Outcome of one record's check-then-apply step
enum RecordDisposition {
    SkippedExisting,
    NoFee,
    Previewed(ChargePreview),
    Applied,
}

/// Processes one campus's overdue records under a policy snapshot
pub struct CampusBatchProcessor {
    records: Arc<dyn FeeRecordRepository>,
    config: Arc<PolicyConfigStore>,
    tracker: JobStatusTracker,
    clock: Arc<dyn Clock>,
}

impl CampusBatchProcessor {
    pub fn new(
        records: Arc<dyn FeeRecordRepository>,
        config: Arc<PolicyConfigStore>,
        tracker: JobStatusTracker,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            config,
            tracker,
            clock,
        }
    }

    /// Process every overdue record for a campus
    ///
    /// When `job_id` is given, the tracked job transitions Running at start
    /// and Completed/Failed at the end, with counters refreshed after every
    /// page. The job is the processor's to mutate for the duration of the
    /// run.
    pub async fn process_campus(
        &self,
        campus_id: &str,
        options: &BatchOptions,
        job_id: Option<Uuid>,
    ) -> Result<BatchOutcome, BatchError> {
        if let Some(id) = job_id {
            self.tracker.mark_running(id, self.clock.now()).await;
        }

        let result = self.run(campus_id, options, job_id).await;

        if let Some(id) = job_id {
            let now = self.clock.now();
            match &result {
                Ok(outcome) => self.tracker.complete(id, outcome, now).await,
                Err(err) => self.tracker.fail(id, err.to_string(), now).await,
            }
        }

        result
    }

    async fn run(
        &self,
        campus_id: &str,
        options: &BatchOptions,
        job_id: Option<Uuid>,
    ) -> Result<BatchOutcome, BatchError> {
        // One snapshot per run: concurrent admin edits never affect us.
        let document = self
            .config
            .get_configuration(&ConfigScope::for_campus(campus_id))
            .await?;
        let policy = document.late_fees.clone();

        let now = self.clock.now();
        let today = now.date_naive();
        let period = BillingPeriod::containing(today);
        let mut outcome = BatchOutcome::default();

        if !calendar::fees_apply_on(today, &policy.grace, &document.general.holidays) {
            info!(campus_id, date = %today, "late-fee run gated by fee calendar");
            return Ok(outcome);
        }

        info!(
            campus_id,
            dry_run = options.dry_run,
            period = %period,
            "late-fee batch run starting"
        );

        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .records
                .find_overdue(campus_id, options.batch_size, cursor.as_deref())
                .await
                .map_err(|source| BatchError::Infrastructure {
                    campus_id: campus_id.to_string(),
                    source,
                })?;

            for record in &page.records {
                self.process_record(record, &policy, &period, options, &mut outcome)
                    .await
                    .map_err(|source| BatchError::Infrastructure {
                        campus_id: campus_id.to_string(),
                        source,
                    })?;
            }

            if let Some(id) = job_id {
                self.tracker
                    .record_progress(
                        id,
                        outcome.processed,
                        outcome.applied,
                        outcome.skipped_existing,
                        outcome.errors.clone(),
                    )
                    .await;
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            campus_id,
            processed = outcome.processed,
            applied = outcome.applied,
            skipped = outcome.skipped_existing,
            errors = outcome.errors.len(),
            "late-fee batch run finished"
        );
        Ok(outcome)
    }

    /// Check-then-apply for one record, with retries for transient faults
    ///
    /// Returns Err only on infrastructure-level unavailability; per-record
    /// failures land in `outcome.errors` and processing continues.
    async fn process_record(
        &self,
        record: &OverdueFeeRecord,
        policy: &FeePolicy,
        period: &BillingPeriod,
        options: &BatchOptions,
        outcome: &mut BatchOutcome,
    ) -> Result<(), RepositoryError> {
        outcome.processed += 1;

        let mut attempt = 0u32;
        loop {
            match self.try_charge(record, policy, period, options.dry_run).await {
                Ok(RecordDisposition::SkippedExisting) => {
                    outcome.skipped_existing += 1;
                    return Ok(());
                }
                Ok(RecordDisposition::NoFee) => return Ok(()),
                Ok(RecordDisposition::Previewed(preview)) => {
                    outcome.previews.push(preview);
                    return Ok(());
                }
                Ok(RecordDisposition::Applied) => {
                    outcome.applied += 1;
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt < options.max_retries => {
                    attempt += 1;
                    warn!(
                        record_id = %record.enrollment_fee_id,
                        attempt,
                        error = %err,
                        "transient failure applying late fee, retrying"
                    );
                    tokio::time::sleep(retry_backoff(attempt)).await;
                }
                Err(err @ RepositoryError::Unavailable(_)) => return Err(err),
                Err(err) => {
                    warn!(
                        record_id = %record.enrollment_fee_id,
                        error = %err,
                        "record failed after exhausting retries"
                    );
                    outcome.errors.push(RecordError {
                        record_id: record.enrollment_fee_id.clone(),
                        message: err.to_string(),
                    });
                    return Ok(());
                }
            }
        }
    }

    async fn try_charge(
        &self,
        record: &OverdueFeeRecord,
        policy: &FeePolicy,
        period: &BillingPeriod,
        dry_run: bool,
    ) -> Result<RecordDisposition, RepositoryError> {
        // Idempotency check before anything else
        if self
            .records
            .has_existing_late_fee_charge(&record.enrollment_fee_id, period)
            .await?
        {
            return Ok(RecordDisposition::SkippedExisting);
        }

        let days = days_overdue(record.due_date, self.clock.now());
        let result = fees::calculate(record.principal_amount, days, policy);
        if result.amount == 0 {
            // Within grace, disabled policy, or genuinely zero fee
            return Ok(RecordDisposition::NoFee);
        }

        if dry_run {
            return Ok(RecordDisposition::Previewed(ChargePreview {
                enrollment_fee_id: record.enrollment_fee_id.clone(),
                amount: result.amount,
                breakdown: result.breakdown,
            }));
        }

        match self
            .records
            .apply_late_fee_charge(
                &record.enrollment_fee_id,
                period,
                result.amount,
                &result.breakdown,
            )
            .await
        {
            Ok(_) => Ok(RecordDisposition::Applied),
            // Lost a race with another run: the charge exists, which is what
            // we wanted. Successful no-op.
            Err(RepositoryError::DuplicateCharge { .. }) => {
                Ok(RecordDisposition::SkippedExisting)
            }
            Err(err) => Err(err),
        }
    }
}

fn retry_backoff(attempt: u32) -> Duration {
    let exp = RETRY_BACKOFF_BASE.saturating_mul(1u32 << attempt.min(16).saturating_sub(1));
    exp.min(RETRY_BACKOFF_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(retry_backoff(1), Duration::from_millis(100));
        assert_eq!(retry_backoff(2), Duration::from_millis(200));
        assert_eq!(retry_backoff(3), Duration::from_millis(400));
        assert_eq!(retry_backoff(10), RETRY_BACKOFF_MAX);
    }
}
