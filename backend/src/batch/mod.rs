//! Campus Batch Processing Module
//!
//! Applies (or simulates) late fees for one campus's overdue records.
//!
//! # Critical Invariants
//!
//! 1. **Policy snapshot**: the policy is fetched once per run; concurrent
//!    policy edits never affect an in-progress batch
//! 2. **Idempotency**: re-running the same window never double-charges; an
//!    existing `(enrollment_fee_id, billing_period)` charge is a counted
//!    skip, not an error
//! 3. **Failure isolation**: a record failing after its retries is appended
//!    to the job's errors and processing continues; only an
//!    infrastructure-level failure aborts the campus run
//! 4. **Dry-run safety**: a dry run never calls `apply_late_fee_charge`

pub mod processor;

// Re-export public API
pub use processor::{BatchError, BatchOutcome, CampusBatchProcessor, ChargePreview};
