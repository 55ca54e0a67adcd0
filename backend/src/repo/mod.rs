//! External collaborator seams
//!
//! The engine talks to the surrounding application through these traits:
//! the record store for overdue fees and charges, the campus directory, and
//! the configuration document store. Persistence-boundary calls are the only
//! asynchronous points in the engine.
//!
//! # Critical Invariants
//!
//! 1. `find_overdue` pages are ordered by due date ascending (stable,
//!    resumable ordering)
//! 2. `apply_late_fee_charge` enforces uniqueness per
//!    `(enrollment_fee_id, billing_period)` and reports a duplicate as
//!    [`RepositoryError::DuplicateCharge`], which callers treat as a
//!    successful no-op

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::clock::BillingPeriod;
use crate::fees::BreakdownEntry;
use crate::models::policy::ConfigScope;
use crate::models::record::{AppliedCharge, OverdueFeeRecord};

/// Errors surfaced by repository collaborators
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepositoryError {
    /// Transient fault worth retrying (lock contention, request timeout)
    #[error("transient repository failure: {0}")]
    Transient(String),

    /// Backing store unreachable; aborts the affected campus run
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// A late-fee charge already exists for the (fee, period) pair
    #[error("charge already applied for {enrollment_fee_id} in {period}")]
    DuplicateCharge {
        enrollment_fee_id: String,
        period: String,
    },
}

impl RepositoryError {
    /// Whether a retry could reasonably succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Transient(_))
    }
}

/// One page of overdue records plus the cursor for the next page
#[derive(Debug, Clone, Default)]
pub struct OverduePage {
    pub records: Vec<OverdueFeeRecord>,

    /// Opaque cursor; `None` when this is the last page
    pub next_cursor: Option<String>,
}

/// Record store for enrollment fees, overdue lookups and applied charges
#[async_trait]
pub trait FeeRecordRepository: Send + Sync {
    /// Overdue records for a campus, ordered by due date ascending
    async fn find_overdue(
        &self,
        campus_id: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<OverduePage, RepositoryError>;

    /// Whether a charge was already applied for this fee and period
    async fn has_existing_late_fee_charge(
        &self,
        enrollment_fee_id: &str,
        period: &BillingPeriod,
    ) -> Result<bool, RepositoryError>;

    /// Persist a late-fee charge; must reject a duplicate
    /// `(enrollment_fee_id, period)` pair with
    /// [`RepositoryError::DuplicateCharge`]
    async fn apply_late_fee_charge(
        &self,
        enrollment_fee_id: &str,
        period: &BillingPeriod,
        amount: i64,
        breakdown: &[BreakdownEntry],
    ) -> Result<AppliedCharge, RepositoryError>;
}

/// Directory of campuses eligible for automated processing
#[async_trait]
pub trait CampusDirectory: Send + Sync {
    async fn list_active_campuses(&self) -> Result<Vec<String>, RepositoryError>;
}

/// Versioned per-scope configuration documents
#[async_trait]
pub trait PolicyConfigRepository: Send + Sync {
    async fn load(&self, scope: &ConfigScope)
        -> Result<Option<serde_json::Value>, RepositoryError>;

    async fn save(
        &self,
        scope: &ConfigScope,
        document: &serde_json::Value,
    ) -> Result<(), RepositoryError>;
}
