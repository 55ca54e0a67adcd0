//! Overdue fee records and applied charges
//!
//! `OverdueFeeRecord` is owned by the external record store; the engine only
//! reads it. `AppliedCharge` is what the engine hands back to the store when
//! a late fee is applied.
//!
//! CRITICAL: All money values are i64 (cents)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fees::BreakdownEntry;

/// An overdue tuition/enrollment charge, as reported by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueFeeRecord {
    /// Identifier of the enrollment fee this record belongs to
    pub enrollment_fee_id: String,

    pub campus_id: String,

    /// Outstanding principal in cents
    pub principal_amount: i64,

    pub due_date: NaiveDate,
}

/// A late-fee charge persisted against an enrollment fee
///
/// At most one charge exists per `(enrollment_fee_id, billing_period)`;
/// the repository enforces the uniqueness, the processor checks before
/// applying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCharge {
    pub id: Uuid,

    pub enrollment_fee_id: String,

    /// Billing-period key (`YYYY-MM`) of the idempotency pair
    pub billing_period: String,

    /// Charged amount in cents
    pub amount: i64,

    /// Audit breakdown from the calculation that produced the amount
    pub breakdown: Vec<BreakdownEntry>,

    pub applied_at: DateTime<Utc>,
}
