//! In-memory repository adapters
//!
//! Reference implementations backing the integration tests. The fault
//! switches (`fail_next_applies`, `set_unavailable`) exercise the
//! processor's retry and abort paths.
//!
//! NOTE: Available in all builds to support integration testing, but
//! intended for test code only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::clock::BillingPeriod;
use crate::fees::BreakdownEntry;
use crate::models::policy::ConfigScope;
use crate::models::record::{AppliedCharge, OverdueFeeRecord};
use crate::repo::{
    CampusDirectory, FeeRecordRepository, OverduePage, PolicyConfigRepository, RepositoryError,
};

/// In-memory record store with fault injection for tests
#[derive(Default)]
pub struct InMemoryFeeRecords {
    records: RwLock<Vec<OverdueFeeRecord>>,
    charges: RwLock<HashMap<(String, String), AppliedCharge>>,
    fail_next_applies: AtomicU32,
    unavailable: AtomicBool,
}

impl InMemoryFeeRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_record(&self, record: OverdueFeeRecord) {
        self.records.write().await.push(record);
    }

    /// All charges applied so far, in no particular order
    pub async fn charges(&self) -> Vec<AppliedCharge> {
        self.charges.read().await.values().cloned().collect()
    }

    /// Make the next `n` apply calls fail with a transient error
    pub fn fail_next_applies(&self, n: u32) {
        self.fail_next_applies.store(n, Ordering::SeqCst);
    }

    /// Toggle infrastructure-level unavailability for every operation
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "record store offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FeeRecordRepository for InMemoryFeeRecords {
    async fn find_overdue(
        &self,
        campus_id: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<OverduePage, RepositoryError> {
        self.check_available()?;

        let mut matching: Vec<OverdueFeeRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.campus_id == campus_id)
            .cloned()
            .collect();
        // Stable resumable ordering: due date, then id as tiebreak
        matching.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| a.enrollment_fee_id.cmp(&b.enrollment_fee_id))
        });

        let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let page: Vec<OverdueFeeRecord> =
            matching.iter().skip(offset).take(page_size).cloned().collect();
        let next_offset = offset + page.len();
        let next_cursor = if next_offset < matching.len() {
            Some(next_offset.to_string())
        } else {
            None
        };

        Ok(OverduePage {
            records: page,
            next_cursor,
        })
    }

    async fn has_existing_late_fee_charge(
        &self,
        enrollment_fee_id: &str,
        period: &BillingPeriod,
    ) -> Result<bool, RepositoryError> {
        self.check_available()?;
        let key = (enrollment_fee_id.to_string(), period.key());
        Ok(self.charges.read().await.contains_key(&key))
    }

    async fn apply_late_fee_charge(
        &self,
        enrollment_fee_id: &str,
        period: &BillingPeriod,
        amount: i64,
        breakdown: &[BreakdownEntry],
    ) -> Result<AppliedCharge, RepositoryError> {
        self.check_available()?;

        let remaining = self.fail_next_applies.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next_applies.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Transient(
                "simulated write contention".to_string(),
            ));
        }

        let key = (enrollment_fee_id.to_string(), period.key());
        let mut charges = self.charges.write().await;
        if charges.contains_key(&key) {
            return Err(RepositoryError::DuplicateCharge {
                enrollment_fee_id: enrollment_fee_id.to_string(),
                period: period.key(),
            });
        }

        let charge = AppliedCharge {
            id: Uuid::new_v4(),
            enrollment_fee_id: enrollment_fee_id.to_string(),
            billing_period: period.key(),
            amount,
            breakdown: breakdown.to_vec(),
            applied_at: Utc::now(),
        };
        charges.insert(key, charge.clone());
        Ok(charge)
    }
}

/// Fixed campus list
pub struct InMemoryCampusDirectory {
    campuses: Vec<String>,
}

impl InMemoryCampusDirectory {
    pub fn new(campuses: Vec<String>) -> Self {
        Self { campuses }
    }
}

#[async_trait]
impl CampusDirectory for InMemoryCampusDirectory {
    async fn list_active_campuses(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.campuses.clone())
    }
}

/// Scope-keyed document map
#[derive(Default)]
pub struct InMemoryConfigRepository {
    documents: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyConfigRepository for InMemoryConfigRepository {
    async fn load(
        &self,
        scope: &ConfigScope,
    ) -> Result<Option<serde_json::Value>, RepositoryError> {
        Ok(self.documents.read().await.get(&scope.scope_key()).cloned())
    }

    async fn save(
        &self,
        scope: &ConfigScope,
        document: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        self.documents
            .write()
            .await
            .insert(scope.scope_key(), document.clone());
        Ok(())
    }
}
