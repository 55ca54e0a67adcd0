//! Clock abstraction and billing-period math
//!
//! The engine derives overdue durations and billing periods from an injected
//! clock. Production code uses [`SystemClock`]; tests use [`FixedClock`] and
//! advance it manually.

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Source of "now" for the engine
///
/// # Example
/// ```
/// use latefee_engine_core_rs::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let now = clock.now();
/// assert!(now.timestamp() > 0);
/// ```
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually-advanced clock for deterministic tests
///
/// # Example
/// ```
/// use chrono::{Datelike, Duration, TimeZone, Utc};
/// use latefee_engine_core_rs::{Clock, FixedClock};
///
/// let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap());
/// clock.advance(Duration::days(1));
/// assert_eq!(clock.now().day(), 2);
/// ```
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(at),
        }
    }

    /// Move the clock to an absolute instant
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().expect("clock lock poisoned") = at;
    }

    /// Advance the clock by a duration
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}

/// Calendar month a charge belongs to
///
/// The pair `(enrollment_fee_id, BillingPeriod)` is the idempotency key for
/// applied charges: one late-fee charge per fee per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// Billing period containing the given date
    ///
    /// # Example
    /// ```
    /// use chrono::NaiveDate;
    /// use latefee_engine_core_rs::BillingPeriod;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    /// assert_eq!(BillingPeriod::containing(date).key(), "2024-03");
    /// ```
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Stable storage key, `YYYY-MM`
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Whole days a fee is overdue at the given instant
///
/// Dates on or before the due date count as zero.
///
/// # Example
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use latefee_engine_core_rs::days_overdue;
///
/// let due = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let now = Utc.with_ymd_and_hms(2024, 3, 11, 9, 30, 0).unwrap();
/// assert_eq!(days_overdue(due, now), 10);
/// ```
pub fn days_overdue(due_date: NaiveDate, now: DateTime<Utc>) -> u32 {
    let today = now.date_naive();
    if today <= due_date {
        return 0;
    }
    (today - due_date).num_days() as u32
}
