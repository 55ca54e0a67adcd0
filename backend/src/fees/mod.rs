//! Late-Fee Calculation Module
//!
//! Pure calculation of a late fee from (principal, days overdue, policy).
//!
//! # Critical Invariants
//!
//! 1. **Purity**: no I/O, no clock, no randomness; same inputs, same result
//! 2. **Totality**: never fails on well-formed input; a malformed policy
//!    reaching this module is a caller programming error, not a recoverable
//!    condition
//! 3. **Grace**: `days_overdue <= grace.days` always yields a zero amount
//!    with an empty breakdown
//! 4. **Clamp**: when min/max bounds are configured they are applied
//!    unconditionally after calculation, even over a raw zero
//!
//! # Example
//!
//! ```rust
//! use latefee_engine_core_rs::fees;
//! use latefee_engine_core_rs::models::policy::{CalculationType, FeePolicy, GracePeriod};
//!
//! let policy = FeePolicy {
//!     enabled: true,
//!     grace: GracePeriod { days: 7, apply_on_weekends: true, apply_on_holidays: true },
//!     calculation: CalculationType::Percentage { rate: 5.0 },
//!     min_amount: None,
//!     max_amount: None,
//!     automation: Default::default(),
//! };
//!
//! // $1,000.00 principal, 8 days overdue (1 effective day past grace)
//! let result = fees::calculate(100_000, 8, &policy);
//! assert_eq!(result.amount, 5_000); // $50.00
//! ```

pub mod calculator;

// Re-export public API
pub use calculator::{calculate, BreakdownEntry, LateFeeResult};
