//! Time primitives for the engine
//!
//! Every time-dependent component takes time as an input (an injected
//! [`clock::Clock`]) instead of reading the wall clock, so batch runs and
//! scheduler behavior replay deterministically in tests.

pub mod calendar;
pub mod clock;

pub use calendar::fees_apply_on;
pub use clock::{days_overdue, BillingPeriod, Clock, FixedClock, SystemClock};
