//! Fee calendar gate
//!
//! A policy can declare that late fees are not assessed on weekends or on
//! institution holidays. The gate is evaluated once per batch run against the
//! run date; it never alters the pure day-count arithmetic of the calculator.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::policy::GracePeriod;

/// Saturday or Sunday
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Whether late fees may be assessed on the given run date
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use latefee_engine_core_rs::models::policy::GracePeriod;
/// use latefee_engine_core_rs::fees_apply_on;
///
/// let grace = GracePeriod {
///     days: 5,
///     apply_on_weekends: false,
///     apply_on_holidays: true,
/// };
/// // 2024-03-09 is a Saturday
/// let saturday = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
/// assert!(!fees_apply_on(saturday, &grace, &[]));
/// ```
pub fn fees_apply_on(date: NaiveDate, grace: &GracePeriod, holidays: &[NaiveDate]) -> bool {
    if !grace.apply_on_weekends && is_weekend(date) {
        return false;
    }
    if !grace.apply_on_holidays && holidays.contains(&date) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grace(apply_on_weekends: bool, apply_on_holidays: bool) -> GracePeriod {
        GracePeriod {
            days: 0,
            apply_on_weekends,
            apply_on_holidays,
        }
    }

    #[test]
    fn test_weekday_always_passes() {
        // 2024-03-11 is a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        assert!(fees_apply_on(monday, &grace(false, false), &[]));
    }

    #[test]
    fn test_weekend_gated_when_flag_off() {
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert!(!fees_apply_on(sunday, &grace(false, true), &[]));
        assert!(fees_apply_on(sunday, &grace(true, true), &[]));
    }

    #[test]
    fn test_holiday_gated_when_flag_off() {
        let holiday = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert!(!fees_apply_on(holiday, &grace(true, false), &[holiday]));
        assert!(fees_apply_on(holiday, &grace(true, true), &[holiday]));
        // Not in the holiday list: gate does not trigger
        let ordinary = NaiveDate::from_ymd_opt(2024, 7, 5).unwrap();
        assert!(fees_apply_on(ordinary, &grace(true, false), &[holiday]));
    }
}
