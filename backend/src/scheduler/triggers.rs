//! Recurring trigger schedules
//!
//! Four recurrence shapes, all evaluated in UTC: daily at a fixed time,
//! weekly on a weekday, monthly on a day of month (clamped to short months),
//! and hourly within a business-hours window.
//!
//! A schedule answers two questions: when is the next fire strictly after a
//! given instant, and which period does a fire belong to. The period key
//! backs the anti-double-fire guard: a trigger fires at most once per period.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

/// When a recurring trigger fires
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// Every day at a fixed time
    Daily { at: NaiveTime },

    /// Once a week on the given weekday
    Weekly { weekday: Weekday, at: NaiveTime },

    /// Once a month on the given day; days past the end of a short month
    /// clamp to its last day (31 -> Feb 29/28)
    Monthly { day: u32, at: NaiveTime },

    /// Top of every hour with `start_hour <= hour < end_hour`
    HourlyWindow { start_hour: u32, end_hour: u32 },
}

impl Default for Schedule {
    /// Nightly sweep at 02:00 UTC
    fn default() -> Self {
        Schedule::Daily {
            at: NaiveTime::from_hms_opt(2, 0, 0).expect("02:00:00 is a valid time"),
        }
    }
}

impl Schedule {
    /// Reject shapes that could never fire
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Schedule::Daily { .. } | Schedule::Weekly { .. } => Ok(()),
            Schedule::Monthly { day, .. } => {
                if (1..=31).contains(day) {
                    Ok(())
                } else {
                    Err(format!("monthly day {} outside 1..=31", day))
                }
            }
            Schedule::HourlyWindow {
                start_hour,
                end_hour,
            } => {
                if *start_hour < *end_hour && *end_hour <= 24 {
                    Ok(())
                } else {
                    Err(format!(
                        "hourly window {}..{} is empty or out of range",
                        start_hour, end_hour
                    ))
                }
            }
        }
    }

    /// Next instant strictly after `after` at which this schedule fires
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Schedule::Daily { at } => {
                let candidate = after.date_naive().and_time(*at).and_utc();
                if candidate > after {
                    candidate
                } else {
                    (after.date_naive() + Duration::days(1)).and_time(*at).and_utc()
                }
            }

            Schedule::Weekly { weekday, at } => {
                let mut date = after.date_naive();
                for _ in 0..=7 {
                    if date.weekday() == *weekday {
                        let candidate = date.and_time(*at).and_utc();
                        if candidate > after {
                            return candidate;
                        }
                    }
                    date += Duration::days(1);
                }
                unreachable!("a weekday recurs within 8 days");
            }

            Schedule::Monthly { day, at } => {
                let (mut year, mut month) = (after.year(), after.month());
                let candidate = monthly_occurrence(year, month, *day, *at);
                if candidate > after {
                    return candidate;
                }
                if month == 12 {
                    year += 1;
                    month = 1;
                } else {
                    month += 1;
                }
                monthly_occurrence(year, month, *day, *at)
            }

            Schedule::HourlyWindow {
                start_hour,
                end_hour,
            } => {
                // Truncate down to the hour, then walk forward to the next
                // top-of-hour inside the window.
                let mut t = after
                    .date_naive()
                    .and_hms_opt(after.hour(), 0, 0)
                    .expect("whole hour is a valid time")
                    .and_utc();
                loop {
                    t += Duration::hours(1);
                    let hour = t.hour();
                    if hour >= *start_hour && hour < *end_hour {
                        return t;
                    }
                }
            }
        }
    }

    /// Period a fire at `at` belongs to; at most one fire per period
    pub fn period_key(&self, at: DateTime<Utc>) -> String {
        match self {
            Schedule::Daily { .. } => at.format("%Y-%m-%d").to_string(),
            Schedule::Weekly { .. } => {
                let week = at.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Schedule::Monthly { .. } => at.format("%Y-%m").to_string(),
            Schedule::HourlyWindow { .. } => at.format("%Y-%m-%dT%H").to_string(),
        }
    }
}

/// The schedule's occurrence within one specific month, day clamped
fn monthly_occurrence(year: i32, month: u32, day: u32, at: NaiveTime) -> DateTime<Utc> {
    let clamped = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, clamped)
        .expect("clamped day is valid for its month")
        .and_time(at)
        .and_utc()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first of month is valid")
        .pred_opt()
        .expect("day before first of month exists")
        .day()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_daily_fires_later_today_or_tomorrow() {
        let schedule = Schedule::Daily { at: at(2, 0) };
        assert_eq!(
            schedule.next_fire_after(utc(2024, 3, 1, 1, 0)),
            utc(2024, 3, 1, 2, 0)
        );
        assert_eq!(
            schedule.next_fire_after(utc(2024, 3, 1, 2, 0)),
            utc(2024, 3, 2, 2, 0)
        );
    }

    #[test]
    fn test_weekly_fires_on_weekday() {
        // 2024-03-01 is a Friday
        let schedule = Schedule::Weekly {
            weekday: Weekday::Mon,
            at: at(6, 30),
        };
        assert_eq!(
            schedule.next_fire_after(utc(2024, 3, 1, 0, 0)),
            utc(2024, 3, 4, 6, 30)
        );
        // Exactly at the fire instant: next week
        assert_eq!(
            schedule.next_fire_after(utc(2024, 3, 4, 6, 30)),
            utc(2024, 3, 11, 6, 30)
        );
    }

    #[test]
    fn test_monthly_clamps_short_months() {
        let schedule = Schedule::Monthly {
            day: 31,
            at: at(3, 0),
        };
        // After Jan 31 fire: February clamps to the 29th (2024 is a leap year)
        assert_eq!(
            schedule.next_fire_after(utc(2024, 1, 31, 3, 0)),
            utc(2024, 2, 29, 3, 0)
        );
        assert_eq!(
            schedule.next_fire_after(utc(2023, 1, 31, 3, 0)),
            utc(2023, 2, 28, 3, 0)
        );
    }

    #[test]
    fn test_monthly_fires_this_month_when_still_ahead() {
        let schedule = Schedule::Monthly {
            day: 15,
            at: at(3, 0),
        };
        assert_eq!(
            schedule.next_fire_after(utc(2024, 3, 10, 0, 0)),
            utc(2024, 3, 15, 3, 0)
        );
    }

    #[test]
    fn test_hourly_window_skips_to_opening() {
        let schedule = Schedule::HourlyWindow {
            start_hour: 9,
            end_hour: 17,
        };
        // Mid-window: next top of hour
        assert_eq!(
            schedule.next_fire_after(utc(2024, 3, 1, 10, 15)),
            utc(2024, 3, 1, 11, 0)
        );
        // After close: next morning at opening
        assert_eq!(
            schedule.next_fire_after(utc(2024, 3, 1, 17, 0)),
            utc(2024, 3, 2, 9, 0)
        );
        // Before opening: today at opening
        assert_eq!(
            schedule.next_fire_after(utc(2024, 3, 1, 4, 30)),
            utc(2024, 3, 1, 9, 0)
        );
    }

    #[test]
    fn test_period_keys() {
        let fire = utc(2024, 3, 4, 6, 30);
        assert_eq!(Schedule::Daily { at: at(6, 30) }.period_key(fire), "2024-03-04");
        assert_eq!(
            Schedule::Weekly {
                weekday: Weekday::Mon,
                at: at(6, 30)
            }
            .period_key(fire),
            "2024-W10"
        );
        assert_eq!(
            Schedule::Monthly { day: 4, at: at(6, 30) }.period_key(fire),
            "2024-03"
        );
        assert_eq!(
            Schedule::HourlyWindow {
                start_hour: 0,
                end_hour: 24
            }
            .period_key(fire),
            "2024-03-04T06"
        );
    }

    #[test]
    fn test_validate_rejects_empty_window_and_bad_day() {
        assert!(Schedule::HourlyWindow {
            start_hour: 17,
            end_hour: 9
        }
        .validate()
        .is_err());
        assert!(Schedule::Monthly { day: 0, at: at(0, 0) }.validate().is_err());
        assert!(Schedule::Monthly { day: 32, at: at(0, 0) }.validate().is_err());
    }
}
