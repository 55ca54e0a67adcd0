//! Late-fee calculator
//!
//! Implements the four calculation strategies over an immutable policy
//! snapshot, producing the charged amount plus a per-period audit breakdown.
//!
//! CRITICAL: Money is i64 cents. Intermediate arithmetic runs in f64 cents
//! and is rounded exactly once, at the end (per-period breakdown entries are
//! rounded for display only; the running total stays unrounded).

use serde::{Deserialize, Serialize};

use crate::models::policy::{
    CalculationType, Compounding, FeePolicy, TierMatching, TierRule,
};

/// One line of the audit breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    /// 1-based period (or rule) index
    pub period: u32,

    /// Days covered by this entry
    pub days: u32,

    /// Rate applied, percent (0 for flat entries)
    pub rate: f64,

    /// Entry amount in cents
    pub amount: i64,

    pub description: String,
}

/// Result of one late-fee calculation
///
/// Immutable; produced fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateFeeResult {
    /// Final amount in cents, clamped and rounded
    pub amount: i64,

    pub breakdown: Vec<BreakdownEntry>,

    /// Days overdue as passed in (not reduced by grace)
    pub total_days: u32,

    /// `amount / principal` as a percentage, 2 decimals; 0 when principal is 0
    pub effective_rate: f64,
}

impl LateFeeResult {
    fn zero(total_days: u32) -> Self {
        Self {
            amount: 0,
            breakdown: Vec::new(),
            total_days,
            effective_rate: 0.0,
        }
    }
}

/// Calculate the late fee for an overdue principal
///
/// Pure and total: no I/O, deterministic, never fails on well-formed input.
/// Policy validation happens upstream in the configuration store; a malformed
/// policy here is a programming error.
///
/// # Arguments
///
/// * `principal` - outstanding principal in cents, >= 0
/// * `days_overdue` - whole days past the due date, >= 0
/// * `policy` - immutable policy snapshot
pub fn calculate(principal: i64, days_overdue: u32, policy: &FeePolicy) -> LateFeeResult {
    debug_assert!(principal >= 0, "principal must be non-negative");

    if !policy.enabled {
        return LateFeeResult::zero(days_overdue);
    }

    // Inside the grace window nothing is owed; the clamp below does not apply.
    if days_overdue <= policy.grace.days {
        return LateFeeResult::zero(days_overdue);
    }
    let effective_days = days_overdue - policy.grace.days;

    let mut breakdown = Vec::new();
    let raw = match &policy.calculation {
        CalculationType::Fixed { amount } => {
            breakdown.push(BreakdownEntry {
                period: 1,
                days: effective_days,
                rate: 0.0,
                amount: *amount,
                description: "Fixed late fee".to_string(),
            });
            *amount as f64
        }

        CalculationType::Percentage { rate } => {
            let fee = principal as f64 * rate / 100.0;
            breakdown.push(BreakdownEntry {
                period: 1,
                days: effective_days,
                rate: *rate,
                amount: round_cents(fee),
                description: format!("One-time fee at {}% of principal", rate),
            });
            fee
        }

        CalculationType::DailyPercentage {
            rate,
            compounding: None,
        } => {
            // Simple interest: principal * rate * effective days
            let fee = principal as f64 * rate / 100.0 * effective_days as f64;
            breakdown.push(BreakdownEntry {
                period: 1,
                days: effective_days,
                rate: *rate,
                amount: round_cents(fee),
                description: format!("{}%/day over {} days", rate, effective_days),
            });
            fee
        }

        CalculationType::DailyPercentage {
            rate,
            compounding: Some(compounding),
        } => accrue_compound(principal, effective_days, *rate, compounding, &mut breakdown),

        CalculationType::Tiered { rules, matching } => {
            accrue_tiers(principal, effective_days, rules, *matching, &mut breakdown)
        }
    };

    let mut amount = round_cents(raw);

    // Bounds apply unconditionally once past grace, even over a raw zero.
    if let Some(min) = policy.min_amount {
        amount = amount.max(min);
    }
    if let Some(max) = policy.max_amount {
        amount = amount.min(max);
    }

    let effective_rate = if principal > 0 {
        round_percent(amount as f64 / principal as f64 * 100.0)
    } else {
        0.0
    };

    LateFeeResult {
        amount,
        breakdown,
        total_days: days_overdue,
        effective_rate,
    }
}

/// Compounding accrual: partition effective days into consecutive periods of
/// the interval length; each period's fee is computed on principal plus fees
/// accrued so far, then folded into the base for the next period.
fn accrue_compound(
    principal: i64,
    effective_days: u32,
    rate: f64,
    compounding: &Compounding,
    breakdown: &mut Vec<BreakdownEntry>,
) -> f64 {
    let period_len = compounding.interval.days();
    let mut remaining = effective_days;
    let mut base = principal as f64;
    let mut total = 0.0;
    let mut period = 0u32;

    while remaining > 0 {
        if let Some(max_periods) = compounding.max_periods {
            if period >= max_periods {
                break;
            }
        }
        let days = remaining.min(period_len);
        let fee = base * rate / 100.0 * days as f64;
        period += 1;
        breakdown.push(BreakdownEntry {
            period,
            days,
            rate,
            amount: round_cents(fee),
            description: format!("Compounding period {} ({} days at {}%/day)", period, days, rate),
        });
        total += fee;
        base += fee;
        remaining -= days;

        if compounding.cap_at_principal && total >= principal as f64 {
            total = principal as f64;
            break;
        }
    }

    total
}

/// Tiered accrual over every band covering the effective days (cumulative),
/// or only the first covering band in rule order (first-match).
fn accrue_tiers(
    principal: i64,
    effective_days: u32,
    rules: &[TierRule],
    matching: TierMatching,
    breakdown: &mut Vec<BreakdownEntry>,
) -> f64 {
    let mut total = 0.0;

    for rule in rules {
        if !rule.contains(effective_days) {
            continue;
        }
        let (fee, rate, description) = if rule.is_percentage {
            (
                principal as f64 * rule.amount / 100.0,
                rule.amount,
                format!("Tier {} at {}% of principal", tier_window(rule), rule.amount),
            )
        } else {
            (
                rule.amount,
                0.0,
                format!("Tier {} flat fee", tier_window(rule)),
            )
        };
        breakdown.push(BreakdownEntry {
            period: breakdown.len() as u32 + 1,
            days: effective_days,
            rate,
            amount: round_cents(fee),
            description,
        });
        total += fee;

        if matching == TierMatching::FirstMatch {
            break;
        }
    }

    total
}

fn tier_window(rule: &TierRule) -> String {
    if rule.days_to == 0 {
        format!("{}+ days", rule.days_from)
    } else {
        format!("{}-{} days", rule.days_from, rule.days_to)
    }
}

/// Round f64 cents to i64 cents; a non-finite value indicates a malformed
/// policy slipped past validation and degrades to zero in release builds.
fn round_cents(raw: f64) -> i64 {
    debug_assert!(raw.is_finite(), "fee arithmetic produced a non-finite value");
    if raw.is_finite() {
        raw.round() as i64
    } else {
        0
    }
}

fn round_percent(raw: f64) -> f64 {
    (raw * 100.0).round() / 100.0
}
