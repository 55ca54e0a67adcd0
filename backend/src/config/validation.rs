//! Policy document validation
//!
//! Pre-persist checks ensuring a merged document is well-formed:
//! - Rates are finite and within percentage bounds
//! - Flat amounts are non-negative
//! - Tier windows are ordered and non-degenerate
//! - Min/max clamp bounds are consistent
//!
//! All violations are collected and returned together; nothing is persisted
//! when any violation exists. Unbounded compounding is a warning, not an
//! error.

use serde::Serialize;

use crate::models::policy::{CalculationType, FeePolicy, InstitutionConfig};

/// A single validation violation, addressed by document path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Validate a full configuration document
pub fn validate_document(document: &InstitutionConfig) -> Result<(), Vec<Violation>> {
    validate_policy(&document.late_fees)
}

/// Validate a late-fee policy
///
/// Returns every violation found, not just the first.
pub fn validate_policy(policy: &FeePolicy) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    check_calculation(&policy.calculation, &mut violations);
    check_bounds(policy, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_calculation(calculation: &CalculationType, violations: &mut Vec<Violation>) {
    const PATH: &str = "late_fees.calculation";

    match calculation {
        CalculationType::Fixed { amount } => {
            if *amount < 0 {
                violations.push(Violation::new(
                    format!("{}.amount", PATH),
                    "fixed fee must be non-negative",
                ));
            }
        }

        CalculationType::Percentage { rate } => {
            check_rate(*rate, &format!("{}.rate", PATH), violations);
        }

        CalculationType::DailyPercentage { rate, compounding } => {
            check_rate(*rate, &format!("{}.rate", PATH), violations);
            if let Some(compounding) = compounding {
                match compounding.max_periods {
                    Some(0) => violations.push(Violation::new(
                        format!("{}.compounding.max_periods", PATH),
                        "max_periods of 0 would never accrue; omit compounding instead",
                    )),
                    Some(_) => {}
                    None => {
                        tracing::warn!(
                            "compounding configured without max_periods; accrual is unbounded"
                        );
                    }
                }
            }
        }

        CalculationType::Tiered { rules, .. } => {
            if rules.is_empty() {
                violations.push(Violation::new(
                    format!("{}.rules", PATH),
                    "tiered calculation requires at least one rule",
                ));
            }
            for (idx, rule) in rules.iter().enumerate() {
                let path = format!("{}.rules[{}]", PATH, idx);
                if rule.days_to != 0 && rule.days_to <= rule.days_from {
                    violations.push(Violation::new(
                        format!("{}.days_to", path),
                        "days_to must be 0 (open-ended) or greater than days_from",
                    ));
                }
                if rule.is_percentage {
                    check_rate(rule.amount, &format!("{}.amount", path), violations);
                } else if !rule.amount.is_finite() || rule.amount < 0.0 {
                    violations.push(Violation::new(
                        format!("{}.amount", path),
                        "flat tier fee must be a non-negative amount",
                    ));
                }
            }
        }
    }
}

fn check_rate(rate: f64, path: &str, violations: &mut Vec<Violation>) {
    if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
        violations.push(Violation::new(
            path,
            "rate must be a percentage between 0 and 100",
        ));
    }
}

fn check_bounds(policy: &FeePolicy, violations: &mut Vec<Violation>) {
    if let Some(min) = policy.min_amount {
        if min < 0 {
            violations.push(Violation::new(
                "late_fees.min_amount",
                "minimum amount must be non-negative",
            ));
        }
    }
    if let Some(max) = policy.max_amount {
        if max < 0 {
            violations.push(Violation::new(
                "late_fees.max_amount",
                "maximum amount must be non-negative",
            ));
        }
    }
    if let (Some(min), Some(max)) = (policy.min_amount, policy.max_amount) {
        if min > max {
            violations.push(Violation::new(
                "late_fees.min_amount",
                "minimum amount exceeds maximum amount",
            ));
        }
    }
}
