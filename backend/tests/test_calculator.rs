//! Integration tests for the late-fee calculator
//!
//! Tests cover:
//! - Grace-period short-circuit
//! - All four calculation strategies
//! - Compounding vs. simple interest
//! - Min/max clamping (including over a raw zero)
//! - Property-based invariants

use latefee_engine_core_rs::fees::calculate;
use latefee_engine_core_rs::models::policy::{
    CalculationType, Compounding, CompoundingInterval, FeePolicy, GracePeriod, TierMatching,
    TierRule,
};
use proptest::prelude::*;

/// Helper for an enabled policy with a 7-day grace period
fn policy(calculation: CalculationType) -> FeePolicy {
    FeePolicy {
        enabled: true,
        grace: GracePeriod {
            days: 7,
            apply_on_weekends: true,
            apply_on_holidays: true,
        },
        calculation,
        min_amount: None,
        max_amount: None,
        automation: Default::default(),
    }
}

#[test]
fn test_within_grace_is_zero_with_empty_breakdown() {
    let p = policy(CalculationType::Percentage { rate: 5.0 });
    for days in 0..=7 {
        let result = calculate(100_000, days, &p);
        assert_eq!(result.amount, 0, "day {}", days);
        assert!(result.breakdown.is_empty());
        assert_eq!(result.total_days, days);
        assert_eq!(result.effective_rate, 0.0);
    }
}

#[test]
fn test_fixed_fee_ignores_principal_and_days() {
    let p = policy(CalculationType::Fixed { amount: 50_00 });
    for principal in [0, 1_000, 100_000, 10_000_000] {
        let result = calculate(principal, 8, &p);
        assert_eq!(result.amount, 50_00);
        assert_eq!(result.breakdown.len(), 1);
    }
    // More days overdue changes nothing
    assert_eq!(calculate(100_000, 400, &p).amount, 50_00);
}

#[test]
fn test_percentage_is_one_time_not_day_scaled() {
    // $1,000.00 at 5% = $50.00
    let p = policy(CalculationType::Percentage { rate: 5.0 });
    assert_eq!(calculate(100_000, 8, &p).amount, 5_000);
    assert_eq!(calculate(100_000, 80, &p).amount, 5_000);
}

#[test]
fn test_daily_percentage_simple_interest() {
    // $1,000.00 at 1%/day, 10 effective days = $100.00
    let p = policy(CalculationType::DailyPercentage {
        rate: 1.0,
        compounding: None,
    });
    let result = calculate(100_000, 17, &p);
    assert_eq!(result.amount, 10_000);
    assert_eq!(result.breakdown.len(), 1);
    assert_eq!(result.breakdown[0].days, 10);
}

#[test]
fn test_weekly_compounding_beats_simple_interest() {
    // 14 effective days at 1%/day, weekly compounding:
    // period 1 = 1000 * 0.01 * 7 = 70.00
    // period 2 = 1070 * 0.01 * 7 = 74.90
    let compound = policy(CalculationType::DailyPercentage {
        rate: 1.0,
        compounding: Some(Compounding {
            interval: CompoundingInterval::Weekly,
            max_periods: None,
            cap_at_principal: false,
        }),
    });
    let result = calculate(100_000, 21, &compound);
    assert_eq!(result.breakdown.len(), 2);
    assert_eq!(result.breakdown[0].amount, 7_000);
    assert_eq!(result.breakdown[1].amount, 7_490);
    assert_eq!(result.amount, 14_490);

    let simple = policy(CalculationType::DailyPercentage {
        rate: 1.0,
        compounding: None,
    });
    assert_eq!(calculate(100_000, 21, &simple).amount, 14_000);
    assert!(result.amount > 14_000);
}

#[test]
fn test_partial_last_compounding_period() {
    // 10 effective days, weekly compounding: one 7-day period + one 3-day tail
    let p = policy(CalculationType::DailyPercentage {
        rate: 1.0,
        compounding: Some(Compounding {
            interval: CompoundingInterval::Weekly,
            max_periods: None,
            cap_at_principal: false,
        }),
    });
    let result = calculate(100_000, 17, &p);
    assert_eq!(result.breakdown.len(), 2);
    assert_eq!(result.breakdown[0].days, 7);
    assert_eq!(result.breakdown[1].days, 3);
    // 7000 + 107000 * 0.01 * 3 = 7000 + 3210
    assert_eq!(result.amount, 10_210);
}

#[test]
fn test_tiered_cumulative_stacks_overlapping_bands() {
    let p = policy(CalculationType::Tiered {
        rules: vec![
            TierRule {
                days_from: 1,
                days_to: 0,
                amount: 10_00.0,
                is_percentage: false,
            },
            TierRule {
                days_from: 5,
                days_to: 0,
                amount: 2.0,
                is_percentage: true,
            },
        ],
        matching: TierMatching::Cumulative,
    });
    // 8 effective days: both bands match and stack
    let result = calculate(100_000, 15, &p);
    assert_eq!(result.amount, 10_00 + 2_000);
    assert_eq!(result.breakdown.len(), 2);
}

#[test]
fn test_clamp_forces_raw_results_into_range() {
    let mut p = policy(CalculationType::Percentage { rate: 5.0 });
    p.min_amount = Some(20_00);
    p.max_amount = Some(200_00);

    // Raw 5% of $10 = $0.50, clamped up to $20
    assert_eq!(calculate(1_000, 8, &p).amount, 20_00);
    // Raw 5% of $100,000 = $5,000, clamped down to $200
    assert_eq!(calculate(10_000_000, 8, &p).amount, 200_00);
    // In range: untouched
    assert_eq!(calculate(100_000, 8, &p).amount, 50_00);
}

#[test]
fn test_min_clamp_applies_over_raw_zero() {
    // No band covers 2 effective days; the floor still applies
    let mut p = policy(CalculationType::Tiered {
        rules: vec![TierRule {
            days_from: 30,
            days_to: 0,
            amount: 5.0,
            is_percentage: true,
        }],
        matching: TierMatching::Cumulative,
    });
    p.min_amount = Some(20_00);
    p.max_amount = Some(200_00);
    let result = calculate(100_000, 9, &p);
    assert_eq!(result.amount, 20_00);
    assert!(result.breakdown.is_empty());
}

#[test]
fn test_zero_principal_yields_zero_fee_and_rate() {
    let p = policy(CalculationType::Percentage { rate: 5.0 });
    let result = calculate(0, 30, &p);
    assert_eq!(result.amount, 0);
    assert_eq!(result.effective_rate, 0.0);
}

// ============================================================================
// Property-based invariants
// ============================================================================

proptest! {
    #[test]
    fn prop_grace_always_zeroes(
        principal in 0i64..10_000_000,
        grace_days in 0u32..60,
        days in 0u32..60,
        rate in 0.0f64..100.0,
    ) {
        prop_assume!(days <= grace_days);
        let mut p = policy(CalculationType::DailyPercentage { rate, compounding: None });
        p.grace.days = grace_days;
        let result = calculate(principal, days, &p);
        prop_assert_eq!(result.amount, 0);
        prop_assert!(result.breakdown.is_empty());
    }

    #[test]
    fn prop_clamp_bounds_always_hold_past_grace(
        principal in 0i64..10_000_000,
        days in 8u32..400,
        rate in 0.0f64..100.0,
        min in 0i64..10_000,
        span in 0i64..100_000,
    ) {
        let mut p = policy(CalculationType::Percentage { rate });
        p.min_amount = Some(min);
        p.max_amount = Some(min + span);
        let result = calculate(principal, days, &p);
        prop_assert!(result.amount >= min);
        prop_assert!(result.amount <= min + span);
    }

    #[test]
    fn prop_compounding_never_undercuts_simple_interest(
        principal in 1i64..10_000_000,
        days in 8u32..200,
        rate in 0.01f64..10.0,
    ) {
        let simple = policy(CalculationType::DailyPercentage { rate, compounding: None });
        let compound = policy(CalculationType::DailyPercentage {
            rate,
            compounding: Some(Compounding {
                interval: CompoundingInterval::Weekly,
                max_periods: None,
                cap_at_principal: false,
            }),
        });
        let simple_amount = calculate(principal, days, &simple).amount;
        let compound_amount = calculate(principal, days, &compound).amount;
        prop_assert!(compound_amount >= simple_amount);
    }

    #[test]
    fn prop_first_match_never_exceeds_cumulative(
        principal in 0i64..10_000_000,
        days in 8u32..100,
        flat in 0.0f64..50_000.0,
        pct in 0.0f64..50.0,
    ) {
        let rules = vec![
            TierRule { days_from: 1, days_to: 30, amount: flat, is_percentage: false },
            TierRule { days_from: 1, days_to: 0, amount: pct, is_percentage: true },
        ];
        let cumulative = policy(CalculationType::Tiered {
            rules: rules.clone(),
            matching: TierMatching::Cumulative,
        });
        let first = policy(CalculationType::Tiered {
            rules,
            matching: TierMatching::FirstMatch,
        });
        let c = calculate(principal, days, &cumulative).amount;
        let f = calculate(principal, days, &first).amount;
        prop_assert!(f <= c);
    }

    #[test]
    fn prop_result_is_deterministic(
        principal in 0i64..10_000_000,
        days in 0u32..400,
        rate in 0.0f64..100.0,
    ) {
        let p = policy(CalculationType::DailyPercentage {
            rate,
            compounding: Some(Compounding {
                interval: CompoundingInterval::Daily,
                max_periods: Some(30),
                cap_at_principal: true,
            }),
        });
        let a = calculate(principal, days, &p);
        let b = calculate(principal, days, &p);
        prop_assert_eq!(a, b);
    }
}
