//! Late-fee policy document
//!
//! The policy is a versioned, per-scope JSON document. The calculation
//! strategy is a tagged union: each variant carries exactly the fields it
//! needs, so "optional field means inapplicable" ambiguity cannot occur.
//!
//! CRITICAL: All money values are i64 (cents). Rates are f64 percentages.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::triggers::Schedule;

fn default_true() -> bool {
    true
}

/// Days to wait after the due date before any fee is assessed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GracePeriod {
    /// Whole days past the due date that incur no fee
    pub days: u32,

    /// Whether fees may be assessed when the run date falls on a weekend
    #[serde(default = "default_true")]
    pub apply_on_weekends: bool,

    /// Whether fees may be assessed when the run date is a configured holiday
    #[serde(default = "default_true")]
    pub apply_on_holidays: bool,
}

impl Default for GracePeriod {
    fn default() -> Self {
        Self {
            days: 0,
            apply_on_weekends: true,
            apply_on_holidays: true,
        }
    }
}

/// Length of one compounding period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundingInterval {
    Daily,
    Weekly,
    Monthly,
}

impl CompoundingInterval {
    /// Period length in days
    pub fn days(&self) -> u32 {
        match self {
            CompoundingInterval::Daily => 1,
            CompoundingInterval::Weekly => 7,
            CompoundingInterval::Monthly => 30,
        }
    }
}

/// Compounding settings for the daily-percentage strategy
///
/// Interest compounds on principal plus previously accrued fees: each period's
/// fee is computed on the running total, then added to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compounding {
    pub interval: CompoundingInterval,

    /// Stop accruing after this many periods. `None` is accepted but leaves
    /// the accrual unbounded; validation logs a warning for it.
    #[serde(default)]
    pub max_periods: Option<u32>,

    /// Cap total accrued fees at the principal amount
    #[serde(default)]
    pub cap_at_principal: bool,
}

/// One band of a tiered fee schedule
///
/// The band covers `[days_from, days_to)` effective overdue days;
/// `days_to == 0` means open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRule {
    pub days_from: u32,

    /// Exclusive upper bound in days; 0 = open-ended
    pub days_to: u32,

    /// Percentage of principal when `is_percentage`, otherwise a flat fee in
    /// cents
    pub amount: f64,

    pub is_percentage: bool,
}

impl TierRule {
    /// Whether this band covers the given effective overdue days
    pub fn contains(&self, effective_days: u32) -> bool {
        effective_days >= self.days_from && (self.days_to == 0 || effective_days < self.days_to)
    }
}

/// How overlapping tier bands combine
///
/// `Cumulative` applies every matching band (stacking penalties).
/// `FirstMatch` applies only the first matching band in rule order, for
/// institutions that consider stacking a defect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierMatching {
    #[default]
    Cumulative,
    FirstMatch,
}

/// Late-fee calculation strategy
///
/// Tagged union: the JSON document carries a `type` discriminator and only
/// the fields of the selected variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalculationType {
    /// Flat fee regardless of principal or days overdue
    Fixed {
        /// Fee in cents
        amount: i64,
    },

    /// One-time percentage of principal, not scaled by days
    Percentage {
        /// Percent of principal (5.0 = 5%)
        rate: f64,
    },

    /// Per-day percentage of principal, optionally compounding
    DailyPercentage {
        /// Percent of principal per overdue day
        rate: f64,

        #[serde(default)]
        compounding: Option<Compounding>,
    },

    /// Banded schedule keyed by effective overdue days
    Tiered {
        rules: Vec<TierRule>,

        #[serde(default)]
        matching: TierMatching,
    },
}

/// Automation settings for scheduled batch application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Whether the orchestrator applies fees automatically on schedule
    pub auto_apply: bool,

    /// When the sweep runs
    pub schedule: Schedule,

    /// Run a dry pass first and skip the live pass if it reports errors
    #[serde(default = "default_true")]
    pub dry_run_first: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            auto_apply: false,
            schedule: Schedule::default(),
            dry_run_first: true,
        }
    }
}

/// Per-scope late-fee policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Disabled policies always calculate a zero fee
    pub enabled: bool,

    #[serde(default)]
    pub grace: GracePeriod,

    pub calculation: CalculationType,

    /// Floor in cents. Applied unconditionally once past grace, even over a
    /// raw zero (e.g. no tier matched) - a deliberate policy-level choice
    /// pending confirmation from domain owners.
    #[serde(default)]
    pub min_amount: Option<i64>,

    /// Ceiling in cents
    #[serde(default)]
    pub max_amount: Option<i64>,

    #[serde(default)]
    pub automation: AutomationConfig,
}

impl Default for FeePolicy {
    /// System default used when no document exists for a scope: late fees
    /// disabled, 5 grace days, $25 flat fee once enabled.
    fn default() -> Self {
        Self {
            enabled: false,
            grace: GracePeriod {
                days: 5,
                apply_on_weekends: true,
                apply_on_holidays: true,
            },
            calculation: CalculationType::Fixed { amount: 25_00 },
            min_amount: None,
            max_amount: None,
            automation: AutomationConfig::default(),
        }
    }
}

/// Institution-wide settings carried alongside the fee policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// IANA timezone name, informational for reporting surfaces
    pub timezone: String,

    /// Academic-calendar holidays used by the fee calendar gate
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            holidays: Vec::new(),
        }
    }
}

/// Document bookkeeping stamped by the configuration store on every update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMeta {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub updated_by: String,
}

/// The full per-scope configuration document
///
/// The engine owns the typed sections (`general`, `late_fees`, `system`).
/// The remaining sections belong to out-of-scope surfaces (receipts,
/// notifications, reporting) and are preserved verbatim through merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    pub late_fees: FeePolicy,

    #[serde(default)]
    pub receipts: serde_json::Value,

    #[serde(default)]
    pub notifications: serde_json::Value,

    #[serde(default)]
    pub reporting: serde_json::Value,

    pub system: SystemMeta,
}

impl InstitutionConfig {
    /// Documented fallback when no document is saved for any scope in the
    /// chain
    pub fn system_default(now: DateTime<Utc>) -> Self {
        Self {
            general: GeneralConfig::default(),
            late_fees: FeePolicy::default(),
            receipts: serde_json::Value::Null,
            notifications: serde_json::Value::Null,
            reporting: serde_json::Value::Null,
            system: SystemMeta {
                version: 0,
                last_updated: now,
                updated_by: "system".to_string(),
            },
        }
    }
}

/// Configuration scope: institution-wide or one campus
///
/// Resolution walks from the most specific scope to the least specific, then
/// falls back to the system default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigScope {
    #[serde(default)]
    pub institution_id: Option<String>,

    #[serde(default)]
    pub campus_id: Option<String>,
}

impl ConfigScope {
    pub fn institution(institution_id: impl Into<String>) -> Self {
        Self {
            institution_id: Some(institution_id.into()),
            campus_id: None,
        }
    }

    pub fn campus(institution_id: impl Into<String>, campus_id: impl Into<String>) -> Self {
        Self {
            institution_id: Some(institution_id.into()),
            campus_id: Some(campus_id.into()),
        }
    }

    /// Scope for a campus with no institution qualifier (batch runs address
    /// campuses directly)
    pub fn for_campus(campus_id: impl Into<String>) -> Self {
        Self {
            institution_id: None,
            campus_id: Some(campus_id.into()),
        }
    }

    /// Stable key for storage
    pub fn scope_key(&self) -> String {
        match (&self.institution_id, &self.campus_id) {
            (Some(inst), Some(campus)) => format!("campus:{}:{}", inst, campus),
            (None, Some(campus)) => format!("campus:{}", campus),
            (Some(inst), None) => format!("institution:{}", inst),
            (None, None) => "default".to_string(),
        }
    }

    /// Lookup order, most specific first, ending with the default scope
    pub fn scope_chain(&self) -> Vec<ConfigScope> {
        let mut chain = Vec::new();
        if self.campus_id.is_some() {
            chain.push(self.clone());
        }
        if self.institution_id.is_some() {
            chain.push(ConfigScope {
                institution_id: self.institution_id.clone(),
                campus_id: None,
            });
        }
        chain.push(ConfigScope::default());
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculation_type_round_trips_tagged_json() {
        let json = r#"{
            "type": "daily_percentage",
            "rate": 1.5,
            "compounding": {
                "interval": "weekly",
                "max_periods": 12,
                "cap_at_principal": true
            }
        }"#;
        let calc: CalculationType = serde_json::from_str(json).unwrap();
        match &calc {
            CalculationType::DailyPercentage { rate, compounding } => {
                assert_eq!(*rate, 1.5);
                let c = compounding.as_ref().unwrap();
                assert_eq!(c.interval, CompoundingInterval::Weekly);
                assert_eq!(c.max_periods, Some(12));
                assert!(c.cap_at_principal);
            }
            other => panic!("wrong variant: {:?}", other),
        }
        let back = serde_json::to_value(&calc).unwrap();
        assert_eq!(back["type"], "daily_percentage");
    }

    #[test]
    fn test_tiered_defaults_to_cumulative() {
        let json = r#"{"type": "tiered", "rules": []}"#;
        let calc: CalculationType = serde_json::from_str(json).unwrap();
        match calc {
            CalculationType::Tiered { matching, .. } => {
                assert_eq!(matching, TierMatching::Cumulative)
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_tier_rule_window() {
        let rule = TierRule {
            days_from: 10,
            days_to: 20,
            amount: 5.0,
            is_percentage: true,
        };
        assert!(!rule.contains(9));
        assert!(rule.contains(10));
        assert!(rule.contains(19));
        assert!(!rule.contains(20));

        let open = TierRule {
            days_from: 30,
            days_to: 0,
            amount: 100_00.0,
            is_percentage: false,
        };
        assert!(open.contains(30));
        assert!(open.contains(5000));
        assert!(!open.contains(29));
    }

    #[test]
    fn test_scope_chain_most_specific_first() {
        let scope = ConfigScope::campus("inst-1", "campus-9");
        let chain = scope.scope_chain();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].scope_key(), "campus:inst-1:campus-9");
        assert_eq!(chain[1].scope_key(), "institution:inst-1");
        assert_eq!(chain[2].scope_key(), "default");
    }

    #[test]
    fn test_scope_keys_never_collide_across_kinds() {
        let a = ConfigScope::institution("x");
        let b = ConfigScope::for_campus("x");
        assert_ne!(a.scope_key(), b.scope_key());
    }

    #[test]
    fn test_default_policy_is_disabled() {
        let policy = FeePolicy::default();
        assert!(!policy.enabled);
        assert_eq!(policy.grace.days, 5);
    }
}
