//! Engine configuration.
//!
//! Defaults are what every view uses unless the serving layer overrides them through
//! the environment (`RENTFLOW_PRORATION`, `RENTFLOW_PENDING_WINDOW_MONTHS`,
//! `RENTFLOW_TREND_MONTHS`, `RENTFLOW_MAX_PREPAID_MONTHS`).

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const ENV_PRORATION: &str = "RENTFLOW_PRORATION";
pub const ENV_PENDING_WINDOW_MONTHS: &str = "RENTFLOW_PENDING_WINDOW_MONTHS";
pub const ENV_TREND_MONTHS: &str = "RENTFLOW_TREND_MONTHS";
pub const ENV_MAX_PREPAID_MONTHS: &str = "RENTFLOW_MAX_PREPAID_MONTHS";

/// How a billing period cut short by the lease end date is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProrationPolicy {
    /// Charge `monthly_rent × covered_days / full_period_days`, rounded half-up.
    #[default]
    DayCount,
    /// Charge the full monthly rent regardless of coverage.
    FullMonth,
}

impl ProrationPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day_count" | "daycount" | "days" => Some(ProrationPolicy::DayCount),
            "full_month" | "fullmonth" | "flat" => Some(ProrationPolicy::FullMonth),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    pub proration: ProrationPolicy,
    /// Unpaid entries due within this many months of today are `pending`; later ones
    /// are `upcoming`.
    pub pending_window_months: u32,
    /// Length of the trailing collection trend.
    pub trend_months: u32,
    /// Most periods an open-ended schedule is extended by to absorb prepayment.
    /// Anything paid beyond that stays on the final period as surplus.
    pub max_prepaid_months: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            proration: ProrationPolicy::DayCount,
            pending_window_months: 1,
            trend_months: 12,
            max_prepaid_months: 120,
        }
    }
}

impl ReconciliationConfig {
    /// Load from process environment, falling back to defaults per key.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, config file, test map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let proration = match lookup(ENV_PRORATION) {
            Some(raw) => ProrationPolicy::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "unknown {ENV_PRORATION}; using day_count");
                defaults.proration
            }),
            None => defaults.proration,
        };

        let pending_window_months = parse_months(
            &lookup,
            ENV_PENDING_WINDOW_MONTHS,
            defaults.pending_window_months,
            0..=120,
        );
        let trend_months =
            parse_months(&lookup, ENV_TREND_MONTHS, defaults.trend_months, 1..=120);
        let max_prepaid_months = parse_months(
            &lookup,
            ENV_MAX_PREPAID_MONTHS,
            defaults.max_prepaid_months,
            1..=1_200,
        );

        Self {
            proration,
            pending_window_months,
            trend_months,
            max_prepaid_months,
        }
    }
}

fn parse_months<F>(lookup: &F, key: &str, default: u32, range: RangeInclusive<u32>) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<u32>() {
        Ok(v) if range.contains(&v) => v,
        _ => {
            tracing::warn!(key, value = %raw, default, "invalid month count; using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = ReconciliationConfig::from_lookup(|_| None);
        assert_eq!(config, ReconciliationConfig::default());
        assert_eq!(config.proration, ProrationPolicy::DayCount);
        assert_eq!(config.trend_months, 12);
    }

    #[test]
    fn reads_overrides() {
        let config = ReconciliationConfig::from_lookup(lookup_from(&[
            (ENV_PRORATION, "full_month"),
            (ENV_PENDING_WINDOW_MONTHS, "2"),
            (ENV_TREND_MONTHS, "6"),
            (ENV_MAX_PREPAID_MONTHS, "24"),
        ]));
        assert_eq!(config.proration, ProrationPolicy::FullMonth);
        assert_eq!(config.pending_window_months, 2);
        assert_eq!(config.trend_months, 6);
        assert_eq!(config.max_prepaid_months, 24);
    }

    #[test]
    fn invalid_values_fall_back_per_key() {
        let config = ReconciliationConfig::from_lookup(lookup_from(&[
            (ENV_PRORATION, "weekly"),
            (ENV_PENDING_WINDOW_MONTHS, "-1"),
            (ENV_TREND_MONTHS, "0"),
            (ENV_MAX_PREPAID_MONTHS, "0"),
        ]));
        assert_eq!(config, ReconciliationConfig::default());
    }
}
