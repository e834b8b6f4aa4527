//! Collection analytics: monthly trend and per-property performance.
//!
//! Buckets with no activity are emitted with zero amounts so chart axes stay
//! continuous. Collected amounts are keyed by settlement date, never creation date.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rentflow_core::PropertyId;
use rentflow_core::calendar::MonthKey;
use rentflow_leasing::{Payment, PaymentStatus};

use crate::ledger::{LedgerBook, MetricsScope};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendPoint {
    pub month: MonthKey,
    /// Completed payments settled in the month.
    pub collected: u64,
    /// Rent falling due in the month.
    pub expected: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPerformance {
    /// `None` collects leases whose unit maps to no known property.
    pub property_id: Option<PropertyId>,
    pub lease_count: u32,
    pub completed: u64,
    pub pending: u64,
    pub outstanding: u64,
    pub advance_credit: u64,
}

impl PropertyPerformance {
    fn empty(property_id: Option<PropertyId>) -> Self {
        Self {
            property_id,
            lease_count: 0,
            completed: 0,
            pending: 0,
            outstanding: 0,
            advance_credit: 0,
        }
    }
}

/// Payment amounts by outcome within a scope's date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionTotals {
    pub completed: u64,
    pub pending: u64,
    pub failed: u64,
}

impl CollectionTotals {
    /// Count `payment` if its effective date falls inside the scope's window.
    pub fn add(&mut self, payment: &Payment, scope: &MetricsScope) {
        if !scope.covers_date(payment.effective_date().date_naive()) {
            return;
        }
        match payment.status {
            PaymentStatus::Completed => self.completed = self.completed.saturating_add(payment.amount),
            PaymentStatus::Pending | PaymentStatus::Processing => {
                self.pending = self.pending.saturating_add(payment.amount)
            }
            PaymentStatus::Failed => self.failed = self.failed.saturating_add(payment.amount),
            PaymentStatus::Refunded => {}
        }
    }
}

impl LedgerBook {
    pub fn collection_totals(&self, scope: &MetricsScope) -> CollectionTotals {
        let mut totals = CollectionTotals::default();
        for r in self.leases_in(scope) {
            for payment in &r.payments {
                totals.add(payment, scope);
            }
        }
        totals
    }

    /// Trailing monthly trend ending with the reference month.
    pub fn monthly_trend(&self, scope: &MetricsScope) -> Vec<MonthlyTrendPoint> {
        let mut buckets: BTreeMap<MonthKey, MonthlyTrendPoint> = MonthKey::of(self.today())
            .trailing(self.config().trend_months)
            .into_iter()
            .map(|month| {
                (
                    month,
                    MonthlyTrendPoint {
                        month,
                        collected: 0,
                        expected: 0,
                    },
                )
            })
            .collect();

        for r in self.leases_in(scope) {
            for payment in r.payments.iter().filter(|p| p.is_allocatable()) {
                let settled = payment.effective_date().date_naive();
                if !scope.covers_date(settled) {
                    continue;
                }
                if let Some(point) = buckets.get_mut(&MonthKey::of(settled)) {
                    point.collected = point.collected.saturating_add(payment.amount);
                }
            }
            for entry in &r.entries {
                if let Some(point) = buckets.get_mut(&MonthKey::of(entry.due_date)) {
                    point.expected = point.expected.saturating_add(entry.amount_due);
                }
            }
        }

        buckets.into_values().collect()
    }

    /// One row per known property (or only the scoped one), zero rows included.
    pub fn property_performance(&self, scope: &MetricsScope) -> Vec<PropertyPerformance> {
        let mut rows: BTreeMap<Option<PropertyId>, PropertyPerformance> = match scope.property_id {
            Some(property_id) => BTreeMap::from([(
                Some(property_id),
                PropertyPerformance::empty(Some(property_id)),
            )]),
            None => self
                .properties()
                .iter()
                .map(|p| (Some(*p), PropertyPerformance::empty(Some(*p))))
                .collect(),
        };

        // Unmapped leases get their own row so the rows still add up to the totals.
        for r in self.leases_in(scope) {
            let row = rows
                .entry(r.property_id)
                .or_insert_with(|| PropertyPerformance::empty(r.property_id));
            let mut totals = CollectionTotals::default();
            for payment in &r.payments {
                totals.add(payment, scope);
            }
            row.lease_count += 1;
            row.completed = row.completed.saturating_add(totals.completed);
            row.pending = row.pending.saturating_add(totals.pending);
            row.outstanding = row.outstanding.saturating_add(r.position.outstanding_balance);
            row.advance_credit = row.advance_credit.saturating_add(r.position.advance_credit);
        }

        rows.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rentflow_core::{LeaseId, PaymentId};

    #[test]
    fn totals_respect_window_and_status() {
        let scope = MetricsScope::all().between(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        );
        let lease_id = LeaseId::new();
        let make = |status, day: u32, month: u32, paid: bool| {
            let at = Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap();
            Payment {
                id: PaymentId::new(),
                lease_id,
                amount: 100,
                status,
                paid_date: paid.then_some(at),
                created_at: at,
            }
        };

        let mut totals = CollectionTotals::default();
        for p in [
            make(PaymentStatus::Completed, 20, 1, true),
            make(PaymentStatus::Completed, 10, 2, true),
            make(PaymentStatus::Processing, 11, 2, false),
            make(PaymentStatus::Pending, 1, 3, false),
            make(PaymentStatus::Failed, 29, 2, false),
            make(PaymentStatus::Refunded, 15, 2, true),
            // Created in January, settled in February: counts by settlement.
            Payment {
                paid_date: Some(Utc.with_ymd_and_hms(2024, 2, 2, 9, 0, 0).unwrap()),
                ..make(PaymentStatus::Completed, 25, 1, false)
            },
            // Created in February, settled in March: outside the window.
            Payment {
                paid_date: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
                ..make(PaymentStatus::Completed, 28, 2, false)
            },
        ] {
            totals.add(&p, &scope);
        }
        assert_eq!(
            totals,
            CollectionTotals {
                completed: 200,
                pending: 100,
                failed: 100
            }
        );
    }

    #[test]
    fn trend_buckets_by_settlement_date() {
        use crate::config::ReconciliationConfig;
        use crate::ledger::PortfolioInput;
        use rentflow_core::{TenantId, UnitId};
        use rentflow_leasing::{Lease, LeaseStatus};

        let lease = Lease {
            id: LeaseId::new(),
            unit_id: UnitId::new(),
            tenant_id: TenantId::new(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            end_date: None,
            monthly_rent: 500_000,
            deposit: 0,
            payment_day_of_month: 5,
            status: LeaseStatus::Active,
        };
        let payment = Payment {
            id: PaymentId::new(),
            lease_id: lease.id,
            amount: 500_000,
            status: PaymentStatus::Completed,
            paid_date: Some(Utc.with_ymd_and_hms(2024, 2, 3, 10, 0, 0).unwrap()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 28, 10, 0, 0).unwrap(),
        };
        let input = PortfolioInput {
            leases: vec![lease],
            payments: vec![payment],
            units: vec![],
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let book = LedgerBook::build(&input, now, &ReconciliationConfig::default());

        let trend = book.monthly_trend(&MetricsScope::all());
        let collected = |month: &str| {
            trend
                .iter()
                .find(|p| p.month.to_string() == month)
                .map(|p| p.collected)
        };
        assert_eq!(collected("2024-01"), Some(0));
        assert_eq!(collected("2024-02"), Some(500_000));
        assert_eq!(collected("2024-03"), Some(0));
    }
}
