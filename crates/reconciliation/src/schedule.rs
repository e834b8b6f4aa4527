//! Schedule generation: lease terms → ordered, contiguous monthly billing periods.
//!
//! Periods are anchored on the lease start date: period `k` (1-based) starts at
//! `start_date + (k - 1)` calendar months and ends the day before period `k + 1`
//! starts. Rent for period `k` is due on `payment_day_of_month` of the month containing
//! its start, clamped to the month's last day.
//!
//! Fixed-term leases run to `end_date` inclusive; the final period is cut at the end
//! date and charged per [`ProrationPolicy`]. Open-ended leases run to one period
//! beyond the reference instant, plus at most `max_prepaid_months` further periods
//! when completed payments exceed the charges so far.
//!
//! The total charge of a schedule must fit in `u64`; otherwise the lease is rejected
//! with [`ReconciliationError::AmountOverflow`].

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rentflow_core::LeaseId;
use rentflow_core::calendar::{add_months, clamp_day, days_between};
use rentflow_leasing::Lease;

use crate::config::{ProrationPolicy, ReconciliationConfig};
use crate::error::{ReconciliationError, ReconciliationResult};
use crate::status::EntryStatus;

/// One billing period's expected charge and settlement state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub lease_id: LeaseId,
    pub payment_number: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    /// Charge in smallest currency unit.
    pub amount_due: u64,
    pub paid_amount: u64,
    pub is_paid: bool,
    pub status: EntryStatus,
    /// Whole days past due; zero unless the entry is in arrears.
    pub days_overdue: u32,
}

impl ScheduleEntry {
    /// Amount still owed on this entry.
    pub fn remaining(&self) -> u64 {
        self.amount_due.saturating_sub(self.paid_amount)
    }

    /// Amount paid beyond the charge (only the final entry of a fixed term can carry it).
    pub fn surplus(&self) -> u64 {
        self.paid_amount.saturating_sub(self.amount_due)
    }

    pub fn covered_days(&self) -> i64 {
        days_between(self.period_start, self.period_end) + 1
    }
}

/// Generate the unallocated schedule for a lease as of `now`.
pub fn generate_schedule(
    lease: &Lease,
    now: DateTime<Utc>,
    config: &ReconciliationConfig,
) -> ReconciliationResult<Vec<ScheduleEntry>> {
    generate_schedule_covering(lease, now, config, 0)
}

/// Generate the schedule, extending an open-ended lease with further future periods
/// until the total charge reaches `min_total_due` or the extension hits
/// `config.max_prepaid_months`.
///
/// Used by the allocator's caller so that prepayment on a month-to-month lease lands
/// on real periods. Fixed-term leases are never extended past `end_date`.
pub fn generate_schedule_covering(
    lease: &Lease,
    now: DateTime<Utc>,
    config: &ReconciliationConfig,
    min_total_due: u64,
) -> ReconciliationResult<Vec<ScheduleEntry>> {
    lease
        .validate_terms()
        .map_err(|e| ReconciliationError::invalid_terms(lease.id, e.to_string()))?;

    let builder = PeriodBuilder {
        lease,
        proration: config.proration,
    };
    let today = now.date_naive();

    let mut entries = Vec::new();
    let mut total: u64 = 0;
    let mut index: u32 = 0;
    while let Some(entry) = builder.period(index)? {
        let started_by_today = entry.period_start <= today;
        total = add_charge(lease, total, &entry)?;
        entries.push(entry);
        index += 1;

        if lease.is_open_ended() && !started_by_today {
            // First period starting after today: one period beyond the reference instant.
            break;
        }
    }

    if lease.is_open_ended() && lease.monthly_rent > 0 {
        let mut extended: u32 = 0;
        while total < min_total_due && extended < config.max_prepaid_months {
            let Some(entry) = builder.period(index)? else {
                break;
            };
            total = add_charge(lease, total, &entry)?;
            entries.push(entry);
            index += 1;
            extended += 1;
        }
        if total < min_total_due {
            tracing::debug!(
                lease_id = %lease.id,
                extended,
                excess = min_total_due - total,
                "prepayment beyond extension cap kept as surplus"
            );
        }
    }

    tracing::trace!(lease_id = %lease.id, periods = entries.len(), "schedule generated");
    Ok(entries)
}

fn add_charge(lease: &Lease, total: u64, entry: &ScheduleEntry) -> ReconciliationResult<u64> {
    total
        .checked_add(entry.amount_due)
        .ok_or_else(|| ReconciliationError::overflow(lease.id, "scheduled charges"))
}

struct PeriodBuilder<'a> {
    lease: &'a Lease,
    proration: ProrationPolicy,
}

impl PeriodBuilder<'_> {
    /// Period at zero-based `index`, or `None` once past a fixed term's end date.
    fn period(&self, index: u32) -> ReconciliationResult<Option<ScheduleEntry>> {
        let lease = self.lease;
        let period_start = add_months(lease.start_date, index)?;

        if let Some(end) = lease.end_date {
            if period_start > end {
                return Ok(None);
            }
        }

        let natural_end = add_months(lease.start_date, index + 1)?
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| ReconciliationError::invalid_terms(lease.id, "period end underflow"))?;

        let period_end = match lease.end_date {
            Some(end) if end < natural_end => end,
            _ => natural_end,
        };

        let due_date = clamp_day(
            period_start.year(),
            period_start.month(),
            lease.payment_day_of_month,
        )
        .ok_or_else(|| ReconciliationError::invalid_terms(lease.id, "due date out of range"))?;

        let amount_due = if period_end < natural_end {
            self.prorated(period_start, period_end, natural_end)
        } else {
            lease.monthly_rent
        };

        Ok(Some(ScheduleEntry {
            lease_id: lease.id,
            payment_number: index + 1,
            period_start,
            period_end,
            due_date,
            amount_due,
            paid_amount: 0,
            is_paid: false,
            status: EntryStatus::Upcoming,
            days_overdue: 0,
        }))
    }

    fn prorated(&self, start: NaiveDate, end: NaiveDate, natural_end: NaiveDate) -> u64 {
        match self.proration {
            ProrationPolicy::FullMonth => self.lease.monthly_rent,
            ProrationPolicy::DayCount => {
                let covered = (days_between(start, end) + 1) as u128;
                let full = (days_between(start, natural_end) + 1) as u128;
                let rent = self.lease.monthly_rent as u128;
                // Round half-up.
                ((rent * covered * 2 + full) / (full * 2)) as u64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rentflow_core::{TenantId, UnitId};
    use rentflow_leasing::LeaseStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn test_lease(start: NaiveDate, end: Option<NaiveDate>, day: u32) -> Lease {
        Lease {
            id: LeaseId::new(),
            unit_id: UnitId::new(),
            tenant_id: TenantId::new(),
            start_date: start,
            end_date: end,
            monthly_rent: 500_000,
            deposit: 0,
            payment_day_of_month: day,
            status: LeaseStatus::Active,
        }
    }

    #[test]
    fn fixed_term_runs_to_end_date() {
        let lease = test_lease(date(2024, 1, 5), Some(date(2024, 7, 4)), 5);
        let entries =
            generate_schedule(&lease, at(2024, 1, 1), &ReconciliationConfig::default()).unwrap();

        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].period_start, date(2024, 1, 5));
        assert_eq!(entries[0].period_end, date(2024, 2, 4));
        assert_eq!(entries[0].due_date, date(2024, 1, 5));
        assert_eq!(entries[5].period_end, date(2024, 7, 4));
        assert!(entries.iter().all(|e| e.amount_due == 500_000));
        assert_eq!(
            entries.iter().map(|e| e.payment_number).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn due_day_clamps_to_short_months() {
        let lease = test_lease(date(2024, 1, 1), Some(date(2024, 4, 30)), 31);
        let entries =
            generate_schedule(&lease, at(2024, 1, 1), &ReconciliationConfig::default()).unwrap();

        let due: Vec<NaiveDate> = entries.iter().map(|e| e.due_date).collect();
        assert_eq!(
            due,
            vec![
                date(2024, 1, 31),
                date(2024, 2, 29),
                date(2024, 3, 31),
                date(2024, 4, 30)
            ]
        );
    }

    #[test]
    fn month_end_anchor_does_not_drift() {
        let lease = test_lease(date(2023, 1, 31), Some(date(2023, 5, 30)), 1);
        let entries =
            generate_schedule(&lease, at(2023, 1, 1), &ReconciliationConfig::default()).unwrap();

        let starts: Vec<NaiveDate> = entries.iter().map(|e| e.period_start).collect();
        assert_eq!(
            starts,
            vec![
                date(2023, 1, 31),
                date(2023, 2, 28),
                date(2023, 3, 31),
                date(2023, 4, 30)
            ]
        );
        assert_eq!(entries[0].period_end, date(2023, 2, 27));
        assert_eq!(entries[3].period_end, date(2023, 5, 30));
        assert_eq!(entries[3].amount_due, 500_000);
    }

    #[test]
    fn truncated_final_period_is_prorated_by_day_count() {
        // Final period Mar 1..Mar 15 out of a 31-day March period.
        let lease = test_lease(date(2024, 1, 1), Some(date(2024, 3, 15)), 1);
        let entries =
            generate_schedule(&lease, at(2024, 1, 1), &ReconciliationConfig::default()).unwrap();

        assert_eq!(entries.len(), 3);
        let last = &entries[2];
        assert_eq!(last.period_start, date(2024, 3, 1));
        assert_eq!(last.period_end, date(2024, 3, 15));
        assert_eq!(last.covered_days(), 15);
        // 500_000 × 15 / 31 = 241_935.48 → 241_935
        assert_eq!(last.amount_due, 241_935);
    }

    #[test]
    fn full_month_policy_charges_truncated_period_in_full() {
        let lease = test_lease(date(2024, 1, 1), Some(date(2024, 3, 15)), 1);
        let config = ReconciliationConfig {
            proration: ProrationPolicy::FullMonth,
            ..ReconciliationConfig::default()
        };
        let entries = generate_schedule(&lease, at(2024, 1, 1), &config).unwrap();
        assert_eq!(entries[2].amount_due, 500_000);
    }

    #[test]
    fn open_ended_stops_one_period_beyond_now() {
        let lease = test_lease(date(2024, 1, 5), None, 5);
        let entries =
            generate_schedule(&lease, at(2024, 3, 10), &ReconciliationConfig::default()).unwrap();

        // Periods starting Jan 5, Feb 5, Mar 5 have begun; Apr 5 is the one beyond.
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3].period_start, date(2024, 4, 5));
    }

    #[test]
    fn future_open_ended_lease_has_a_single_period() {
        let lease = test_lease(date(2024, 6, 1), None, 1);
        let entries =
            generate_schedule(&lease, at(2024, 3, 10), &ReconciliationConfig::default()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn open_ended_extends_to_cover_prepayment() {
        let lease = test_lease(date(2024, 1, 5), None, 5);
        let entries = generate_schedule_covering(
            &lease,
            at(2024, 1, 10),
            &ReconciliationConfig::default(),
            2_100_000,
        )
        .unwrap();
        // 2 periods by horizon, extended to 5 to reach 2.1M.
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn extension_stops_at_the_prepaid_cap() {
        let lease = Lease {
            monthly_rent: 100,
            ..test_lease(date(2024, 1, 5), None, 5)
        };
        let config = ReconciliationConfig::default();
        let entries =
            generate_schedule_covering(&lease, at(2024, 1, 10), &config, 50_000_000).unwrap();

        // 2 periods by horizon plus the capped extension.
        assert_eq!(entries.len(), 2 + config.max_prepaid_months as usize);

        let tiny = Lease {
            monthly_rent: 1,
            ..test_lease(date(2024, 1, 5), None, 5)
        };
        let capped = ReconciliationConfig {
            max_prepaid_months: 12,
            ..ReconciliationConfig::default()
        };
        let entries = generate_schedule_covering(&tiny, at(2024, 1, 10), &capped, 4_000_000).unwrap();
        assert_eq!(entries.len(), 14);
    }

    #[test]
    fn overflowing_charges_are_rejected() {
        let lease = Lease {
            monthly_rent: u64::MAX,
            ..test_lease(date(2024, 1, 5), Some(date(2024, 4, 4)), 5)
        };
        assert!(matches!(
            generate_schedule(&lease, at(2024, 1, 10), &ReconciliationConfig::default()),
            Err(ReconciliationError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn fixed_term_is_never_extended() {
        let lease = test_lease(date(2024, 1, 5), Some(date(2024, 3, 4)), 5);
        let entries = generate_schedule_covering(
            &lease,
            at(2024, 1, 10),
            &ReconciliationConfig::default(),
            10_000_000,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn invalid_terms_are_reported_per_lease() {
        let lease = test_lease(date(2024, 1, 5), Some(date(2024, 1, 1)), 5);
        let err = generate_schedule(&lease, at(2024, 1, 10), &ReconciliationConfig::default())
            .unwrap_err();
        match err {
            ReconciliationError::InvalidLeaseTerms { lease_id, .. } => assert_eq!(lease_id, lease.id),
            other => panic!("Expected InvalidLeaseTerms, got {other:?}"),
        }

        let bad_day = test_lease(date(2024, 1, 5), None, 32);
        assert!(matches!(
            generate_schedule(&bad_day, at(2024, 1, 10), &ReconciliationConfig::default()),
            Err(ReconciliationError::InvalidLeaseTerms { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: periods never overlap and never leave gaps, numbering is
        /// sequential, and a fixed term is covered exactly.
        #[test]
        fn periods_are_contiguous(
            start_offset in 0u64..3_000,
            term_days in prop::option::of(1u64..1_500),
            day in 1u32..=31,
            now_offset in 0u64..4_000,
        ) {
            let base = date(2020, 1, 1);
            let start = base + Days::new(start_offset);
            let end = term_days.map(|d| start + Days::new(d));
            let lease = test_lease(start, end, day);
            let now = (base + Days::new(now_offset)).and_hms_opt(0, 0, 0).unwrap().and_utc();

            let entries = generate_schedule(&lease, now, &ReconciliationConfig::default()).unwrap();
            prop_assert!(!entries.is_empty());
            prop_assert_eq!(entries[0].period_start, start);

            for (i, pair) in entries.windows(2).enumerate() {
                prop_assert_eq!(pair[0].period_end + Days::new(1), pair[1].period_start);
                prop_assert_eq!(pair[0].payment_number as usize, i + 1);
            }
            for e in &entries {
                prop_assert!(e.period_start <= e.period_end);
                prop_assert_eq!(e.due_date.year(), e.period_start.year());
                prop_assert_eq!(e.due_date.month(), e.period_start.month());
                prop_assert!(e.amount_due <= lease.monthly_rent);
            }
            if let Some(end) = end {
                prop_assert_eq!(entries.last().unwrap().period_end, end);
            } else {
                prop_assert!(entries.last().unwrap().period_start > now.date_naive());
            }
        }
    }
}
