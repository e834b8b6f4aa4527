//! Payment allocation: completed payments applied to entries oldest-period-first.
//!
//! Payments are walked in settlement order (`paid_date`, then `created_at`, then id).
//! Each amount fills the earliest entry with a remaining balance and spills into the
//! following entries; once every entry is satisfied the remainder is credited to the
//! final entry. The allocated total therefore always equals the completed total.
//!
//! Sums are checked: a lease whose payments overflow the amount type is rejected with
//! [`ReconciliationError::AmountOverflow`] instead of wrapping or panicking.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use rentflow_core::{LeaseId, PaymentId};
use rentflow_leasing::Payment;

use crate::error::{ReconciliationError, ReconciliationResult};
use crate::schedule::ScheduleEntry;

/// One slice of a payment applied to one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentApplication {
    pub payment_id: PaymentId,
    pub payment_number: u32,
    pub amount: u64,
}

/// Result of allocating a lease's payments to its schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub entries: Vec<ScheduleEntry>,
    pub applications: Vec<PaymentApplication>,
}

impl Allocation {
    /// Sum of `paid_amount` over all entries, `None` on overflow.
    pub fn allocated_total(&self) -> Option<u64> {
        self.entries
            .iter()
            .try_fold(0u64, |acc, e| acc.checked_add(e.paid_amount))
    }
}

/// Sum of completed payment amounts belonging to `lease_id`.
pub fn completed_total(lease_id: LeaseId, payments: &[Payment]) -> ReconciliationResult<u64> {
    payments
        .iter()
        .filter(|p| p.lease_id == lease_id && p.is_allocatable())
        .try_fold(0u64, |acc, p| acc.checked_add(p.amount))
        .ok_or_else(|| ReconciliationError::overflow(lease_id, "completed payments"))
}

/// Settlement order used for allocation.
pub fn settlement_order(a: &Payment, b: &Payment) -> Ordering {
    a.effective_date()
        .cmp(&b.effective_date())
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Allocate the completed payments of the entries' lease. Pure: the input entries are
/// left untouched and any previous `paid_amount` is discarded.
pub fn allocate(
    entries: &[ScheduleEntry],
    payments: &[Payment],
) -> ReconciliationResult<Allocation> {
    let mut allocated: Vec<ScheduleEntry> = entries
        .iter()
        .map(|e| ScheduleEntry {
            paid_amount: 0,
            is_paid: false,
            ..e.clone()
        })
        .collect();
    let mut applications = Vec::new();

    let Some(lease_id) = allocated.first().map(|e| e.lease_id) else {
        return Ok(Allocation {
            entries: allocated,
            applications,
        });
    };

    let mut completed: Vec<&Payment> = payments
        .iter()
        .filter(|p| p.lease_id == lease_id && p.is_allocatable() && p.amount > 0)
        .collect();
    completed.sort_by(|a, b| settlement_order(a, b));

    let last = allocated.len() - 1;
    let mut cursor = 0usize;

    for payment in completed {
        let mut left = payment.amount;

        while left > 0 {
            while cursor < last && allocated[cursor].remaining() == 0 {
                cursor += 1;
            }

            let entry = &mut allocated[cursor];
            let take = if cursor == last {
                // Final entry absorbs whatever is left, including any surplus.
                left
            } else {
                left.min(entry.remaining())
            };

            entry.paid_amount = entry
                .paid_amount
                .checked_add(take)
                .ok_or_else(|| ReconciliationError::overflow(lease_id, "allocated amounts"))?;
            left -= take;
            applications.push(PaymentApplication {
                payment_id: payment.id,
                payment_number: entry.payment_number,
                amount: take,
            });
        }
    }

    for entry in &mut allocated {
        entry.is_paid = entry.paid_amount >= entry.amount_due;
    }

    Ok(Allocation {
        entries: allocated,
        applications,
    })
}
