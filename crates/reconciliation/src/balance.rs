//! Lease and tenant balance positions.
//!
//! Arrears and advance credit are two separate non-negative figures and are never
//! netted: a tenant three months behind on one lease and prepaid on another shows
//! both.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rentflow_core::{LeaseId, TenantId};

use crate::schedule::ScheduleEntry;
use crate::status::EntryStatus;

/// What one entry contributes to arrears: its deficit once due.
pub fn entry_outstanding(entry: &ScheduleEntry, today: NaiveDate) -> u64 {
    if entry.due_date <= today {
        entry.remaining()
    } else {
        0
    }
}

/// What one entry contributes to advance credit: everything paid against it before it
/// falls due, or any surplus once it has.
pub fn entry_advance(entry: &ScheduleEntry, today: NaiveDate) -> u64 {
    if entry.due_date > today {
        entry.paid_amount
    } else {
        entry.surplus()
    }
}

/// Position of a single lease, derived from its classified entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeasePosition {
    pub outstanding_balance: u64,
    pub advance_credit: u64,
    /// Age of the oldest entry in arrears.
    pub days_overdue: u32,
    /// Entries in `overdue` or `partial` status.
    pub overdue_count: u32,
    /// Fully paid entries not yet due.
    pub months_ahead: u32,
}

impl LeasePosition {
    pub fn from_entries(entries: &[ScheduleEntry], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let mut position = LeasePosition::default();

        for entry in entries {
            position.outstanding_balance += entry_outstanding(entry, today);
            position.advance_credit += entry_advance(entry, today);

            if entry.status.is_arrears() {
                position.overdue_count += 1;
                position.days_overdue = position.days_overdue.max(entry.days_overdue);
            }
            if entry.status == EntryStatus::Paid && entry.due_date > today {
                position.months_ahead += 1;
            }
        }

        position
    }
}

/// Tenant position summed over all of the tenant's leases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantLedgerPosition {
    pub tenant_id: TenantId,
    pub outstanding_balance: u64,
    pub advance_credit: u64,
    pub days_overdue: u32,
    pub overdue_count: u32,
    pub months_ahead: u32,
    pub lease_ids: Vec<LeaseId>,
}

impl TenantLedgerPosition {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            outstanding_balance: 0,
            advance_credit: 0,
            days_overdue: 0,
            overdue_count: 0,
            months_ahead: 0,
            lease_ids: Vec::new(),
        }
    }

    /// Add one lease's position. Cross-lease totals saturate rather than wrap.
    pub fn absorb(&mut self, lease_id: LeaseId, position: &LeasePosition) {
        self.outstanding_balance = self
            .outstanding_balance
            .saturating_add(position.outstanding_balance);
        self.advance_credit = self.advance_credit.saturating_add(position.advance_credit);
        self.days_overdue = self.days_overdue.max(position.days_overdue);
        self.overdue_count += position.overdue_count;
        self.months_ahead += position.months_ahead;
        self.lease_ids.push(lease_id);
    }
}
