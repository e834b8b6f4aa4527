//! Per-tenant ledger statement with running totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use rentflow_core::{LeaseId, TenantId};

use crate::balance::{TenantLedgerPosition, entry_outstanding};
use crate::ledger::LedgerBook;
use crate::status::EntryStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementLine {
    pub lease_id: LeaseId,
    pub payment_number: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub amount_due: u64,
    pub paid_amount: u64,
    pub status: EntryStatus,
    pub cumulative_due: u64,
    pub cumulative_paid: u64,
    /// Deficits of every line due by the reference date, up to and including this one.
    pub running_arrears: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantStatement {
    pub tenant_id: TenantId,
    pub position: TenantLedgerPosition,
    pub lines: Vec<StatementLine>,
}

impl LedgerBook {
    /// Statement across all of a tenant's reconciled leases, or `None` if the tenant
    /// has none.
    pub fn tenant_statement(&self, tenant_id: TenantId) -> Option<TenantStatement> {
        let position = self.tenant_position(tenant_id)?;
        let today = self.today();

        let mut entries: Vec<_> = self
            .leases()
            .iter()
            .filter(|r| r.tenant_id() == tenant_id)
            .flat_map(|r| r.entries.iter())
            .collect();
        entries.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| a.lease_id.cmp(&b.lease_id))
                .then_with(|| a.payment_number.cmp(&b.payment_number))
        });

        let mut cumulative_due = 0u64;
        let mut cumulative_paid = 0u64;
        let mut running_arrears = 0u64;
        let lines = entries
            .into_iter()
            .map(|e| {
                cumulative_due = cumulative_due.saturating_add(e.amount_due);
                cumulative_paid = cumulative_paid.saturating_add(e.paid_amount);
                running_arrears = running_arrears.saturating_add(entry_outstanding(e, today));
                StatementLine {
                    lease_id: e.lease_id,
                    payment_number: e.payment_number,
                    period_start: e.period_start,
                    period_end: e.period_end,
                    due_date: e.due_date,
                    amount_due: e.amount_due,
                    paid_amount: e.paid_amount,
                    status: e.status,
                    cumulative_due,
                    cumulative_paid,
                    running_arrears,
                }
            })
            .collect();

        Some(TenantStatement {
            tenant_id,
            position,
            lines,
        })
    }
}
