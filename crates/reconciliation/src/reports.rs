//! Arrears and advance-credit lists for collections.
//!
//! Both lists are cut from the same tenant positions, which in turn come from the
//! book's single classification pass, so a tenant's figures agree across them.

use serde::{Deserialize, Serialize};

use rentflow_core::{LeaseId, TenantId};

use crate::balance::TenantLedgerPosition;
use crate::ledger::{LedgerBook, MetricsScope};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrearsRow {
    pub tenant_id: TenantId,
    pub outstanding_balance: u64,
    pub days_overdue: u32,
    pub overdue_count: u32,
    pub lease_ids: Vec<LeaseId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceCreditRow {
    pub tenant_id: TenantId,
    pub advance_credit: u64,
    pub months_ahead: u32,
    pub lease_ids: Vec<LeaseId>,
}

/// Both collection lists for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsReport {
    pub arrears: Vec<ArrearsRow>,
    pub advance_credit: Vec<AdvanceCreditRow>,
}

impl LedgerBook {
    /// Tenants in arrears, largest balance first.
    pub fn arrears_report(&self, scope: &MetricsScope) -> Vec<ArrearsRow> {
        arrears_rows(&self.tenant_positions_in(scope))
    }

    /// Tenants holding advance credit, largest credit first.
    pub fn advance_report(&self, scope: &MetricsScope) -> Vec<AdvanceCreditRow> {
        advance_rows(&self.tenant_positions_in(scope))
    }

    pub fn collections_report(&self, scope: &MetricsScope) -> CollectionsReport {
        let positions = self.tenant_positions_in(scope);
        CollectionsReport {
            arrears: arrears_rows(&positions),
            advance_credit: advance_rows(&positions),
        }
    }
}

fn arrears_rows(positions: &[TenantLedgerPosition]) -> Vec<ArrearsRow> {
    let mut rows: Vec<ArrearsRow> = positions
        .iter()
        .filter(|p| p.outstanding_balance > 0)
        .map(|p| ArrearsRow {
            tenant_id: p.tenant_id,
            outstanding_balance: p.outstanding_balance,
            days_overdue: p.days_overdue,
            overdue_count: p.overdue_count,
            lease_ids: p.lease_ids.clone(),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.outstanding_balance
            .cmp(&a.outstanding_balance)
            .then_with(|| b.days_overdue.cmp(&a.days_overdue))
            .then_with(|| a.tenant_id.cmp(&b.tenant_id))
    });
    rows
}

fn advance_rows(positions: &[TenantLedgerPosition]) -> Vec<AdvanceCreditRow> {
    let mut rows: Vec<AdvanceCreditRow> = positions
        .iter()
        .filter(|p| p.advance_credit > 0)
        .map(|p| AdvanceCreditRow {
            tenant_id: p.tenant_id,
            advance_credit: p.advance_credit,
            months_ahead: p.months_ahead,
            lease_ids: p.lease_ids.clone(),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.advance_credit
            .cmp(&a.advance_credit)
            .then_with(|| a.tenant_id.cmp(&b.tenant_id))
    });
    rows
}
