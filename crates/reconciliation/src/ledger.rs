//! The canonical reconciliation pass.
//!
//! `reconcile_lease` runs schedule → allocation → classification for one lease.
//! `LedgerBook` runs it once for every lease in a portfolio and is the only input the
//! read views (positions, arrears, advance credit, metrics, analytics, statements)
//! project from, so every view agrees on the same numbers.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rentflow_core::{LeaseId, PropertyId, TenantId, UnitId};
use rentflow_leasing::{Lease, Payment, Unit};

use crate::allocation::{PaymentApplication, allocate, completed_total};
use crate::balance::{LeasePosition, TenantLedgerPosition};
use crate::config::ReconciliationConfig;
use crate::error::{FlagKind, ReconciliationError, ReconciliationResult};
use crate::schedule::{ScheduleEntry, generate_schedule_covering};
use crate::status::classify_entries;

/// One lease after a full reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledLease {
    pub lease: Lease,
    pub property_id: Option<PropertyId>,
    pub entries: Vec<ScheduleEntry>,
    pub applications: Vec<PaymentApplication>,
    pub position: LeasePosition,
    pub completed_total: u64,
    /// Every payment row of the lease, whatever its status (for collection metrics).
    pub payments: Vec<Payment>,
}

impl ReconciledLease {
    pub fn tenant_id(&self) -> TenantId {
        self.lease.tenant_id
    }

    pub fn with_property(mut self, property_id: Option<PropertyId>) -> Self {
        self.property_id = property_id;
        self
    }
}

/// Reconcile a single lease against its payments as of `now`.
///
/// Payments for other leases are ignored. The lease status is not consulted; callers
/// decide which leases are billable.
pub fn reconcile_lease(
    lease: &Lease,
    payments: &[Payment],
    now: DateTime<Utc>,
    config: &ReconciliationConfig,
) -> ReconciliationResult<ReconciledLease> {
    let completed = completed_total(lease.id, payments)?;
    let schedule = generate_schedule_covering(lease, now, config, completed)?;

    let allocation = allocate(&schedule, payments)?;
    let allocated = allocation
        .allocated_total()
        .ok_or_else(|| ReconciliationError::overflow(lease.id, "allocated amounts"))?;
    if allocated != completed {
        return Err(ReconciliationError::AllocationConservationViolation {
            lease_id: lease.id,
            allocated,
            completed,
        });
    }

    let entries = classify_entries(&allocation.entries, now, config);
    let position = LeasePosition::from_entries(&entries, now);

    tracing::debug!(
        lease_id = %lease.id,
        entries = entries.len(),
        allocated,
        outstanding = position.outstanding_balance,
        advance = position.advance_credit,
        "lease reconciled"
    );

    Ok(ReconciledLease {
        lease: lease.clone(),
        property_id: None,
        entries,
        applications: allocation.applications,
        position,
        completed_total: completed,
        payments: payments
            .iter()
            .filter(|p| p.lease_id == lease.id)
            .cloned()
            .collect(),
    })
}

/// A lease excluded from aggregates, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedLease {
    pub lease_id: LeaseId,
    pub tenant_id: TenantId,
    pub unit_id: UnitId,
    pub property_id: Option<PropertyId>,
    pub kind: FlagKind,
    pub message: String,
}

impl FlaggedLease {
    pub fn new(lease: &Lease, error: &ReconciliationError) -> Self {
        Self {
            lease_id: lease.id,
            tenant_id: lease.tenant_id,
            unit_id: lease.unit_id,
            property_id: None,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Source rows for a portfolio pass, as fetched by the storage collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioInput {
    pub leases: Vec<Lease>,
    pub payments: Vec<Payment>,
    pub units: Vec<Unit>,
}

/// View filter. Property narrows which leases a view covers; the date range narrows
/// which payments count as collected. The date range never narrows schedule entries,
/// arrears or advance credit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsScope {
    pub property_id: Option<PropertyId>,
    /// Inclusive.
    pub from_date: Option<NaiveDate>,
    /// Inclusive.
    pub to_date: Option<NaiveDate>,
}

impl MetricsScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_property(property_id: PropertyId) -> Self {
        Self {
            property_id: Some(property_id),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from_date = Some(from);
        self.to_date = Some(to);
        self
    }

    pub fn covers_property(&self, property_id: Option<PropertyId>) -> bool {
        match self.property_id {
            Some(wanted) => property_id == Some(wanted),
            None => true,
        }
    }

    pub fn covers_date(&self, date: NaiveDate) -> bool {
        self.from_date.is_none_or(|from| date >= from) && self.to_date.is_none_or(|to| date <= to)
    }
}

/// Result of one reconciliation pass over a portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerBook {
    as_of: DateTime<Utc>,
    config: ReconciliationConfig,
    leases: Vec<ReconciledLease>,
    flagged: Vec<FlaggedLease>,
    properties: Vec<PropertyId>,
}

impl LedgerBook {
    /// Reconcile every billable lease. A lease that fails is flagged and contributes
    /// nothing; it never aborts the pass.
    pub fn build(input: &PortfolioInput, now: DateTime<Utc>, config: &ReconciliationConfig) -> Self {
        let mut by_lease: HashMap<LeaseId, Vec<Payment>> = HashMap::new();
        for payment in &input.payments {
            by_lease.entry(payment.lease_id).or_default().push(payment.clone());
        }

        let mut seen: HashSet<LeaseId> = HashSet::new();
        let mut reconciled = Vec::new();
        let mut flagged = Vec::new();

        for lease in &input.leases {
            if !seen.insert(lease.id) {
                tracing::warn!(lease_id = %lease.id, "duplicate lease row ignored");
                continue;
            }
            if !lease.status.is_billable() {
                continue;
            }

            let payments = by_lease.get(&lease.id).map(Vec::as_slice).unwrap_or(&[]);
            match reconcile_lease(lease, payments, now, config) {
                Ok(r) => reconciled.push(r),
                Err(e) => {
                    tracing::warn!(lease_id = %lease.id, error = %e, "lease excluded from aggregates");
                    flagged.push(FlaggedLease::new(lease, &e));
                }
            }
        }

        let orphaned = input
            .payments
            .iter()
            .filter(|p| !seen.contains(&p.lease_id))
            .count();
        if orphaned > 0 {
            tracing::warn!(orphaned, "payments reference unknown leases and were ignored");
        }

        Self::assemble(reconciled, flagged, &input.units, now, config)
    }

    /// Assemble a book from already reconciled leases (e.g. served from a cache).
    pub fn assemble(
        leases: Vec<ReconciledLease>,
        flagged: Vec<FlaggedLease>,
        units: &[Unit],
        now: DateTime<Utc>,
        config: &ReconciliationConfig,
    ) -> Self {
        let unit_property: HashMap<UnitId, PropertyId> =
            units.iter().map(|u| (u.id, u.property_id)).collect();

        let leases: Vec<ReconciledLease> = leases
            .into_iter()
            .map(|r| {
                let property_id = unit_property.get(&r.lease.unit_id).copied();
                r.with_property(property_id)
            })
            .collect();

        let flagged: Vec<FlaggedLease> = flagged
            .into_iter()
            .map(|mut f| {
                f.property_id = unit_property.get(&f.unit_id).copied();
                f
            })
            .collect();

        let properties: Vec<PropertyId> = units
            .iter()
            .map(|u| u.property_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        tracing::info!(
            leases = leases.len(),
            flagged = flagged.len(),
            properties = properties.len(),
            as_of = %now,
            "ledger pass completed"
        );

        Self {
            as_of: now,
            config: config.clone(),
            leases,
            flagged,
            properties,
        }
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn today(&self) -> NaiveDate {
        self.as_of.date_naive()
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    pub fn leases(&self) -> &[ReconciledLease] {
        &self.leases
    }

    pub fn flagged(&self) -> &[FlaggedLease] {
        &self.flagged
    }

    /// Every property known from the units table, sorted.
    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn lease(&self, lease_id: LeaseId) -> Option<&ReconciledLease> {
        self.leases.iter().find(|r| r.lease.id == lease_id)
    }

    /// Leases covered by the scope's property filter.
    pub fn leases_in<'a>(
        &'a self,
        scope: &'a MetricsScope,
    ) -> impl Iterator<Item = &'a ReconciledLease> + 'a {
        self.leases
            .iter()
            .filter(move |r| scope.covers_property(r.property_id))
    }

    /// Flagged leases covered by the scope's property filter.
    pub fn flagged_in(&self, scope: &MetricsScope) -> Vec<FlaggedLease> {
        self.flagged
            .iter()
            .filter(|f| scope.covers_property(f.property_id))
            .cloned()
            .collect()
    }

    /// Per-tenant positions within the scope's property filter, sorted by tenant id.
    pub fn tenant_positions_in(&self, scope: &MetricsScope) -> Vec<TenantLedgerPosition> {
        let mut tenants: BTreeMap<TenantId, TenantLedgerPosition> = BTreeMap::new();
        for r in self.leases_in(scope) {
            tenants
                .entry(r.tenant_id())
                .or_insert_with(|| TenantLedgerPosition::new(r.tenant_id()))
                .absorb(r.lease.id, &r.position);
        }
        tenants.into_values().collect()
    }

    pub fn tenant_positions(&self) -> Vec<TenantLedgerPosition> {
        self.tenant_positions_in(&MetricsScope::all())
    }

    pub fn tenant_position(&self, tenant_id: TenantId) -> Option<TenantLedgerPosition> {
        self.tenant_positions()
            .into_iter()
            .find(|t| t.tenant_id == tenant_id)
    }
}
