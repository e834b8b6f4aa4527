//! Ledger sources: where lease, payment and unit rows come from.
//!
//! A source hands out plain rows plus per-lease version counters. Any write that
//! touches a lease or its payments bumps the matching counter; caches compare
//! counters and recompute on mismatch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use rentflow_core::{LeaseId, PaymentId};
use rentflow_leasing::{Lease, Payment, PaymentStatus, PaymentTransition, Unit};

use crate::error::{InfraError, InfraResult};

/// Read access to the rows a reconciliation pass needs.
pub trait LedgerSource: Send + Sync {
    /// All lease rows, in a stable order.
    fn leases(&self) -> Vec<Lease>;
    fn lease(&self, lease_id: LeaseId) -> Option<Lease>;
    /// Every payment row of the lease, whatever its status.
    fn payments_for(&self, lease_id: LeaseId) -> Vec<Payment>;
    fn units(&self) -> Vec<Unit>;
    /// Bumped on every write to the lease row.
    fn lease_version(&self, lease_id: LeaseId) -> u64;
    /// Bumped on every write to any of the lease's payments.
    fn payments_version(&self, lease_id: LeaseId) -> u64;
}

impl<S> LedgerSource for Arc<S>
where
    S: LedgerSource + ?Sized,
{
    fn leases(&self) -> Vec<Lease> {
        (**self).leases()
    }

    fn lease(&self, lease_id: LeaseId) -> Option<Lease> {
        (**self).lease(lease_id)
    }

    fn payments_for(&self, lease_id: LeaseId) -> Vec<Payment> {
        (**self).payments_for(lease_id)
    }

    fn units(&self) -> Vec<Unit> {
        (**self).units()
    }

    fn lease_version(&self, lease_id: LeaseId) -> u64 {
        (**self).lease_version(lease_id)
    }

    fn payments_version(&self, lease_id: LeaseId) -> u64 {
        (**self).payments_version(lease_id)
    }
}

#[derive(Debug, Default)]
struct Tables {
    leases: HashMap<LeaseId, Lease>,
    payments: HashMap<LeaseId, Vec<Payment>>,
    units: Vec<Unit>,
    lease_versions: HashMap<LeaseId, u64>,
    payment_versions: HashMap<LeaseId, u64>,
}

/// In-memory ledger source for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLedgerSource {
    inner: RwLock<Tables>,
}

impl InMemoryLedgerSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a lease row.
    pub fn upsert_lease(&self, lease: Lease) -> InfraResult<()> {
        let mut tables = self.inner.write().map_err(|_| InfraError::LockPoisoned)?;

        if let Some(previous) = tables.leases.get(&lease.id) {
            tracing::debug!(
                lease_id = %lease.id,
                reschedule = lease.requires_reschedule(previous),
                "lease updated"
            );
        }
        *tables.lease_versions.entry(lease.id).or_default() += 1;
        tables.leases.insert(lease.id, lease);
        Ok(())
    }

    pub fn upsert_unit(&self, unit: Unit) -> InfraResult<()> {
        let mut tables = self.inner.write().map_err(|_| InfraError::LockPoisoned)?;
        tables.units.retain(|u| u.id != unit.id);
        tables.units.push(unit);
        Ok(())
    }

    /// Record a new payment row. The lease must already exist.
    pub fn record_payment(&self, payment: Payment) -> InfraResult<()> {
        let mut tables = self.inner.write().map_err(|_| InfraError::LockPoisoned)?;
        if !tables.leases.contains_key(&payment.lease_id) {
            return Err(InfraError::UnknownLease(payment.lease_id));
        }

        let lease_id = payment.lease_id;
        let rows = tables.payments.entry(lease_id).or_default();
        rows.retain(|p| p.id != payment.id);
        rows.push(payment);
        *tables.payment_versions.entry(lease_id).or_default() += 1;
        Ok(())
    }

    /// Move a payment through its lifecycle, stamping the settlement date on completion.
    pub fn transition_payment(
        &self,
        payment_id: PaymentId,
        to: PaymentStatus,
        at: DateTime<Utc>,
    ) -> InfraResult<PaymentTransition> {
        let mut tables = self.inner.write().map_err(|_| InfraError::LockPoisoned)?;

        let slot = tables
            .payments
            .values_mut()
            .flat_map(|rows| rows.iter_mut())
            .find(|p| p.id == payment_id)
            .ok_or(InfraError::UnknownPayment(payment_id))?;

        let (next, transition) = slot.transition(to, at)?;
        *slot = next;
        *tables
            .payment_versions
            .entry(transition.lease_id)
            .or_default() += 1;

        tracing::debug!(
            payment_id = %transition.payment_id,
            lease_id = %transition.lease_id,
            from = %transition.from,
            to = %transition.to,
            reallocate = transition.requires_reallocation,
            "payment transitioned"
        );
        Ok(transition)
    }
}

impl LedgerSource for InMemoryLedgerSource {
    fn leases(&self) -> Vec<Lease> {
        let tables = match self.inner.read() {
            Ok(t) => t,
            Err(_) => return vec![],
        };
        let mut leases: Vec<Lease> = tables.leases.values().cloned().collect();
        leases.sort_by_key(|l| l.id);
        leases
    }

    fn lease(&self, lease_id: LeaseId) -> Option<Lease> {
        let tables = self.inner.read().ok()?;
        tables.leases.get(&lease_id).cloned()
    }

    fn payments_for(&self, lease_id: LeaseId) -> Vec<Payment> {
        let tables = match self.inner.read() {
            Ok(t) => t,
            Err(_) => return vec![],
        };
        tables.payments.get(&lease_id).cloned().unwrap_or_default()
    }

    fn units(&self) -> Vec<Unit> {
        self.inner
            .read()
            .map(|t| t.units.clone())
            .unwrap_or_default()
    }

    fn lease_version(&self, lease_id: LeaseId) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|t| t.lease_versions.get(&lease_id).copied())
            .unwrap_or(0)
    }

    fn payments_version(&self, lease_id: LeaseId) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|t| t.payment_versions.get(&lease_id).copied())
            .unwrap_or(0)
    }
}
