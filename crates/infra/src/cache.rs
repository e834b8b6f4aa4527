//! Per-lease cache of reconciliation results.
//!
//! Entries are keyed by lease id and stamped with the lease version, the payments
//! version and the reference date they were computed for. A lookup whose stamp differs
//! in any component misses and evicts: results are recomputed, never patched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};

use rentflow_core::LeaseId;
use rentflow_reconciliation::{
    FlaggedLease, LedgerBook, ReconciledLease, ReconciliationConfig, reconcile_lease,
};

use crate::error::{InfraError, InfraResult};
use crate::source::LedgerSource;

/// Inputs a cached result was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheStamp {
    pub lease_version: u64,
    pub payments_version: u64,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
pub struct ScheduleCache {
    inner: RwLock<HashMap<LeaseId, (CacheStamp, Arc<ReconciledLease>)>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `lease_id` if it was computed from exactly `stamp`.
    pub fn get(&self, lease_id: LeaseId, stamp: CacheStamp) -> Option<Arc<ReconciledLease>> {
        let stale = {
            let map = self.inner.read().ok()?;
            match map.get(&lease_id) {
                Some((cached, value)) if *cached == stamp => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(Arc::clone(value));
                }
                Some(_) => true,
                None => false,
            }
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        if stale {
            self.invalidate(lease_id);
        }
        None
    }

    pub fn insert(&self, lease_id: LeaseId, stamp: CacheStamp, value: Arc<ReconciledLease>) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(lease_id, (stamp, value));
        }
    }

    pub fn invalidate(&self, lease_id: LeaseId) {
        if let Ok(mut map) = self.inner.write() {
            if map.remove(&lease_id).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(lease_id = %lease_id, "cached reconciliation evicted");
            }
        }
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Reconciles leases from a [`LedgerSource`], reusing results whose inputs are unchanged.
pub struct CachedReconciler<S> {
    source: S,
    cache: ScheduleCache,
    config: ReconciliationConfig,
}

impl<S: LedgerSource> CachedReconciler<S> {
    pub fn new(source: S, config: ReconciliationConfig) -> Self {
        Self {
            source,
            cache: ScheduleCache::new(),
            config,
        }
    }

    /// Reconciler configured from `RENTFLOW_*` environment variables.
    pub fn from_env(source: S) -> Self {
        Self::new(source, ReconciliationConfig::from_env())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &ScheduleCache {
        &self.cache
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    fn stamp(&self, lease_id: LeaseId, now: DateTime<Utc>) -> CacheStamp {
        CacheStamp {
            lease_version: self.source.lease_version(lease_id),
            payments_version: self.source.payments_version(lease_id),
            as_of: now.date_naive(),
        }
    }

    /// Reconcile one lease as of `now`, served from the cache when nothing changed.
    pub fn reconcile(
        &self,
        lease_id: LeaseId,
        now: DateTime<Utc>,
    ) -> InfraResult<Arc<ReconciledLease>> {
        let stamp = self.stamp(lease_id, now);
        if let Some(hit) = self.cache.get(lease_id, stamp) {
            return Ok(hit);
        }

        let lease = self
            .source
            .lease(lease_id)
            .ok_or(InfraError::UnknownLease(lease_id))?;
        let payments = self.source.payments_for(lease_id);
        let reconciled = Arc::new(reconcile_lease(&lease, &payments, now, &self.config)?);

        self.cache.insert(lease_id, stamp, Arc::clone(&reconciled));
        Ok(reconciled)
    }

    /// Full portfolio pass over the source, reusing cached leases.
    ///
    /// Non-billable leases are skipped; leases that fail reconciliation are flagged.
    pub fn book(&self, now: DateTime<Utc>) -> InfraResult<LedgerBook> {
        let mut leases = Vec::new();
        let mut flagged = Vec::new();

        for lease in self.source.leases() {
            if !lease.status.is_billable() {
                continue;
            }
            match self.reconcile(lease.id, now) {
                Ok(r) => leases.push(ReconciledLease::clone(&r)),
                Err(InfraError::Reconciliation(e)) => {
                    tracing::warn!(lease_id = %lease.id, error = %e, "lease excluded from aggregates");
                    flagged.push(FlaggedLease::new(&lease, &e));
                }
                Err(e) => return Err(e),
            }
        }

        let stats = self.cache.stats();
        tracing::debug!(
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            "schedule cache"
        );

        Ok(LedgerBook::assemble(
            leases,
            flagged,
            &self.source.units(),
            now,
            &self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rentflow_core::{PaymentId, PropertyId, TenantId, UnitId};
    use rentflow_leasing::{Lease, LeaseStatus, Payment, PaymentStatus, Unit};
    use rentflow_reconciliation::MetricsScope;

    use crate::source::InMemoryLedgerSource;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn lease(unit_id: UnitId) -> Lease {
        Lease {
            id: LeaseId::new(),
            unit_id,
            tenant_id: TenantId::new(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            end_date: None,
            monthly_rent: 500_000,
            deposit: 0,
            payment_day_of_month: 5,
            status: LeaseStatus::Active,
        }
    }

    fn completed(lease_id: LeaseId, amount: u64, when: DateTime<Utc>) -> Payment {
        Payment {
            id: PaymentId::new(),
            lease_id,
            amount,
            status: PaymentStatus::Completed,
            paid_date: Some(when),
            created_at: when,
        }
    }

    fn seeded() -> (Arc<InMemoryLedgerSource>, Lease) {
        let source = Arc::new(InMemoryLedgerSource::new());
        let unit = Unit::new(UnitId::new(), PropertyId::new(), "1A");
        let l = lease(unit.id);
        source.upsert_unit(unit).unwrap();
        source.upsert_lease(l.clone()).unwrap();
        source
            .record_payment(completed(l.id, 500_000, at(2024, 1, 4)))
            .unwrap();
        (source, l)
    }

    #[test]
    fn unchanged_inputs_are_served_from_cache() {
        let (source, l) = seeded();
        let reconciler = CachedReconciler::new(source, ReconciliationConfig::default());

        let first = reconciler.reconcile(l.id, at(2024, 2, 10)).unwrap();
        let second = reconciler.reconcile(l.id, at(2024, 2, 10)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            reconciler.cache().stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn new_payment_invalidates_the_lease() {
        let (source, l) = seeded();
        let reconciler = CachedReconciler::new(Arc::clone(&source), ReconciliationConfig::default());
        let now = at(2024, 2, 10);

        let before = reconciler.reconcile(l.id, now).unwrap();
        assert_eq!(before.position.outstanding_balance, 500_000);

        source
            .record_payment(completed(l.id, 500_000, at(2024, 2, 6)))
            .unwrap();
        let after = reconciler.reconcile(l.id, now).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.position.outstanding_balance, 0);
        assert_eq!(reconciler.cache().stats().evictions, 1);
    }

    #[test]
    fn lease_edit_and_new_day_both_miss() {
        let (source, l) = seeded();
        let reconciler = CachedReconciler::new(Arc::clone(&source), ReconciliationConfig::default());

        let jan = reconciler.reconcile(l.id, at(2024, 1, 20)).unwrap();
        // Same day, later instant: same stamp.
        let same_day = reconciler
            .reconcile(l.id, Utc.with_ymd_and_hms(2024, 1, 20, 23, 0, 0).unwrap())
            .unwrap();
        assert!(Arc::ptr_eq(&jan, &same_day));

        let feb = reconciler.reconcile(l.id, at(2024, 2, 20)).unwrap();
        assert_eq!(feb.position.outstanding_balance, 500_000);

        source
            .upsert_lease(Lease {
                monthly_rent: 400_000,
                ..l.clone()
            })
            .unwrap();
        let edited = reconciler.reconcile(l.id, at(2024, 2, 20)).unwrap();
        assert_eq!(edited.position.outstanding_balance, 300_000);
        assert_eq!(reconciler.cache().stats().evictions, 2);
    }

    #[test]
    fn book_matches_uncached_pass_and_flags_bad_leases() {
        let (source, good) = seeded();
        let broken = Lease {
            payment_day_of_month: 0,
            ..lease(UnitId::new())
        };
        source.upsert_lease(broken.clone()).unwrap();
        source
            .upsert_lease(Lease {
                status: LeaseStatus::Draft,
                ..lease(UnitId::new())
            })
            .unwrap();

        let reconciler = CachedReconciler::new(Arc::clone(&source), ReconciliationConfig::default());
        let now = at(2024, 3, 10);
        let cached = reconciler.book(now).unwrap();
        let again = reconciler.book(now).unwrap();

        assert_eq!(cached.leases().len(), 1);
        assert_eq!(cached.leases()[0].lease.id, good.id);
        assert_eq!(cached.flagged().len(), 1);
        assert_eq!(cached.flagged()[0].lease_id, broken.id);

        let all = MetricsScope::all();
        assert_eq!(cached.portfolio_metrics(&all), again.portfolio_metrics(&all));
        assert_eq!(cached.portfolio_metrics(&all).total_outstanding, 1_000_000);
        assert!(reconciler.cache().stats().hits >= 1);
    }

    #[test]
    fn unknown_lease_is_an_error() {
        let reconciler = CachedReconciler::new(
            InMemoryLedgerSource::new(),
            ReconciliationConfig::default(),
        );
        assert!(matches!(
            reconciler.reconcile(LeaseId::new(), at(2024, 1, 1)),
            Err(InfraError::UnknownLease(_))
        ));
        assert!(reconciler.cache().is_empty());
    }
}
