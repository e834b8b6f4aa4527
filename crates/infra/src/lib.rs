//! Infrastructure layer: ledger sources and the per-lease reconciliation cache.

pub mod cache;
pub mod error;
pub mod source;

pub use cache::{CacheStamp, CacheStats, CachedReconciler, ScheduleCache};
pub use error::{InfraError, InfraResult};
pub use source::{InMemoryLedgerSource, LedgerSource};
