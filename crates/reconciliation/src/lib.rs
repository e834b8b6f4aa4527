//! Rent reconciliation engine.
//!
//! Turns lease terms into monthly billing schedules, applies completed payments
//! oldest-period-first, classifies every entry against an explicit reference instant
//! and projects balances, arrears, advance credit and collection analytics from that
//! single pass.
//!
//! Everything here is pure and deterministic: no IO, no clocks, no shared mutable
//! state. Identical inputs and an identical `now` always produce identical output.

pub mod allocation;
pub mod analytics;
pub mod balance;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod portfolio;
pub mod reports;
pub mod schedule;
pub mod statement;
pub mod status;

pub use allocation::{Allocation, PaymentApplication, allocate, completed_total};
pub use analytics::{CollectionTotals, MonthlyTrendPoint, PropertyPerformance};
pub use balance::{LeasePosition, TenantLedgerPosition};
pub use clock::AsOf;
pub use config::{ProrationPolicy, ReconciliationConfig};
pub use error::{FlagKind, ReconciliationError, ReconciliationResult};
pub use ledger::{FlaggedLease, LedgerBook, MetricsScope, PortfolioInput, ReconciledLease, reconcile_lease};
pub use portfolio::PortfolioMetrics;
pub use reports::{AdvanceCreditRow, ArrearsRow, CollectionsReport};
pub use schedule::{ScheduleEntry, generate_schedule, generate_schedule_covering};
pub use statement::{StatementLine, TenantStatement};
pub use status::{EntryStatus, classify, classify_entries};
