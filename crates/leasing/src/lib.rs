//! Leasing input rows.
//!
//! Leases, payments and units as supplied by the storage collaborator, with the
//! validation and lifecycle rules that gate reconciliation. Deterministic domain logic
//! only (no IO, no HTTP, no storage).

pub mod lease;
pub mod payment;
pub mod unit;

pub use lease::{Lease, LeaseStatus};
pub use payment::{Payment, PaymentStatus, PaymentTransition};
pub use unit::Unit;
