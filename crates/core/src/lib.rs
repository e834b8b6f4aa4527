//! `rentflow-core`: shared building blocks for the rent ledger.
//!
//! This crate contains **pure** primitives (no infrastructure concerns): identifiers,
//! the domain error model and calendar arithmetic used by billing.

pub mod calendar;
pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{LeaseId, PaymentId, PropertyId, TenantId, UnitId};
