//! Engine error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rentflow_core::{DomainError, LeaseId};

pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    /// Bad dates or out-of-range payment day. Fatal for that lease only.
    #[error("invalid lease terms for {lease_id}: {reason}")]
    InvalidLeaseTerms { lease_id: LeaseId, reason: String },

    /// Allocated total differs from the completed-payment total.
    #[error(
        "allocation conservation violated for {lease_id} (allocated={allocated}, completed={completed})"
    )]
    AllocationConservationViolation {
        lease_id: LeaseId,
        allocated: u64,
        completed: u64,
    },

    /// A money total for the lease does not fit in the amount type.
    #[error("amount overflow for {lease_id} while summing {what}")]
    AmountOverflow { lease_id: LeaseId, what: &'static str },

    /// The caller did not supply the reference instant.
    #[error("reference clock missing: an explicit `now` is required")]
    MissingReferenceClock,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ReconciliationError {
    pub fn invalid_terms(lease_id: LeaseId, reason: impl Into<String>) -> Self {
        Self::InvalidLeaseTerms {
            lease_id,
            reason: reason.into(),
        }
    }

    pub fn overflow(lease_id: LeaseId, what: &'static str) -> Self {
        Self::AmountOverflow { lease_id, what }
    }

    pub fn kind(&self) -> FlagKind {
        match self {
            ReconciliationError::InvalidLeaseTerms { .. } => FlagKind::InvalidLeaseTerms,
            ReconciliationError::AllocationConservationViolation { .. } => {
                FlagKind::AllocationConservationViolation
            }
            ReconciliationError::AmountOverflow { .. } => FlagKind::AmountOverflow,
            ReconciliationError::MissingReferenceClock => FlagKind::MissingReferenceClock,
            ReconciliationError::Domain(_) => FlagKind::Domain,
        }
    }
}

/// Serializable tag for a lease excluded from aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    InvalidLeaseTerms,
    AllocationConservationViolation,
    AmountOverflow,
    MissingReferenceClock,
    Domain,
}
