use rentflow_core::{DomainError, LeaseId, PaymentId};
use rentflow_reconciliation::ReconciliationError;

#[derive(Debug, thiserror::Error)]
pub enum InfraError {
    #[error("unknown lease: {0}")]
    UnknownLease(LeaseId),

    #[error("unknown payment: {0}")]
    UnknownPayment(PaymentId),

    #[error("ledger store lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),
}

pub type InfraResult<T> = Result<T, InfraError>;
