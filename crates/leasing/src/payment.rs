use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rentflow_core::{DomainError, DomainResult, LeaseId, PaymentId};

/// Payment status lifecycle.
///
/// `pending → processing → {completed, failed}`; `completed` may later become
/// `refunded`. `failed` and `refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(self, to: PaymentStatus) -> bool {
        matches!(
            (self, to),
            (PaymentStatus::Pending, PaymentStatus::Processing)
                | (PaymentStatus::Processing, PaymentStatus::Completed)
                | (PaymentStatus::Processing, PaymentStatus::Failed)
                | (PaymentStatus::Completed, PaymentStatus::Refunded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }

    /// Money still in flight (counted as "pending" by collection views).
    pub fn is_in_flight(self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment row: the sole source of truth for cash movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub lease_id: LeaseId,
    /// Amount in smallest currency unit.
    pub amount: u64,
    pub status: PaymentStatus,
    /// Settlement instant; unset until the payment completes.
    pub paid_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTransition {
    pub payment_id: PaymentId,
    pub lease_id: LeaseId,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    /// The lease's allocation must be recomputed from scratch (never patched).
    pub requires_reallocation: bool,
}

impl Payment {
    /// Only completed payments are applied to a schedule.
    pub fn is_allocatable(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// Date used for ordering and date-window filters: `paid_date`, else `created_at`.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.paid_date.unwrap_or(self.created_at)
    }

    /// Apply a status change, returning the updated row and what it implies.
    ///
    /// Settling a payment stamps `paid_date` with `at` unless one was already recorded.
    pub fn transition(
        &self,
        to: PaymentStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<(Payment, PaymentTransition)> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                to.as_str(),
            ));
        }

        let mut next = self.clone();
        next.status = to;
        if to == PaymentStatus::Completed && next.paid_date.is_none() {
            next.paid_date = Some(at);
        }

        let requires_reallocation =
            self.status == PaymentStatus::Completed || to == PaymentStatus::Completed;

        let transition = PaymentTransition {
            payment_id: self.id,
            lease_id: self.lease_id,
            from: self.status,
            to,
            requires_reallocation,
        };

        Ok((next, transition))
    }
}
