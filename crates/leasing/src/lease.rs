use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use rentflow_core::{DomainError, DomainResult, LeaseId, TenantId, UnitId};

/// Lease status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseStatus {
    Draft,
    Active,
    Expiring,
    Expired,
    Terminated,
}

impl LeaseStatus {
    /// Drafts have not been signed yet and generate no charges.
    pub fn is_billable(self) -> bool {
        self != LeaseStatus::Draft
    }
}

/// Lease row as supplied by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub id: LeaseId,
    pub unit_id: UnitId,
    pub tenant_id: TenantId,
    pub start_date: NaiveDate,
    /// `None` means open-ended (month-to-month).
    pub end_date: Option<NaiveDate>,
    /// Rent per calendar month in smallest currency unit.
    pub monthly_rent: u64,
    /// Security deposit in smallest currency unit (not part of the schedule).
    pub deposit: u64,
    /// Day of month rent falls due (1–31, clamped to short months).
    pub payment_day_of_month: u32,
    pub status: LeaseStatus,
}

impl Lease {
    /// Invariant: end date (if any) is strictly after start date and the payment day
    /// lies in `[1, 31]`.
    pub fn validate_terms(&self) -> DomainResult<()> {
        if let Some(end) = self.end_date {
            if end <= self.start_date {
                return Err(DomainError::validation(format!(
                    "end_date {end} must be after start_date {}",
                    self.start_date
                )));
            }
        }

        if !(1..=31).contains(&self.payment_day_of_month) {
            return Err(DomainError::validation(format!(
                "payment_day_of_month must be within 1..=31 (got {})",
                self.payment_day_of_month
            )));
        }

        Ok(())
    }

    pub fn is_open_ended(&self) -> bool {
        self.end_date.is_none()
    }

    /// Whether moving from `previous` to `self` invalidates the billing schedule.
    ///
    /// Any change to the billing terms, or a transition into `active`, requires the
    /// schedule to be regenerated from scratch.
    pub fn requires_reschedule(&self, previous: &Lease) -> bool {
        let terms_changed = self.start_date != previous.start_date
            || self.end_date != previous.end_date
            || self.monthly_rent != previous.monthly_rent
            || self.payment_day_of_month != previous.payment_day_of_month;

        let activated =
            self.status == LeaseStatus::Active && previous.status != LeaseStatus::Active;

        terms_changed || activated
    }
}
