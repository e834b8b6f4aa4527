//! Reference instant handling.
//!
//! Engine functions take `now` as an explicit argument and never read system time.
//! `AsOf` is the bridge for callers that carry the instant as an optional request
//! field.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{ReconciliationError, ReconciliationResult};

/// The reference instant every status and aging computation is evaluated against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AsOf(DateTime<Utc>);

impl AsOf {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(now)
    }

    /// Fails with `MissingReferenceClock` when no instant was supplied.
    pub fn require(now: Option<DateTime<Utc>>) -> ReconciliationResult<Self> {
        now.map(Self).ok_or(ReconciliationError::MissingReferenceClock)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// Calendar date (UTC) billing dates are compared against.
    pub fn today(&self) -> NaiveDate {
        self.0.date_naive()
    }
}

impl From<DateTime<Utc>> for AsOf {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}
