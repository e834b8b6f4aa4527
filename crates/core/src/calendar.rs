//! Calendar arithmetic for monthly billing.
//!
//! All helpers operate on `NaiveDate` (no time zone); callers convert instants with
//! `DateTime::date_naive()` before comparing against billing dates.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Number of days in the given calendar month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 0,
    }
}

/// The `day`-th day of the month, clamped to the month's last day.
///
/// Day 31 in February yields Feb 28/29; day 0 is treated as day 1.
pub fn clamp_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = days_in_month(year, month);
    if last == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last))
}

/// `anchor` shifted forward by `months` calendar months.
///
/// Always computed from the anchor (never chained), so an anchor on the 31st clamps
/// per month without drifting: Jan 31 → Feb 29 → Mar 31.
pub fn add_months(anchor: NaiveDate, months: u32) -> DomainResult<NaiveDate> {
    anchor
        .checked_add_months(Months::new(months))
        .ok_or_else(|| DomainError::invariant("calendar overflow while stepping months"))
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// A calendar month, ordered chronologically and rendered as `YYYY-MM`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!("month out of range: {month}")));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The `count` months ending with (and including) `self`, oldest first.
    pub fn trailing(self, count: u32) -> Vec<MonthKey> {
        let mut months = Vec::with_capacity(count as usize);
        let mut cursor = self;
        for _ in 0..count {
            months.push(cursor);
            cursor = cursor.previous();
        }
        months.reverse();
        months
    }
}

impl core::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (year, month) = value
            .split_once('-')
            .ok_or_else(|| DomainError::validation(format!("malformed month key: {value}")))?;
        let year = year
            .parse::<i32>()
            .map_err(|e| DomainError::validation(format!("malformed month key year: {e}")))?;
        let month = month
            .parse::<u32>()
            .map_err(|e| DomainError::validation(format!("malformed month key month: {e}")))?;
        MonthKey::new(year, month)
    }
}
