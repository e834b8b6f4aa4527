//! Status classification of allocated entries against a reference instant.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rentflow_core::calendar::{add_months, days_between};

use crate::config::ReconciliationConfig;
use crate::schedule::ScheduleEntry;

/// Exactly one status per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Paid in full (possibly ahead of its due date).
    Paid,
    /// Part paid and due by today.
    Partial,
    /// Not paid in full and due before today. An entry with a partial payment is
    /// `Partial` instead, so in practice nothing has been paid against it.
    Overdue,
    /// Not yet overdue and due within the current or next billing cycle.
    Pending,
    /// Due beyond the next billing cycle.
    Upcoming,
}

impl EntryStatus {
    pub const ALL: [EntryStatus; 5] = [
        EntryStatus::Paid,
        EntryStatus::Partial,
        EntryStatus::Overdue,
        EntryStatus::Pending,
        EntryStatus::Upcoming,
    ];

    /// Statuses collections treat as arrears.
    pub fn is_arrears(self) -> bool {
        matches!(self, EntryStatus::Overdue | EntryStatus::Partial)
    }
}

/// Classify one allocated entry as of `now`, returning its status and days overdue.
///
/// Precedence: paid, partial, overdue, pending, upcoming.
pub fn classify(
    entry: &ScheduleEntry,
    now: DateTime<Utc>,
    config: &ReconciliationConfig,
) -> (EntryStatus, u32) {
    let today = now.date_naive();

    let status = if entry.paid_amount >= entry.amount_due {
        EntryStatus::Paid
    } else if entry.paid_amount > 0 && entry.due_date <= today {
        EntryStatus::Partial
    } else if entry.due_date < today {
        EntryStatus::Overdue
    } else if entry.due_date <= pending_horizon(today, config.pending_window_months) {
        EntryStatus::Pending
    } else {
        EntryStatus::Upcoming
    };

    let days_overdue = if status.is_arrears() && entry.due_date < today {
        days_between(entry.due_date, today).max(0) as u32
    } else {
        0
    };

    (status, days_overdue)
}

/// Return new entries with `status`, `days_overdue` and `is_paid` populated.
pub fn classify_entries(
    entries: &[ScheduleEntry],
    now: DateTime<Utc>,
    config: &ReconciliationConfig,
) -> Vec<ScheduleEntry> {
    entries
        .iter()
        .map(|entry| {
            let (status, days_overdue) = classify(entry, now, config);
            ScheduleEntry {
                status,
                days_overdue,
                is_paid: entry.paid_amount >= entry.amount_due,
                ..entry.clone()
            }
        })
        .collect()
}

fn pending_horizon(today: NaiveDate, months: u32) -> NaiveDate {
    add_months(today, months).unwrap_or(NaiveDate::MAX)
}
