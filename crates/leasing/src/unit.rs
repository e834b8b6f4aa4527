use serde::{Deserialize, Serialize};

use rentflow_core::{PropertyId, UnitId};

/// A rentable unit and the property it belongs to.
///
/// Leases reference units; property-scoped views resolve a lease's property through
/// this row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub property_id: PropertyId,
    pub label: String,
}

impl Unit {
    pub fn new(id: UnitId, property_id: PropertyId, label: impl Into<String>) -> Self {
        Self {
            id,
            property_id,
            label: label.into(),
        }
    }
}
