//! Read-only views of the tenant catalog the scheduler consults.
//!
//! The scheduler never mutates these; they are loaded by the repository
//! layer and handed to the pure components.

use chrono_tz::Tz;
use serde::Serialize;

use crate::types::{EntityId, Minutes};

/// Density value meaning "no cap configured".
pub const UNLIMITED_DENSITY: i32 = -1;

/// Convert a stored density value to an optional limit (negative = none).
pub fn density_limit(raw: i32) -> Option<i64> {
    (raw >= 0).then_some(i64::from(raw))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceProfile {
    pub id: EntityId,
    pub company_id: EntityId,
    pub name: String,
    pub duration_minutes: Minutes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeProfile {
    pub id: EntityId,
    pub company_id: EntityId,
    pub name: String,
    pub surname: String,
    pub time_zone: Tz,
    pub slot_granularity: Minutes,
    pub total_service_density: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchProfile {
    pub id: EntityId,
    pub company_id: EntityId,
    pub name: String,
    pub time_zone: Tz,
    /// `UNLIMITED_DENSITY` when the branch has no cap.
    pub total_service_density: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_density_means_unlimited() {
        assert_eq!(density_limit(UNLIMITED_DENSITY), None);
        assert_eq!(density_limit(0), Some(0));
        assert_eq!(density_limit(3), Some(3));
    }
}
