//! Per-service density override rows.

use serde::{Deserialize, Serialize};
use slotbook_core::types::{EntityId, Timestamp};
use sqlx::FromRow;
use validator::Validate;

/// A row from `<tenant>.employee_service_densities`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmployeeServiceDensity {
    pub employee_id: EntityId,
    pub service_id: EntityId,
    pub density: i32,
    pub updated_at: Timestamp,
}

/// A row from `<tenant>.branch_service_densities`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BranchServiceDensity {
    pub branch_id: EntityId,
    pub service_id: EntityId,
    pub density: i32,
    pub updated_at: Timestamp,
}

/// Body for both override endpoints. `-1` clears the override.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetServiceDensity {
    #[validate(range(min = -1))]
    pub density: i32,
}
