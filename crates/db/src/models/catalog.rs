//! Tenant catalog rows: branches, employees and services.

use serde::{Deserialize, Serialize};
use slotbook_core::catalog::{BranchProfile, EmployeeProfile, ServiceProfile};
use slotbook_core::error::CoreError;
use slotbook_core::timezone::parse_time_zone;
use slotbook_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Branch
// ---------------------------------------------------------------------------

/// A row from `<tenant>.branches`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Branch {
    pub id: EntityId,
    pub company_id: EntityId,
    pub name: String,
    pub time_zone: String,
    pub total_service_density: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Branch {
    pub fn profile(&self) -> Result<BranchProfile, CoreError> {
        Ok(BranchProfile {
            id: self.id,
            company_id: self.company_id,
            name: self.name.clone(),
            time_zone: stored_zone(&self.time_zone, "branch", self.id)?,
            total_service_density: self.total_service_density,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBranch {
    pub name: String,
    pub time_zone: String,
    pub total_service_density: Option<i32>,
}

// ---------------------------------------------------------------------------
// Employee
// ---------------------------------------------------------------------------

/// A row from `<tenant>.employees`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Employee {
    pub id: EntityId,
    pub company_id: EntityId,
    pub name: String,
    pub surname: String,
    pub time_zone: String,
    pub slot_granularity: i32,
    pub total_service_density: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Employee {
    pub fn profile(&self) -> Result<EmployeeProfile, CoreError> {
        Ok(EmployeeProfile {
            id: self.id,
            company_id: self.company_id,
            name: self.name.clone(),
            surname: self.surname.clone(),
            time_zone: stored_zone(&self.time_zone, "employee", self.id)?,
            slot_granularity: self.slot_granularity,
            total_service_density: self.total_service_density,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEmployee {
    pub name: String,
    pub surname: String,
    pub time_zone: String,
    pub slot_granularity: i32,
    pub total_service_density: i32,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// A row from `<tenant>.services`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Service {
    pub id: EntityId,
    pub company_id: EntityId,
    pub name: String,
    pub duration_minutes: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Service {
    pub fn profile(&self) -> ServiceProfile {
        ServiceProfile {
            id: self.id,
            company_id: self.company_id,
            name: self.name.clone(),
            duration_minutes: self.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateService {
    pub name: String,
    pub duration_minutes: i32,
}

/// Stored zones were validated on write; a bad one is data corruption.
pub(crate) fn stored_zone(
    raw: &str,
    entity: &str,
    id: EntityId,
) -> Result<chrono_tz::Tz, CoreError> {
    parse_time_zone(raw)
        .map_err(|_| CoreError::Internal(format!("{entity} {id} has invalid time zone '{raw}'")))
}
