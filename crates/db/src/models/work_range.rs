//! Employee work range rows.

use chrono::NaiveTime;
use serde::Serialize;
use slotbook_core::error::CoreError;
use slotbook_core::schedule::{weekday_from_index, WorkRange};
use slotbook_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

use super::catalog::stored_zone;

/// A row from `<tenant>.employee_work_ranges` with its bookable services.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkRangeRow {
    pub id: EntityId,
    pub employee_id: EntityId,
    pub branch_id: EntityId,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub time_zone: String,
    pub service_ids: Vec<EntityId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkRangeRow {
    pub fn into_range(self) -> Result<WorkRange, CoreError> {
        let weekday = weekday_from_index(self.weekday)
            .map_err(|e| CoreError::Internal(format!("work range {}: {e}", self.id)))?;
        Ok(WorkRange {
            id: self.id,
            employee_id: self.employee_id,
            branch_id: self.branch_id,
            weekday,
            start: self.start_time,
            end: self.end_time,
            time_zone: stored_zone(&self.time_zone, "work range", self.id)?,
            service_ids: self.service_ids,
        })
    }
}
