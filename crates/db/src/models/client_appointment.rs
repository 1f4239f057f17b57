//! Rows of the cross-tenant `public.client_appointments` mirror.

use serde::Serialize;
use slotbook_core::reconciliation::MirrorRecord;
use slotbook_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClientAppointment {
    pub appointment_id: EntityId,
    pub client_id: EntityId,
    pub company_id: EntityId,
    pub branch_id: EntityId,
    pub employee_id: EntityId,
    pub service_id: EntityId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub time_zone: String,
    pub is_cancelled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<ClientAppointment> for MirrorRecord {
    fn from(row: ClientAppointment) -> Self {
        MirrorRecord {
            appointment_id: row.appointment_id,
            client_id: row.client_id,
            company_id: row.company_id,
            branch_id: row.branch_id,
            employee_id: row.employee_id,
            service_id: row.service_id,
            start_time: row.start_time,
            end_time: row.end_time,
            time_zone: row.time_zone,
            is_cancelled: row.is_cancelled,
        }
    }
}
