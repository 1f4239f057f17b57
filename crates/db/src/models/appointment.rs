//! Tenant appointment rows.

use serde::Serialize;
use slotbook_core::booking::BookingIdentity;
use slotbook_core::lifecycle::{AppointmentStatus, Comment, History, TrackedFields};
use slotbook_core::reconciliation::MirrorRecord;
use slotbook_core::types::{EntityId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from `<tenant>.appointments`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: EntityId,
    pub company_id: EntityId,
    pub branch_id: EntityId,
    pub employee_id: EntityId,
    pub service_id: EntityId,
    pub client_id: EntityId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub time_zone: String,
    pub is_cancelled: bool,
    pub cancel_time: Option<Timestamp>,
    pub is_fulfilled: bool,
    pub is_confirmed_by_client: bool,
    pub is_cancelled_by_client: bool,
    pub is_cancelled_by_employee: bool,
    pub cancelled_employee_id: Option<EntityId>,
    pub actual_start_time: Option<Timestamp>,
    pub actual_end_time: Option<Timestamp>,
    pub history: Json<History>,
    pub comments: Json<Vec<Comment>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Appointment {
    pub fn identity(&self) -> BookingIdentity {
        BookingIdentity {
            company_id: self.company_id,
            branch_id: self.branch_id,
            employee_id: self.employee_id,
            service_id: self.service_id,
            client_id: self.client_id,
        }
    }

    pub fn tracked(&self) -> TrackedFields {
        TrackedFields {
            start_time: self.start_time,
            end_time: self.end_time,
            time_zone: self.time_zone.clone(),
            is_cancelled: self.is_cancelled,
            cancel_time: self.cancel_time,
            is_fulfilled: self.is_fulfilled,
            is_confirmed_by_client: self.is_confirmed_by_client,
            is_cancelled_by_client: self.is_cancelled_by_client,
            is_cancelled_by_employee: self.is_cancelled_by_employee,
            cancelled_employee_id: self.cancelled_employee_id,
            actual_start_time: self.actual_start_time,
            actual_end_time: self.actual_end_time,
        }
    }

    pub fn status(&self) -> AppointmentStatus {
        AppointmentStatus::of(self.is_cancelled, self.is_fulfilled)
    }

    /// The projection this appointment should have in the shared mirror.
    pub fn mirror(&self) -> MirrorRecord {
        MirrorRecord {
            appointment_id: self.id,
            client_id: self.client_id,
            company_id: self.company_id,
            branch_id: self.branch_id,
            employee_id: self.employee_id,
            service_id: self.service_id,
            start_time: self.start_time,
            end_time: self.end_time,
            time_zone: self.time_zone.clone(),
            is_cancelled: self.is_cancelled,
        }
    }
}
