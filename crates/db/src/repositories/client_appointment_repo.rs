//! The shared `client_appointments` mirror.
//!
//! Every tenant appointment write upserts its mirror row in the same
//! transaction. The mirror is what lets a booking in one company see the
//! client's appointments in every other company.

use slotbook_core::reconciliation::MirrorRecord;
use slotbook_core::span::Span;
use slotbook_core::tenant::{public_table, TenantContext};
use slotbook_core::types::{EntityId, Timestamp};
use sqlx::PgConnection;

use crate::models::client_appointment::ClientAppointment;

const MIRROR_COLUMNS: &str = "\
    appointment_id, client_id, company_id, branch_id, employee_id, service_id, \
    start_time, end_time, time_zone, is_cancelled, created_at, updated_at";

pub struct ClientAppointmentRepo;

impl ClientAppointmentRepo {
    /// Insert the mirror row or overwrite it with `record`.
    pub async fn upsert(
        conn: &mut PgConnection,
        record: &MirrorRecord,
    ) -> Result<ClientAppointment, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} \
             (appointment_id, client_id, company_id, branch_id, employee_id, service_id, \
              start_time, end_time, time_zone, is_cancelled) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (appointment_id) DO UPDATE SET \
                client_id = EXCLUDED.client_id, company_id = EXCLUDED.company_id, \
                branch_id = EXCLUDED.branch_id, employee_id = EXCLUDED.employee_id, \
                service_id = EXCLUDED.service_id, start_time = EXCLUDED.start_time, \
                end_time = EXCLUDED.end_time, time_zone = EXCLUDED.time_zone, \
                is_cancelled = EXCLUDED.is_cancelled, updated_at = now() \
             RETURNING {MIRROR_COLUMNS}",
            public_table("client_appointments")
        );
        sqlx::query_as::<_, ClientAppointment>(&query)
            .bind(record.appointment_id)
            .bind(record.client_id)
            .bind(record.company_id)
            .bind(record.branch_id)
            .bind(record.employee_id)
            .bind(record.service_id)
            .bind(record.start_time)
            .bind(record.end_time)
            .bind(&record.time_zone)
            .bind(record.is_cancelled)
            .fetch_one(conn)
            .await
    }

    pub async fn find(
        conn: &mut PgConnection,
        appointment_id: EntityId,
    ) -> Result<Option<ClientAppointment>, sqlx::Error> {
        let query = format!(
            "SELECT {MIRROR_COLUMNS} FROM {} WHERE appointment_id = $1",
            public_table("client_appointments")
        );
        sqlx::query_as::<_, ClientAppointment>(&query)
            .bind(appointment_id)
            .fetch_optional(conn)
            .await
    }

    /// Live mirrors of `client_id` in companies other than `company_id`
    /// overlapping `span`.
    pub async fn count_cross_tenant_overlaps(
        conn: &mut PgConnection,
        client_id: EntityId,
        company_id: EntityId,
        span: Span,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM {} \
             WHERE client_id = $1 AND company_id <> $2 AND NOT is_cancelled \
               AND end_time > $3 AND start_time < $4",
            public_table("client_appointments")
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(client_id)
            .bind(company_id)
            .bind(span.start)
            .bind(span.end)
            .fetch_one(conn)
            .await
    }

    /// Intervals of every live appointment the client holds, in any company,
    /// that touch `window`.
    pub async fn spans_for_client(
        conn: &mut PgConnection,
        client_id: EntityId,
        window: Span,
    ) -> Result<Vec<Span>, sqlx::Error> {
        let query = format!(
            "SELECT start_time, end_time FROM {} \
             WHERE client_id = $1 AND NOT is_cancelled \
               AND end_time > $2 AND start_time < $3 \
             ORDER BY start_time",
            public_table("client_appointments")
        );
        let rows = sqlx::query_as::<_, (Timestamp, Timestamp)>(&query)
            .bind(client_id)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(start, end)| Span::new(start, end))
            .collect())
    }

    pub async fn list_for_company(
        conn: &mut PgConnection,
        company_id: EntityId,
    ) -> Result<Vec<MirrorRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {MIRROR_COLUMNS} FROM {} WHERE company_id = $1 ORDER BY appointment_id",
            public_table("client_appointments")
        );
        let rows = sqlx::query_as::<_, ClientAppointment>(&query)
            .bind(company_id)
            .fetch_all(conn)
            .await?;
        Ok(rows.into_iter().map(MirrorRecord::from).collect())
    }

    /// Cancel mirrors of `tenant` whose appointment no longer exists.
    /// Mirrors whose appointment is present are left alone whatever the
    /// caller saw. Returns rows touched.
    pub async fn mark_orphaned(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        appointment_ids: &[EntityId],
    ) -> Result<u64, sqlx::Error> {
        if appointment_ids.is_empty() {
            return Ok(0);
        }
        let query = format!(
            "UPDATE {mirrors} m SET is_cancelled = true, updated_at = now() \
             WHERE m.appointment_id = ANY($1) AND m.company_id = $2 AND NOT m.is_cancelled \
               AND NOT EXISTS (SELECT 1 FROM {appointments} a WHERE a.id = m.appointment_id)",
            mirrors = public_table("client_appointments"),
            appointments = tenant.table("appointments"),
        );
        let result = sqlx::query(&query)
            .bind(appointment_ids)
            .bind(tenant.company_id())
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
