//! Tenant appointments: the aggregates read by both scheduling paths and the
//! writers used by the booking engine.
//!
//! Overlap counts use half-open intervals (`end_time > start AND start_time < end`)
//! and ignore cancelled rows. Writers take a [`ValidatedBooking`] so that an
//! unchecked booking can not reach the table.

use slotbook_core::booking::ValidatedBooking;
use slotbook_core::lifecycle::{Comment, HistoryEntry, TrackedFields};
use slotbook_core::reconciliation::MirrorRecord;
use slotbook_core::span::Span;
use slotbook_core::tenant::{public_table, TenantContext};
use slotbook_core::types::{EntityId, Timestamp};
use sqlx::types::Json;
use sqlx::PgConnection;

use crate::models::appointment::Appointment;

const APPOINTMENT_COLUMNS: &str = "\
    id, company_id, branch_id, employee_id, service_id, client_id, \
    start_time, end_time, time_zone, is_cancelled, cancel_time, is_fulfilled, \
    is_confirmed_by_client, is_cancelled_by_client, is_cancelled_by_employee, \
    cancelled_employee_id, actual_start_time, actual_end_time, history, comments, \
    created_at, updated_at";

pub struct AppointmentRepo;

impl AppointmentRepo {
    // =======================================================================
    // Reads
    // =======================================================================

    pub async fn find_by_id(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM {} WHERE id = $1",
            tenant.table("appointments")
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Same as [`find_by_id`](Self::find_by_id) but locks the row until the
    /// surrounding transaction ends.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM {} WHERE id = $1 FOR UPDATE",
            tenant.table("appointments")
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Live bookings per `(employee, exact start)` inside `window`.
    pub async fn booking_counts(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_ids: &[EntityId],
        window: Span,
    ) -> Result<Vec<(EntityId, Timestamp, i64)>, sqlx::Error> {
        let query = format!(
            "SELECT employee_id, start_time, COUNT(*) FROM {} \
             WHERE employee_id = ANY($1) AND NOT is_cancelled \
               AND start_time >= $2 AND start_time < $3 \
             GROUP BY employee_id, start_time",
            tenant.table("appointments")
        );
        sqlx::query_as::<_, (EntityId, Timestamp, i64)>(&query)
            .bind(employee_ids)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(conn)
            .await
    }

    /// Live appointments of `employee_id` overlapping `span`.
    pub async fn count_employee_overlaps(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
        span: Span,
        exclude: Option<EntityId>,
    ) -> Result<i64, sqlx::Error> {
        Self::count_overlaps(conn, tenant, "employee_id", employee_id, span, exclude).await
    }

    /// Live appointments at `branch_id` overlapping `span`.
    pub async fn count_branch_overlaps(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        branch_id: EntityId,
        span: Span,
        exclude: Option<EntityId>,
    ) -> Result<i64, sqlx::Error> {
        Self::count_overlaps(conn, tenant, "branch_id", branch_id, span, exclude).await
    }

    /// Live appointments of `client_id` in this company overlapping `span`.
    pub async fn count_client_overlaps(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        client_id: EntityId,
        span: Span,
        exclude: Option<EntityId>,
    ) -> Result<i64, sqlx::Error> {
        Self::count_overlaps(conn, tenant, "client_id", client_id, span, exclude).await
    }

    async fn count_overlaps(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        column: &'static str,
        owner: EntityId,
        span: Span,
        exclude: Option<EntityId>,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM {} \
             WHERE {column} = $1 AND NOT is_cancelled \
               AND end_time > $2 AND start_time < $3 \
               AND ($4::uuid IS NULL OR id <> $4)",
            tenant.table("appointments")
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(owner)
            .bind(span.start)
            .bind(span.end)
            .bind(exclude)
            .fetch_one(conn)
            .await
    }

    /// Every appointment projected onto the mirror shape, for reconciliation.
    pub async fn list_mirror_source(
        conn: &mut PgConnection,
        tenant: &TenantContext,
    ) -> Result<Vec<MirrorRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM {} ORDER BY id",
            tenant.table("appointments")
        );
        let rows = sqlx::query_as::<_, Appointment>(&query)
            .fetch_all(conn)
            .await?;
        Ok(rows.iter().map(Appointment::mirror).collect())
    }

    // =======================================================================
    // Locks
    // =======================================================================

    /// Serialize concurrent bookings that compete for the same capacity.
    ///
    /// Rows are always locked in the order client, branch, employee so that
    /// two bookings can not wait on each other in opposite order.
    pub async fn lock_booking_scopes(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        client_id: EntityId,
        branch_id: EntityId,
        employee_id: EntityId,
    ) -> Result<(), sqlx::Error> {
        let targets = [
            (public_table("clients"), client_id),
            (tenant.table("branches"), branch_id),
            (tenant.table("employees"), employee_id),
        ];
        for (table, id) in targets {
            let query = format!("SELECT id FROM {table} WHERE id = $1 FOR UPDATE");
            sqlx::query(&query).bind(id).fetch_optional(&mut *conn).await?;
        }
        Ok(())
    }

    // =======================================================================
    // Writes
    // =======================================================================

    pub async fn insert(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
        booking: &ValidatedBooking,
    ) -> Result<Appointment, sqlx::Error> {
        let identity = booking.identity();
        let span = booking.span();
        let query = format!(
            "INSERT INTO {} \
             (id, company_id, branch_id, employee_id, service_id, client_id, \
              start_time, end_time, time_zone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {APPOINTMENT_COLUMNS}",
            tenant.table("appointments")
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(identity.company_id)
            .bind(identity.branch_id)
            .bind(identity.employee_id)
            .bind(identity.service_id)
            .bind(identity.client_id)
            .bind(span.start)
            .bind(span.end)
            .bind(booking.time_zone().name())
            .fetch_one(conn)
            .await
    }

    /// Overwrite the tracked fields and append `appended` to the history.
    pub async fn save_tracked(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
        fields: &TrackedFields,
        appended: &[HistoryEntry],
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET \
                start_time = $2, end_time = $3, time_zone = $4, is_cancelled = $5, \
                cancel_time = $6, is_fulfilled = $7, is_confirmed_by_client = $8, \
                is_cancelled_by_client = $9, is_cancelled_by_employee = $10, \
                cancelled_employee_id = $11, actual_start_time = $12, actual_end_time = $13, \
                history = history || $14::jsonb, updated_at = now() \
             WHERE id = $1 \
             RETURNING {APPOINTMENT_COLUMNS}",
            tenant.table("appointments")
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(fields.start_time)
            .bind(fields.end_time)
            .bind(&fields.time_zone)
            .bind(fields.is_cancelled)
            .bind(fields.cancel_time)
            .bind(fields.is_fulfilled)
            .bind(fields.is_confirmed_by_client)
            .bind(fields.is_cancelled_by_client)
            .bind(fields.is_cancelled_by_employee)
            .bind(fields.cancelled_employee_id)
            .bind(fields.actual_start_time)
            .bind(fields.actual_end_time)
            .bind(Json(appended))
            .fetch_one(conn)
            .await
    }

    pub async fn append_comment(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
        comment: &Comment,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET comments = comments || $2::jsonb, updated_at = now() \
             WHERE id = $1 \
             RETURNING {APPOINTMENT_COLUMNS}",
            tenant.table("appointments")
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(Json([comment]))
            .fetch_one(conn)
            .await
    }
}
