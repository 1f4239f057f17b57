//! The booking write path and appointment lifecycle.
//!
//! Each mutation runs in one transaction that also writes the client's
//! cross-tenant mirror row. Under [`CapacityEnforcement::Strict`] the client,
//! branch and employee rows are locked before anything is counted.

use slotbook_core::booking::{BookingFacts, BookingRequest, PendingBooking, TimedBooking};
use slotbook_core::capacity::DensityUsage;
use slotbook_core::catalog::UNLIMITED_DENSITY;
use slotbook_core::error::{CoreError, ReferentialViolation, StateViolation};
use slotbook_core::lifecycle::{
    state_machine, AppointmentAction, AppointmentPatch, CancelActor, FieldChange, History,
    NewComment, TrackedFields,
};
use slotbook_core::schedule::WorkRange;
use slotbook_core::tenant::TenantContext;
use slotbook_core::types::{EntityId, Timestamp};
use slotbook_db::models::appointment::Appointment;
use slotbook_db::repositories::{
    AppointmentRepo, CatalogRepo, ClientAppointmentRepo, ClientRepo, DensityRepo, WorkRangeRepo,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::retry::with_retry;
use crate::config::{BookingPolicy, CapacityEnforcement};
use crate::error::AppResult;

fn not_found(id: EntityId) -> CoreError {
    CoreError::NotFound {
        entity: "appointment",
        id,
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

pub async fn create_appointment(
    pool: &PgPool,
    policy: &BookingPolicy,
    tenant: &TenantContext,
    request: BookingRequest,
    now: Timestamp,
) -> AppResult<Appointment> {
    let pending = PendingBooking::new(request, tenant.company_id(), now)?;
    with_retry("create_appointment", policy.max_attempts, || {
        let pending = pending.clone();
        async move { create_once(pool, policy, tenant, pending).await }
    })
    .await
}

async fn create_once(
    pool: &PgPool,
    policy: &BookingPolicy,
    tenant: &TenantContext,
    pending: PendingBooking,
) -> AppResult<Appointment> {
    let identity = *pending.identity();
    let mut tx = pool.begin().await?;

    ClientRepo::find_by_id(&mut tx, identity.client_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "client",
            id: identity.client_id,
        })?;
    lock_scopes(&mut tx, policy, tenant, &pending).await?;

    let service = CatalogRepo::find_service(&mut tx, tenant, identity.service_id)
        .await?
        .map(|s| s.profile());
    let timed = pending.with_service(service.as_ref())?;
    let facts = load_facts(&mut tx, tenant, &timed).await?;
    let validated = timed.validate(&facts).inspect_err(|e| {
        tracing::debug!(
            company_id = %tenant.company_id(),
            client_id = %identity.client_id,
            reason = e.reason(),
            "Booking rejected",
        );
    })?;

    let appointment = AppointmentRepo::insert(&mut tx, tenant, Uuid::now_v7(), &validated).await?;
    ClientAppointmentRepo::upsert(&mut tx, &appointment.mirror()).await?;
    tx.commit().await?;

    tracing::info!(
        appointment_id = %appointment.id,
        company_id = %appointment.company_id,
        employee_id = %appointment.employee_id,
        start_time = %appointment.start_time,
        "Appointment created",
    );
    Ok(appointment)
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Apply a PATCH. Schedule-relevant changes re-run the full validation with
/// the appointment itself excluded from every overlap count.
pub async fn update_appointment(
    pool: &PgPool,
    policy: &BookingPolicy,
    tenant: &TenantContext,
    id: EntityId,
    patch: &AppointmentPatch,
    now: Timestamp,
) -> AppResult<Appointment> {
    with_retry("update_appointment", policy.max_attempts, || {
        update_once(pool, policy, tenant, id, patch, now)
    })
    .await
}

async fn update_once(
    pool: &PgPool,
    policy: &BookingPolicy,
    tenant: &TenantContext,
    id: EntityId,
    patch: &AppointmentPatch,
    now: Timestamp,
) -> AppResult<Appointment> {
    let mut tx = pool.begin().await?;
    let current = AppointmentRepo::find_for_update(&mut tx, tenant, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    patch.ensure_identity_unchanged(&current.identity())?;
    state_machine::ensure_allowed(current.status(), AppointmentAction::Update, current.start_time, now)?;

    let service = CatalogRepo::find_service(&mut tx, tenant, current.service_id)
        .await?
        .ok_or(CoreError::Referential(ReferentialViolation::ServiceNotInCompany))?
        .profile();

    let before = current.tracked();
    let after = patch.apply(&before, service.duration_minutes)?;
    let changes = before.diff(&after);
    if changes.is_empty() {
        tx.commit().await?;
        return Ok(current);
    }

    if changes.iter().any(FieldChange::is_schedule_relevant) {
        let pending = PendingBooking::reschedule(
            id,
            current.identity(),
            after.start_time,
            &after.time_zone,
            now,
        )?;
        lock_scopes(&mut tx, policy, tenant, &pending).await?;
        let timed = pending.with_service(Some(&service))?;
        let facts = load_facts(&mut tx, tenant, &timed).await?;
        timed.validate(&facts)?;
    }

    let saved = persist_changes(&mut tx, tenant, id, &after, changes, now).await?;
    tx.commit().await?;

    tracing::info!(appointment_id = %id, company_id = %tenant.company_id(), "Appointment updated");
    Ok(saved)
}

// ---------------------------------------------------------------------------
// Cancel / fulfill
// ---------------------------------------------------------------------------

pub async fn cancel_appointment(
    pool: &PgPool,
    policy: &BookingPolicy,
    tenant: &TenantContext,
    id: EntityId,
    actor: CancelActor,
    now: Timestamp,
) -> AppResult<Appointment> {
    with_retry("cancel_appointment", policy.max_attempts, || {
        transition(pool, tenant, id, AppointmentAction::Cancel, now, move |fields| {
            fields.cancelled(actor, now)
        })
    })
    .await
}

pub async fn fulfill_appointment(
    pool: &PgPool,
    policy: &BookingPolicy,
    tenant: &TenantContext,
    id: EntityId,
    now: Timestamp,
) -> AppResult<Appointment> {
    with_retry("fulfill_appointment", policy.max_attempts, || {
        transition(pool, tenant, id, AppointmentAction::Fulfill, now, TrackedFields::fulfilled)
    })
    .await
}

/// Move an active appointment to a terminal status.
async fn transition(
    pool: &PgPool,
    tenant: &TenantContext,
    id: EntityId,
    action: AppointmentAction,
    now: Timestamp,
    apply: impl FnOnce(&TrackedFields) -> TrackedFields,
) -> AppResult<Appointment> {
    let mut tx = pool.begin().await?;
    let current = AppointmentRepo::find_for_update(&mut tx, tenant, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let status = state_machine::ensure_allowed(current.status(), action, current.start_time, now)?;

    let before = current.tracked();
    let after = apply(&before);
    let changes = before.diff(&after);
    let saved = persist_changes(&mut tx, tenant, id, &after, changes, now).await?;
    tx.commit().await?;

    tracing::info!(
        appointment_id = %id,
        company_id = %tenant.company_id(),
        ?status,
        "Appointment status changed",
    );
    Ok(saved)
}

// ---------------------------------------------------------------------------
// Comments and reads
// ---------------------------------------------------------------------------

pub async fn comment_on_appointment(
    pool: &PgPool,
    tenant: &TenantContext,
    id: EntityId,
    author_id: EntityId,
    input: NewComment,
    now: Timestamp,
) -> AppResult<Appointment> {
    let comment = input.into_comment(author_id, now)?;

    let mut tx = pool.begin().await?;
    let current = AppointmentRepo::find_for_update(&mut tx, tenant, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    state_machine::ensure_allowed(current.status(), AppointmentAction::Comment, current.start_time, now)?;

    let saved = AppointmentRepo::append_comment(&mut tx, tenant, id, &comment).await?;
    tx.commit().await?;

    tracing::info!(appointment_id = %id, %author_id, "Appointment comment added");
    Ok(saved)
}

pub async fn get_appointment(
    pool: &PgPool,
    tenant: &TenantContext,
    id: EntityId,
) -> AppResult<Appointment> {
    let mut conn = pool.acquire().await?;
    let appointment = AppointmentRepo::find_by_id(&mut conn, tenant, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(appointment)
}

/// Appointments are never deleted; cancellation is the only way out.
pub fn delete_appointment() -> AppResult<()> {
    Err(CoreError::State(StateViolation::DeletionForbidden).into())
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

async fn lock_scopes(
    conn: &mut PgConnection,
    policy: &BookingPolicy,
    tenant: &TenantContext,
    pending: &PendingBooking,
) -> AppResult<()> {
    if policy.capacity == CapacityEnforcement::Strict {
        let identity = pending.identity();
        AppointmentRepo::lock_booking_scopes(
            conn,
            tenant,
            identity.client_id,
            identity.branch_id,
            identity.employee_id,
        )
        .await?;
    }
    Ok(())
}

/// Everything [`TimedBooking::validate`] needs, read on the booking transaction.
async fn load_facts(
    conn: &mut PgConnection,
    tenant: &TenantContext,
    timed: &TimedBooking,
) -> AppResult<BookingFacts> {
    let identity = *timed.identity();
    let span = timed.span();
    let exclude = timed.existing();

    let branch = CatalogRepo::find_branch(conn, tenant, identity.branch_id)
        .await?
        .map(|b| b.profile())
        .transpose()?;
    let employee = CatalogRepo::find_employee(conn, tenant, identity.employee_id)
        .await?
        .map(|e| e.profile())
        .transpose()?;

    let service_at_branch =
        CatalogRepo::service_offered_at_branch(conn, tenant, identity.service_id, identity.branch_id).await?;
    let employee_offers_service =
        CatalogRepo::employee_offers_service(conn, tenant, identity.employee_id, identity.service_id).await?;
    let employee_at_branch =
        CatalogRepo::employee_works_at_branch(conn, tenant, identity.employee_id, identity.branch_id).await?;

    let work_ranges = WorkRangeRepo::list_for_employee_at_branch(
        conn,
        tenant,
        identity.employee_id,
        identity.branch_id,
    )
    .await?
    .into_iter()
    .map(|row| row.into_range())
    .collect::<Result<Vec<WorkRange>, _>>()?;

    let employee_usage = DensityUsage {
        overlapping: AppointmentRepo::count_employee_overlaps(conn, tenant, identity.employee_id, span, exclude)
            .await?,
        total_density: employee
            .as_ref()
            .map_or(UNLIMITED_DENSITY, |e| e.total_service_density),
        service_density: DensityRepo::employee_service_density(
            conn,
            tenant,
            identity.employee_id,
            identity.service_id,
        )
        .await?,
    };
    let branch_usage = DensityUsage {
        overlapping: AppointmentRepo::count_branch_overlaps(conn, tenant, identity.branch_id, span, exclude)
            .await?,
        total_density: branch
            .as_ref()
            .map_or(UNLIMITED_DENSITY, |b| b.total_service_density),
        service_density: DensityRepo::branch_service_density(
            conn,
            tenant,
            identity.branch_id,
            identity.service_id,
        )
        .await?,
    };

    let client_overlaps_same_tenant =
        AppointmentRepo::count_client_overlaps(conn, tenant, identity.client_id, span, exclude).await?;
    let client_overlaps_cross_tenant = ClientAppointmentRepo::count_cross_tenant_overlaps(
        conn,
        identity.client_id,
        identity.company_id,
        span,
    )
    .await?;

    Ok(BookingFacts {
        branch,
        employee,
        service_at_branch,
        employee_offers_service,
        employee_at_branch,
        work_ranges,
        employee_usage,
        branch_usage,
        client_overlaps_same_tenant,
        client_overlaps_cross_tenant,
    })
}

/// Write `after`, append the changes to the history and resync the mirror.
async fn persist_changes(
    conn: &mut PgConnection,
    tenant: &TenantContext,
    id: EntityId,
    after: &TrackedFields,
    changes: Vec<FieldChange>,
    now: Timestamp,
) -> AppResult<Appointment> {
    let mut appended = History::default();
    appended.record(changes, now);
    let saved = AppointmentRepo::save_tracked(conn, tenant, id, after, appended.entries()).await?;
    ClientAppointmentRepo::upsert(conn, &saved.mirror()).await?;
    Ok(saved)
}
