//! Handlers for appointment booking and lifecycle.
//!
//! A `client` token may only act on its own appointments; staff tokens are
//! scoped by the gate to their company.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use slotbook_core::authorization::{require, Role, SchedulingAction};
use slotbook_core::booking::BookingRequest;
use slotbook_core::lifecycle::{AppointmentPatch, CancelActor, NewComment};
use slotbook_core::types::EntityId;
use slotbook_db::models::appointment::Appointment;

use super::ensure_own_client;
use crate::engine;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::tenant::Tenant;
use crate::response::DataResponse;
use crate::state::AppState;

fn cancel_actor(user: &AuthUser) -> CancelActor {
    match user.role {
        Role::Client => CancelActor::Client,
        Role::Employee => CancelActor::Employee(user.user_id),
        Role::Admin => CancelActor::System,
    }
}

/// Fetch and check ownership before a client-reachable mutation.
async fn load_owned(state: &AppState, user: &AuthUser, tenant: &Tenant, id: EntityId) -> AppResult<Appointment> {
    let appointment = engine::booking::get_appointment(&state.pool, &tenant.0, id).await?;
    ensure_own_client(user, Some(appointment.client_id))?;
    Ok(appointment)
}

// ---------------------------------------------------------------------------
// Create / read
// ---------------------------------------------------------------------------

/// POST /api/v1/appointments
pub async fn create_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Json(input): Json<BookingRequest>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::CreateAppointment, &tenant),
    )
    .await?;
    ensure_own_client(&user, input.client_id)?;

    let appointment = engine::booking::create_appointment(
        &state.pool,
        &state.config.booking,
        &tenant,
        input,
        engine::now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: appointment })))
}

/// GET /api/v1/appointments/{id}
pub async fn get_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    tenant: Tenant,
    Path(id): Path<EntityId>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ViewAppointment, &tenant.0),
    )
    .await?;
    let appointment = load_owned(&state, &user, &tenant, id).await?;
    Ok(Json(DataResponse { data: appointment }))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// PATCH /api/v1/appointments/{id}
pub async fn update_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path(id): Path<EntityId>,
    Json(patch): Json<AppointmentPatch>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::UpdateAppointment, &tenant),
    )
    .await?;

    let appointment = engine::booking::update_appointment(
        &state.pool,
        &state.config.booking,
        &tenant,
        id,
        &patch,
        engine::now(),
    )
    .await?;

    Ok(Json(DataResponse { data: appointment }))
}

/// POST /api/v1/appointments/{id}/cancel
pub async fn cancel_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    tenant: Tenant,
    Path(id): Path<EntityId>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::CancelAppointment, &tenant.0),
    )
    .await?;
    load_owned(&state, &user, &tenant, id).await?;

    let appointment = engine::booking::cancel_appointment(
        &state.pool,
        &state.config.booking,
        &tenant.0,
        id,
        cancel_actor(&user),
        engine::now(),
    )
    .await?;

    Ok(Json(DataResponse { data: appointment }))
}

/// POST /api/v1/appointments/{id}/fulfill
pub async fn fulfill_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path(id): Path<EntityId>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::FulfillAppointment, &tenant),
    )
    .await?;

    let appointment = engine::booking::fulfill_appointment(
        &state.pool,
        &state.config.booking,
        &tenant,
        id,
        engine::now(),
    )
    .await?;

    Ok(Json(DataResponse { data: appointment }))
}

/// POST /api/v1/appointments/{id}/comments
pub async fn comment_on_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path(id): Path<EntityId>,
    Json(input): Json<NewComment>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::CommentAppointment, &tenant),
    )
    .await?;

    let appointment = engine::booking::comment_on_appointment(
        &state.pool,
        &tenant,
        id,
        user.user_id,
        input,
        engine::now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: appointment })))
}

/// DELETE /api/v1/appointments/{id}
///
/// Always refused. Appointments leave the schedule by cancellation only.
pub async fn delete_appointment(
    _user: AuthUser,
    _tenant: Tenant,
    Path(_id): Path<EntityId>,
) -> AppResult<StatusCode> {
    engine::booking::delete_appointment()?;
    Ok(StatusCode::NO_CONTENT)
}
