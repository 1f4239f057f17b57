//! Handlers for employee work ranges.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use slotbook_core::authorization::{require, SchedulingAction};
use slotbook_core::types::EntityId;

use crate::engine;
use crate::engine::schedule::{NewWorkRange, WorkRangeServices};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::tenant::Tenant;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/employees/{id}/work-ranges
///
/// Times are interpreted in `time_zone` and stored in the branch zone.
pub async fn create_work_range(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path(employee_id): Path<EntityId>,
    Json(input): Json<NewWorkRange>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ManageSchedule, &tenant),
    )
    .await?;

    let range = engine::schedule::create_work_range(
        &state.pool,
        &tenant,
        employee_id,
        input,
        engine::now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: range })))
}

/// GET /api/v1/employees/{id}/work-ranges
pub async fn list_work_ranges(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path(employee_id): Path<EntityId>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ManageSchedule, &tenant),
    )
    .await?;

    let ranges = engine::schedule::list_work_ranges(&state.pool, &tenant, employee_id).await?;
    Ok(Json(DataResponse { data: ranges }))
}

/// GET /api/v1/employees/{id}/work-ranges/{range_id}
pub async fn get_work_range(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path((employee_id, range_id)): Path<(EntityId, EntityId)>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ManageSchedule, &tenant),
    )
    .await?;

    let range = engine::schedule::get_work_range(&state.pool, &tenant, employee_id, range_id).await?;
    Ok(Json(DataResponse { data: range }))
}

/// PUT /api/v1/employees/{id}/work-ranges/{range_id}
///
/// Replaces the range; the body has the same shape as on create.
pub async fn update_work_range(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path((employee_id, range_id)): Path<(EntityId, EntityId)>,
    Json(input): Json<NewWorkRange>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ManageSchedule, &tenant),
    )
    .await?;

    let range = engine::schedule::update_work_range(
        &state.pool,
        &tenant,
        employee_id,
        range_id,
        input,
        engine::now(),
    )
    .await?;
    Ok(Json(DataResponse { data: range }))
}

/// DELETE /api/v1/employees/{id}/work-ranges/{range_id}
pub async fn delete_work_range(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path((employee_id, range_id)): Path<(EntityId, EntityId)>,
) -> AppResult<StatusCode> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ManageSchedule, &tenant),
    )
    .await?;

    engine::schedule::delete_work_range(&state.pool, &tenant, employee_id, range_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/employees/{id}/work-ranges/{range_id}/services
pub async fn add_work_range_services(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path((employee_id, range_id)): Path<(EntityId, EntityId)>,
    Json(input): Json<WorkRangeServices>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ManageSchedule, &tenant),
    )
    .await?;

    let range =
        engine::schedule::add_work_range_services(&state.pool, &tenant, employee_id, range_id, &input)
            .await?;
    Ok(Json(DataResponse { data: range }))
}

/// DELETE /api/v1/employees/{id}/work-ranges/{range_id}/services/{service_id}
pub async fn remove_work_range_service(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path((employee_id, range_id, service_id)): Path<(EntityId, EntityId, EntityId)>,
) -> AppResult<StatusCode> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ManageSchedule, &tenant),
    )
    .await?;

    engine::schedule::remove_work_range_service(
        &state.pool,
        &tenant,
        employee_id,
        range_id,
        service_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
