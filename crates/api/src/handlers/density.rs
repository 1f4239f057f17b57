//! Handlers for per-service density overrides. A value of `-1` clears the
//! override so the owner's total applies again.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use slotbook_core::authorization::{require, SchedulingAction};
use slotbook_core::types::EntityId;
use slotbook_db::models::density::SetServiceDensity;

use crate::engine;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::tenant::Tenant;
use crate::response::DataResponse;
use crate::state::AppState;

/// PUT /api/v1/employees/{id}/service-densities/{service_id}
pub async fn set_employee_service_density(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path((employee_id, service_id)): Path<(EntityId, EntityId)>,
    Json(input): Json<SetServiceDensity>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ManageSchedule, &tenant),
    )
    .await?;

    let row = engine::schedule::set_employee_service_density(
        &state.pool,
        &tenant,
        employee_id,
        service_id,
        &input,
    )
    .await?;
    Ok(Json(DataResponse { data: row }))
}

/// PUT /api/v1/branches/{id}/service-densities/{service_id}
pub async fn set_branch_service_density(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path((branch_id, service_id)): Path<(EntityId, EntityId)>,
    Json(input): Json<SetServiceDensity>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ManageSchedule, &tenant),
    )
    .await?;

    let row = engine::schedule::set_branch_service_density(
        &state.pool,
        &tenant,
        branch_id,
        service_id,
        &input,
    )
    .await?;
    Ok(Json(DataResponse { data: row }))
}
