//! Handler for the service availability search.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use slotbook_core::authorization::{require, SchedulingAction};
use slotbook_core::availability::AvailabilityParams;
use slotbook_core::types::EntityId;

use super::ensure_own_client;
use crate::engine;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::tenant::Tenant;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/services/{id}/availability
///
/// Dates and start times at which each employee can take the service.
pub async fn get_service_availability(
    State(state): State<AppState>,
    user: AuthUser,
    Tenant(tenant): Tenant,
    Path(service_id): Path<EntityId>,
    Query(params): Query<AvailabilityParams>,
) -> AppResult<impl IntoResponse> {
    require(
        state.gate.as_ref(),
        user.request(SchedulingAction::ViewAvailability, &tenant),
    )
    .await?;
    if let Some(client_id) = params.client_id()? {
        ensure_own_client(&user, Some(client_id))?;
    }

    let availability = engine::availability::service_availability(
        &state.pool,
        &tenant,
        service_id,
        &params,
        engine::now(),
    )
    .await?;

    Ok(Json(DataResponse { data: availability }))
}
