//! Route definitions for branches, mounted at `/branches`.

use axum::routing::put;
use axum::Router;

use crate::handlers::density;
use crate::state::AppState;

/// ```text
/// PUT /{id}/service-densities/{service_id} -> set_branch_service_density
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}/service-densities/{service_id}",
        put(density::set_branch_service_density),
    )
}
