//! Route definitions for service-scoped reads, mounted at `/services`.

use axum::routing::get;
use axum::Router;

use crate::handlers::availability;
use crate::state::AppState;

/// ```text
/// GET /{id}/availability -> get_service_availability
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}/availability",
        get(availability::get_service_availability),
    )
}
