//! Route definitions for employee schedule administration, mounted at `/employees`.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{density, work_range};
use crate::state::AppState;

/// ```text
/// GET    /{id}/work-ranges                                     -> list_work_ranges
/// POST   /{id}/work-ranges                                     -> create_work_range
/// GET    /{id}/work-ranges/{range_id}                          -> get_work_range
/// PUT    /{id}/work-ranges/{range_id}                          -> update_work_range
/// DELETE /{id}/work-ranges/{range_id}                          -> delete_work_range
/// POST   /{id}/work-ranges/{range_id}/services                 -> add_work_range_services
/// DELETE /{id}/work-ranges/{range_id}/services/{service_id}    -> remove_work_range_service
/// PUT    /{id}/service-densities/{service_id}                  -> set_employee_service_density
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/work-ranges",
            get(work_range::list_work_ranges).post(work_range::create_work_range),
        )
        .route(
            "/{id}/work-ranges/{range_id}",
            get(work_range::get_work_range)
                .put(work_range::update_work_range)
                .delete(work_range::delete_work_range),
        )
        .route(
            "/{id}/work-ranges/{range_id}/services",
            post(work_range::add_work_range_services),
        )
        .route(
            "/{id}/work-ranges/{range_id}/services/{service_id}",
            delete(work_range::remove_work_range_service),
        )
        .route(
            "/{id}/service-densities/{service_id}",
            put(density::set_employee_service_density),
        )
}
