pub mod appointment;
pub mod branch;
pub mod employee;
pub mod service;

use axum::routing::get;
use axum::Router;

use crate::handlers::health;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                                          service and database health (public)
///
/// /services/{id}/availability                      availability search (GET)
///
/// /appointments                                    create (POST)
/// /appointments/{id}                               get, update, delete (always refused)
/// /appointments/{id}/cancel                        cancel (POST)
/// /appointments/{id}/fulfill                       fulfill (POST)
/// /appointments/{id}/comments                      add comment (POST)
///
/// /employees/{id}/work-ranges                      list, create
/// /employees/{id}/work-ranges/{range_id}           get, replace, delete
/// /employees/{id}/work-ranges/{range_id}/services  add services; remove one at .../{service_id}
/// /employees/{id}/service-densities/{service_id}   set override (PUT)
/// /branches/{id}/service-densities/{service_id}    set override (PUT)
/// ```
///
/// Everything except `/health` needs a bearer token and `X-Company-ID`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .nest("/services", service::router())
        .nest("/appointments", appointment::router())
        .nest("/employees", employee::router())
        .nest("/branches", branch::router())
}
