//! Route definitions for appointments, mounted at `/appointments`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::appointment;
use crate::state::AppState;

/// ```text
/// POST   /               -> create_appointment
/// GET    /{id}           -> get_appointment
/// PATCH  /{id}           -> update_appointment
/// DELETE /{id}           -> delete_appointment
/// POST   /{id}/cancel    -> cancel_appointment
/// POST   /{id}/fulfill   -> fulfill_appointment
/// POST   /{id}/comments  -> comment_on_appointment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(appointment::create_appointment))
        .route(
            "/{id}",
            get(appointment::get_appointment)
                .patch(appointment::update_appointment)
                .delete(appointment::delete_appointment),
        )
        .route("/{id}/cancel", post(appointment::cancel_appointment))
        .route("/{id}/fulfill", post(appointment::fulfill_appointment))
        .route("/{id}/comments", post(appointment::comment_on_appointment))
}
