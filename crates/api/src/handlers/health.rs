//! Liveness and database reachability.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    /// `ok` when Postgres answers, `degraded` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
}

/// GET /api/v1/health
///
/// Public; the only route that needs neither a token nor a company.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let database = slotbook_db::health_check(&state.pool).await.is_ok();
    if !database {
        tracing::warn!("Health check could not reach the database");
    }
    Json(Health {
        status: if database { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
