use std::sync::Arc;

use slotbook_core::authorization::AuthorizationGate;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: slotbook_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Consulted before every scheduling operation.
    pub gate: Arc<dyn AuthorizationGate>,
}
