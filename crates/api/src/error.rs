use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use slotbook_core::error::CoreError;

/// SQLSTATE codes for transaction conflicts that are safe to replay.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses of
/// the form `{ "error", "code", "reason" }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `slotbook_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Whether the failed transaction may be replayed from the start.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db_err)) => matches!(
                db_err.code().as_deref(),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
            ),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, reason, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => {
                let reason = core.reason();
                match core {
                    CoreError::NotFound { .. } => {
                        (StatusCode::NOT_FOUND, "NOT_FOUND", reason, core.to_string())
                    }
                    CoreError::Validation(msg) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", reason, msg.clone())
                    }
                    CoreError::Referential(_) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "REFERENTIAL_ERROR",
                        reason,
                        core.to_string(),
                    ),
                    CoreError::ScheduleCoverage(msg) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "SCHEDULE_COVERAGE_ERROR",
                        reason,
                        msg.clone(),
                    ),
                    CoreError::CapacityExceeded { .. } => {
                        (StatusCode::CONFLICT, "CAPACITY_ERROR", reason, core.to_string())
                    }
                    CoreError::Overlap(_) => {
                        (StatusCode::CONFLICT, "OVERLAP_ERROR", reason, core.to_string())
                    }
                    CoreError::State(_) => {
                        (StatusCode::CONFLICT, "STATE_ERROR", reason, core.to_string())
                    }
                    CoreError::Unauthorized(msg) => {
                        (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", reason, msg.clone())
                    }
                    CoreError::Forbidden(msg) => {
                        (StatusCode::FORBIDDEN, "FORBIDDEN", reason, msg.clone())
                    }
                    CoreError::Internal(msg) => {
                        tracing::error!(error = %msg, "Internal core error");
                        internal()
                    }
                }
            }

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
            "reason": reason,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "INTERNAL",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, reason and message.
///
/// - `RowNotFound` maps to 404.
/// - The appointment delete trigger (`restrict_violation`) maps to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23001") => (
            StatusCode::CONFLICT,
            "STATE_ERROR",
            "DELETION_FORBIDDEN",
            db_err.message().to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
