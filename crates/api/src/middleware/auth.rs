//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use slotbook_core::authorization::{AccessRequest, Role, SchedulingAction, Subject};
use slotbook_core::error::CoreError;
use slotbook_core::tenant::TenantContext;
use slotbook_core::types::EntityId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: EntityId,
    pub role: Role,
    /// Company of a staff account.
    pub company_id: Option<EntityId>,
    /// Client record a `client` token acts for.
    pub client_id: Option<EntityId>,
}

impl AuthUser {
    pub fn subject(&self) -> Subject {
        Subject {
            user_id: self.user_id,
            role: self.role,
            company_id: self.company_id,
        }
    }

    /// Build the gate question for `action` inside `tenant`.
    pub fn request(&self, action: SchedulingAction, tenant: &TenantContext) -> AccessRequest {
        AccessRequest {
            subject: self.subject(),
            action,
            company_id: tenant.company_id(),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let role = Role::parse(&claims.role).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(format!(
                "Unknown role '{}'",
                claims.role
            )))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role,
            company_id: claims.company_id,
            client_id: claims.client_id,
        })
    }
}
