//! Resolves the [`TenantContext`] for a request from the `X-Company-ID` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use slotbook_core::error::CoreError;
use slotbook_core::tenant::TenantContext;
use slotbook_core::types::EntityId;
use slotbook_db::repositories::CompanyRepo;

use crate::error::AppError;
use crate::state::AppState;

pub const COMPANY_HEADER: &str = "x-company-id";

/// The company a request is scoped to. The company is known to exist.
#[derive(Debug, Clone, Copy)]
pub struct Tenant(pub TenantContext);

impl FromRequestParts<AppState> for Tenant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(COMPANY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CoreError::Validation("X-Company-ID header is required".into()))?;

        let company_id: EntityId = raw.parse().map_err(|_| {
            CoreError::Validation(format!("X-Company-ID is not a valid id: '{raw}'"))
        })?;

        let mut conn = state.pool.acquire().await?;
        CompanyRepo::find_by_id(&mut conn, company_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "company",
                id: company_id,
            })?;

        Ok(Tenant(TenantContext::new(company_id)))
    }
}
