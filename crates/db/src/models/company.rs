//! Shared-schema rows: companies and clients.

use serde::{Deserialize, Serialize};
use slotbook_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

/// A row from `public.companies`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub id: EntityId,
    pub name: String,
    pub schema_name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompany {
    pub name: String,
}

/// A row from `public.clients`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Client {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub time_zone: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClient {
    pub name: String,
    pub email: String,
    pub time_zone: Option<String>,
}
