//! Lookups on the shared `companies` and `clients` tables.

use slotbook_core::tenant::public_table;
use slotbook_core::types::EntityId;
use sqlx::PgConnection;

use crate::models::company::{Client, Company};

const COMPANY_COLUMNS: &str = "id, name, schema_name, created_at, updated_at";
const CLIENT_COLUMNS: &str = "id, name, email, time_zone, created_at, updated_at";

pub struct CompanyRepo;

impl CompanyRepo {
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: EntityId,
    ) -> Result<Option<Company>, sqlx::Error> {
        let query = format!(
            "SELECT {COMPANY_COLUMNS} FROM {} WHERE id = $1",
            public_table("companies")
        );
        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Every company id, oldest first. Used by tenant-wide background jobs.
    pub async fn list_ids(conn: &mut PgConnection) -> Result<Vec<EntityId>, sqlx::Error> {
        let query = format!(
            "SELECT id FROM {} ORDER BY created_at, id",
            public_table("companies")
        );
        sqlx::query_scalar::<_, EntityId>(&query)
            .fetch_all(conn)
            .await
    }
}

pub struct ClientRepo;

impl ClientRepo {
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: EntityId,
    ) -> Result<Option<Client>, sqlx::Error> {
        let query = format!(
            "SELECT {CLIENT_COLUMNS} FROM {} WHERE id = $1",
            public_table("clients")
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}
