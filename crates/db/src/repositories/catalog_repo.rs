//! Read-only access to a tenant's branches, employees, services and the
//! associations between them.

use slotbook_core::tenant::TenantContext;
use slotbook_core::types::EntityId;
use sqlx::PgConnection;

use crate::models::catalog::{Branch, Employee, Service};

const BRANCH_COLUMNS: &str =
    "id, company_id, name, time_zone, total_service_density, created_at, updated_at";
const EMPLOYEE_COLUMNS: &str = "\
    id, company_id, name, surname, time_zone, slot_granularity, \
    total_service_density, created_at, updated_at";
const SERVICE_COLUMNS: &str = "id, company_id, name, duration_minutes, created_at, updated_at";

pub struct CatalogRepo;

impl CatalogRepo {
    // -----------------------------------------------------------------------
    // Single entities
    // -----------------------------------------------------------------------

    pub async fn find_branch(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
    ) -> Result<Option<Branch>, sqlx::Error> {
        let query = format!(
            "SELECT {BRANCH_COLUMNS} FROM {} WHERE id = $1",
            tenant.table("branches")
        );
        sqlx::query_as::<_, Branch>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_employee(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
    ) -> Result<Option<Employee>, sqlx::Error> {
        let query = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM {} WHERE id = $1",
            tenant.table("employees")
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_service(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
    ) -> Result<Option<Service>, sqlx::Error> {
        let query = format!(
            "SELECT {SERVICE_COLUMNS} FROM {} WHERE id = $1",
            tenant.table("services")
        );
        sqlx::query_as::<_, Service>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    pub async fn list_branches(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        ids: &[EntityId],
    ) -> Result<Vec<Branch>, sqlx::Error> {
        let query = format!(
            "SELECT {BRANCH_COLUMNS} FROM {} WHERE id = ANY($1) ORDER BY id",
            tenant.table("branches")
        );
        sqlx::query_as::<_, Branch>(&query)
            .bind(ids)
            .fetch_all(conn)
            .await
    }

    pub async fn list_employees(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        ids: &[EntityId],
    ) -> Result<Vec<Employee>, sqlx::Error> {
        let query = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM {} WHERE id = ANY($1) ORDER BY id",
            tenant.table("employees")
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(ids)
            .fetch_all(conn)
            .await
    }

    // -----------------------------------------------------------------------
    // Associations
    // -----------------------------------------------------------------------

    pub async fn service_offered_at_branch(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        service_id: EntityId,
        branch_id: EntityId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE service_id = $1 AND branch_id = $2)",
            tenant.table("branch_services")
        );
        sqlx::query_scalar::<_, bool>(&query)
            .bind(service_id)
            .bind(branch_id)
            .fetch_one(conn)
            .await
    }

    pub async fn employee_offers_service(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
        service_id: EntityId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE employee_id = $1 AND service_id = $2)",
            tenant.table("employee_services")
        );
        sqlx::query_scalar::<_, bool>(&query)
            .bind(employee_id)
            .bind(service_id)
            .fetch_one(conn)
            .await
    }

    pub async fn employee_works_at_branch(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
        branch_id: EntityId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE employee_id = $1 AND branch_id = $2)",
            tenant.table("employee_branches")
        );
        sqlx::query_scalar::<_, bool>(&query)
            .bind(employee_id)
            .bind(branch_id)
            .fetch_one(conn)
            .await
    }

    /// Of `service_ids`, those the employee does not offer.
    pub async fn services_not_offered_by_employee(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
        service_ids: &[EntityId],
    ) -> Result<Vec<EntityId>, sqlx::Error> {
        let query = format!(
            "SELECT s.id FROM unnest($2::uuid[]) AS s(id) \
             WHERE NOT EXISTS (SELECT 1 FROM {} es WHERE es.employee_id = $1 AND es.service_id = s.id)",
            tenant.table("employee_services")
        );
        sqlx::query_scalar::<_, EntityId>(&query)
            .bind(employee_id)
            .bind(service_ids)
            .fetch_all(conn)
            .await
    }

    /// Of `service_ids`, those the branch does not offer.
    pub async fn services_not_offered_at_branch(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        branch_id: EntityId,
        service_ids: &[EntityId],
    ) -> Result<Vec<EntityId>, sqlx::Error> {
        let query = format!(
            "SELECT s.id FROM unnest($2::uuid[]) AS s(id) \
             WHERE NOT EXISTS (SELECT 1 FROM {} bs WHERE bs.branch_id = $1 AND bs.service_id = s.id)",
            tenant.table("branch_services")
        );
        sqlx::query_scalar::<_, EntityId>(&query)
            .bind(branch_id)
            .bind(service_ids)
            .fetch_all(conn)
            .await
    }
}
