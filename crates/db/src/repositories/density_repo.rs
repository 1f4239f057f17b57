//! Per-service density overrides for employees and branches.

use slotbook_core::tenant::TenantContext;
use slotbook_core::types::EntityId;
use sqlx::PgConnection;

use crate::models::density::{BranchServiceDensity, EmployeeServiceDensity};

pub struct DensityRepo;

impl DensityRepo {
    /// `(employee_id, density)` for every employee with an override on `service_id`.
    pub async fn employee_overrides_for_service(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        service_id: EntityId,
    ) -> Result<Vec<(EntityId, i32)>, sqlx::Error> {
        let query = format!(
            "SELECT employee_id, density FROM {} WHERE service_id = $1",
            tenant.table("employee_service_densities")
        );
        sqlx::query_as::<_, (EntityId, i32)>(&query)
            .bind(service_id)
            .fetch_all(conn)
            .await
    }

    pub async fn employee_service_density(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
        service_id: EntityId,
    ) -> Result<Option<i32>, sqlx::Error> {
        let query = format!(
            "SELECT density FROM {} WHERE employee_id = $1 AND service_id = $2",
            tenant.table("employee_service_densities")
        );
        sqlx::query_scalar::<_, i32>(&query)
            .bind(employee_id)
            .bind(service_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn branch_service_density(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        branch_id: EntityId,
        service_id: EntityId,
    ) -> Result<Option<i32>, sqlx::Error> {
        let query = format!(
            "SELECT density FROM {} WHERE branch_id = $1 AND service_id = $2",
            tenant.table("branch_service_densities")
        );
        sqlx::query_scalar::<_, i32>(&query)
            .bind(branch_id)
            .bind(service_id)
            .fetch_optional(conn)
            .await
    }

    /// Insert or replace the override for `(employee, service)`.
    pub async fn upsert_employee_service_density(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
        service_id: EntityId,
        density: i32,
    ) -> Result<EmployeeServiceDensity, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (employee_id, service_id, density) VALUES ($1, $2, $3) \
             ON CONFLICT (employee_id, service_id) \
             DO UPDATE SET density = EXCLUDED.density, updated_at = now() \
             RETURNING employee_id, service_id, density, updated_at",
            tenant.table("employee_service_densities")
        );
        sqlx::query_as::<_, EmployeeServiceDensity>(&query)
            .bind(employee_id)
            .bind(service_id)
            .bind(density)
            .fetch_one(conn)
            .await
    }

    /// Insert or replace the override for `(branch, service)`.
    pub async fn upsert_branch_service_density(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        branch_id: EntityId,
        service_id: EntityId,
        density: i32,
    ) -> Result<BranchServiceDensity, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (branch_id, service_id, density) VALUES ($1, $2, $3) \
             ON CONFLICT (branch_id, service_id) \
             DO UPDATE SET density = EXCLUDED.density, updated_at = now() \
             RETURNING branch_id, service_id, density, updated_at",
            tenant.table("branch_service_densities")
        );
        sqlx::query_as::<_, BranchServiceDensity>(&query)
            .bind(branch_id)
            .bind(service_id)
            .bind(density)
            .fetch_one(conn)
            .await
    }
}
