//! Seed-time creation of companies, clients and tenant catalog rows.
//!
//! The scheduler never creates these records. Every function here demands a
//! [`SeedingContext`], which only seed tooling and tests open.

use slotbook_core::seeding::SeedingContext;
use slotbook_core::tenant::{public_table, TenantContext};
use slotbook_core::timezone::parse_time_zone;
use slotbook_core::types::EntityId;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::catalog::{
    Branch, CreateBranch, CreateEmployee, CreateService, Employee, Service,
};
use crate::models::company::{Client, Company, CreateClient, CreateCompany};

pub struct ProvisioningRepo;

/// Zones are validated here so that stored rows always parse on read.
fn checked_zone(raw: &str) -> Result<String, sqlx::Error> {
    parse_time_zone(raw)
        .map(|tz| tz.name().to_string())
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))
}

impl ProvisioningRepo {
    // =======================================================================
    // Shared schema
    // =======================================================================

    /// Insert the company and provision its tenant schema.
    pub async fn create_company(
        conn: &mut PgConnection,
        seeding: &SeedingContext,
        input: &CreateCompany,
    ) -> Result<Company, sqlx::Error> {
        let id = Uuid::new_v4();
        let tenant = TenantContext::new(id);
        let query = format!(
            "INSERT INTO {} (id, name, schema_name) VALUES ($1, $2, $3) \
             RETURNING id, name, schema_name, created_at, updated_at",
            public_table("companies")
        );
        let company = sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(tenant.schema())
            .fetch_one(&mut *conn)
            .await?;

        sqlx::query("SELECT provision_tenant_schema($1)")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tracing::info!(
            company_id = %company.id,
            schema = %company.schema_name,
            reason = seeding.reason(),
            "Provisioned company",
        );
        Ok(company)
    }

    pub async fn create_client(
        conn: &mut PgConnection,
        seeding: &SeedingContext,
        input: &CreateClient,
    ) -> Result<Client, sqlx::Error> {
        let time_zone = checked_zone(input.time_zone.as_deref().unwrap_or_default())?;
        let query = format!(
            "INSERT INTO {} (id, name, email, time_zone) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, time_zone, created_at, updated_at",
            public_table("clients")
        );
        let client = sqlx::query_as::<_, Client>(&query)
            .bind(Uuid::new_v4())
            .bind(&input.name)
            .bind(&input.email)
            .bind(time_zone)
            .fetch_one(conn)
            .await?;
        tracing::debug!(client_id = %client.id, reason = seeding.reason(), "Created client");
        Ok(client)
    }

    // =======================================================================
    // Tenant catalog
    // =======================================================================

    pub async fn create_branch(
        conn: &mut PgConnection,
        seeding: &SeedingContext,
        tenant: &TenantContext,
        input: &CreateBranch,
    ) -> Result<Branch, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (id, company_id, name, time_zone, total_service_density) \
             VALUES ($1, $2, $3, $4, COALESCE($5, -1)) \
             RETURNING id, company_id, name, time_zone, total_service_density, \
                       created_at, updated_at",
            tenant.table("branches")
        );
        let branch = sqlx::query_as::<_, Branch>(&query)
            .bind(Uuid::new_v4())
            .bind(tenant.company_id())
            .bind(&input.name)
            .bind(checked_zone(&input.time_zone)?)
            .bind(input.total_service_density)
            .fetch_one(conn)
            .await?;
        tracing::debug!(branch_id = %branch.id, reason = seeding.reason(), "Created branch");
        Ok(branch)
    }

    pub async fn create_employee(
        conn: &mut PgConnection,
        seeding: &SeedingContext,
        tenant: &TenantContext,
        input: &CreateEmployee,
    ) -> Result<Employee, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} \
             (id, company_id, name, surname, time_zone, slot_granularity, total_service_density) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, company_id, name, surname, time_zone, slot_granularity, \
                       total_service_density, created_at, updated_at",
            tenant.table("employees")
        );
        let employee = sqlx::query_as::<_, Employee>(&query)
            .bind(Uuid::new_v4())
            .bind(tenant.company_id())
            .bind(&input.name)
            .bind(&input.surname)
            .bind(checked_zone(&input.time_zone)?)
            .bind(input.slot_granularity)
            .bind(input.total_service_density)
            .fetch_one(conn)
            .await?;
        tracing::debug!(employee_id = %employee.id, reason = seeding.reason(), "Created employee");
        Ok(employee)
    }

    pub async fn create_service(
        conn: &mut PgConnection,
        seeding: &SeedingContext,
        tenant: &TenantContext,
        input: &CreateService,
    ) -> Result<Service, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (id, company_id, name, duration_minutes) VALUES ($1, $2, $3, $4) \
             RETURNING id, company_id, name, duration_minutes, created_at, updated_at",
            tenant.table("services")
        );
        let service = sqlx::query_as::<_, Service>(&query)
            .bind(Uuid::new_v4())
            .bind(tenant.company_id())
            .bind(&input.name)
            .bind(input.duration_minutes)
            .fetch_one(conn)
            .await?;
        tracing::debug!(service_id = %service.id, reason = seeding.reason(), "Created service");
        Ok(service)
    }

    // =======================================================================
    // Associations
    // =======================================================================

    pub async fn link_branch_service(
        conn: &mut PgConnection,
        seeding: &SeedingContext,
        tenant: &TenantContext,
        branch_id: EntityId,
        service_id: EntityId,
    ) -> Result<(), sqlx::Error> {
        Self::link(conn, seeding, tenant, "branch_services", ("branch_id", branch_id), service_id)
            .await
    }

    pub async fn link_employee_service(
        conn: &mut PgConnection,
        seeding: &SeedingContext,
        tenant: &TenantContext,
        employee_id: EntityId,
        service_id: EntityId,
    ) -> Result<(), sqlx::Error> {
        Self::link(
            conn,
            seeding,
            tenant,
            "employee_services",
            ("employee_id", employee_id),
            service_id,
        )
        .await
    }

    pub async fn link_employee_branch(
        conn: &mut PgConnection,
        seeding: &SeedingContext,
        tenant: &TenantContext,
        employee_id: EntityId,
        branch_id: EntityId,
    ) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (employee_id, branch_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            tenant.table("employee_branches")
        );
        sqlx::query(&query)
            .bind(employee_id)
            .bind(branch_id)
            .execute(conn)
            .await?;
        tracing::debug!(%employee_id, %branch_id, reason = seeding.reason(), "Linked employee to branch");
        Ok(())
    }

    async fn link(
        conn: &mut PgConnection,
        seeding: &SeedingContext,
        tenant: &TenantContext,
        table: &'static str,
        (owner_column, owner_id): (&'static str, EntityId),
        service_id: EntityId,
    ) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO {} ({owner_column}, service_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            tenant.table(table)
        );
        sqlx::query(&query)
            .bind(owner_id)
            .bind(service_id)
            .execute(conn)
            .await?;
        tracing::debug!(table, %owner_id, %service_id, reason = seeding.reason(), "Linked service");
        Ok(())
    }
}
