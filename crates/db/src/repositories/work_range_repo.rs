//! Employee work ranges and their bookable services.

use slotbook_core::schedule::{weekday_index, WorkRange};
use slotbook_core::tenant::TenantContext;
use slotbook_core::types::EntityId;
use sqlx::PgConnection;

use crate::models::work_range::WorkRangeRow;

pub struct WorkRangeRepo;

impl WorkRangeRepo {
    /// `SELECT` list for a range aliased `r`, with its services aggregated.
    fn columns(tenant: &TenantContext) -> String {
        format!(
            "r.id, r.employee_id, r.branch_id, r.weekday, r.start_time, r.end_time, r.time_zone, \
             ARRAY(SELECT rs.service_id FROM {} rs WHERE rs.work_range_id = r.id ORDER BY rs.service_id) \
                 AS service_ids, \
             r.created_at, r.updated_at",
            tenant.table("employee_work_range_services")
        )
    }

    /// Ranges bookable for `service_id` whose employee still works at the
    /// range's branch.
    pub async fn list_for_service(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        service_id: EntityId,
    ) -> Result<Vec<WorkRangeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {cols} FROM {ranges} r \
             JOIN {range_services} s ON s.work_range_id = r.id AND s.service_id = $1 \
             JOIN {employee_branches} eb ON eb.employee_id = r.employee_id AND eb.branch_id = r.branch_id \
             ORDER BY r.branch_id, r.employee_id, r.weekday, r.start_time",
            cols = Self::columns(tenant),
            ranges = tenant.table("employee_work_ranges"),
            range_services = tenant.table("employee_work_range_services"),
            employee_branches = tenant.table("employee_branches"),
        );
        sqlx::query_as::<_, WorkRangeRow>(&query)
            .bind(service_id)
            .fetch_all(conn)
            .await
    }

    pub async fn list_for_employee(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
    ) -> Result<Vec<WorkRangeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} r WHERE r.employee_id = $1 ORDER BY r.weekday, r.start_time",
            Self::columns(tenant),
            tenant.table("employee_work_ranges"),
        );
        sqlx::query_as::<_, WorkRangeRow>(&query)
            .bind(employee_id)
            .fetch_all(conn)
            .await
    }

    pub async fn list_for_employee_at_branch(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
        branch_id: EntityId,
    ) -> Result<Vec<WorkRangeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} r WHERE r.employee_id = $1 AND r.branch_id = $2 \
             ORDER BY r.weekday, r.start_time",
            Self::columns(tenant),
            tenant.table("employee_work_ranges"),
        );
        sqlx::query_as::<_, WorkRangeRow>(&query)
            .bind(employee_id)
            .bind(branch_id)
            .fetch_all(conn)
            .await
    }

    /// Take the employee row lock that serializes schedule edits for one
    /// employee. Returns false when the employee does not exist.
    pub async fn lock_employee_schedule(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
            tenant.table("employees")
        );
        let locked = sqlx::query(&query)
            .bind(employee_id)
            .fetch_optional(conn)
            .await?;
        Ok(locked.is_some())
    }

    /// A range of `employee_id`; ranges of other employees are not found.
    pub async fn find_for_employee(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
        id: EntityId,
    ) -> Result<Option<WorkRangeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} r WHERE r.id = $1 AND r.employee_id = $2",
            Self::columns(tenant),
            tenant.table("employee_work_ranges"),
        );
        sqlx::query_as::<_, WorkRangeRow>(&query)
            .bind(id)
            .bind(employee_id)
            .fetch_optional(conn)
            .await
    }

    /// Insert a validated, normalized range and its service links.
    /// Run inside a transaction.
    pub async fn create(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        range: &WorkRange,
    ) -> Result<WorkRangeRow, sqlx::Error> {
        let insert = format!(
            "INSERT INTO {} (id, employee_id, branch_id, weekday, start_time, end_time, time_zone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            tenant.table("employee_work_ranges")
        );
        sqlx::query(&insert)
            .bind(range.id)
            .bind(range.employee_id)
            .bind(range.branch_id)
            .bind(weekday_index(range.weekday))
            .bind(range.start)
            .bind(range.end)
            .bind(range.time_zone.name())
            .execute(&mut *conn)
            .await?;

        Self::add_services(&mut *conn, tenant, range.id, &range.service_ids).await?;
        Self::fetch(conn, tenant, range.id).await
    }

    /// Replace a range's times, branch and service links with `range`.
    /// Run inside a transaction.
    pub async fn update(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        range: &WorkRange,
    ) -> Result<WorkRangeRow, sqlx::Error> {
        let update = format!(
            "UPDATE {} SET branch_id = $2, weekday = $3, start_time = $4, end_time = $5, \
                time_zone = $6, updated_at = now() \
             WHERE id = $1",
            tenant.table("employee_work_ranges")
        );
        sqlx::query(&update)
            .bind(range.id)
            .bind(range.branch_id)
            .bind(weekday_index(range.weekday))
            .bind(range.start)
            .bind(range.end)
            .bind(range.time_zone.name())
            .execute(&mut *conn)
            .await?;

        let unlink = format!(
            "DELETE FROM {} WHERE work_range_id = $1",
            tenant.table("employee_work_range_services")
        );
        sqlx::query(&unlink).bind(range.id).execute(&mut *conn).await?;
        Self::add_services(&mut *conn, tenant, range.id, &range.service_ids).await?;
        Self::fetch(conn, tenant, range.id).await
    }

    /// Delete a range; its service links cascade. Returns false if absent.
    pub async fn delete(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        employee_id: EntityId,
        id: EntityId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "DELETE FROM {} WHERE id = $1 AND employee_id = $2",
            tenant.table("employee_work_ranges")
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(employee_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Link services to a range, ignoring ones already linked.
    pub async fn add_services(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
        service_ids: &[EntityId],
    ) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (work_range_id, service_id) SELECT $1, unnest($2::uuid[]) \
             ON CONFLICT DO NOTHING",
            tenant.table("employee_work_range_services")
        );
        sqlx::query(&query)
            .bind(id)
            .bind(service_ids)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Returns false if the service was not linked to the range.
    pub async fn remove_service(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
        service_id: EntityId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "DELETE FROM {} WHERE work_range_id = $1 AND service_id = $2",
            tenant.table("employee_work_range_services")
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(service_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch(
        conn: &mut PgConnection,
        tenant: &TenantContext,
        id: EntityId,
    ) -> Result<WorkRangeRow, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} r WHERE r.id = $1",
            Self::columns(tenant),
            tenant.table("employee_work_ranges"),
        );
        sqlx::query_as::<_, WorkRangeRow>(&query)
            .bind(id)
            .fetch_one(conn)
            .await
    }
}
