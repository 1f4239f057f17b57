//! Work range and density override administration.

use chrono::NaiveTime;
use serde::Deserialize;
use slotbook_core::capacity::check_density_override;
use slotbook_core::error::{CoreError, ReferentialViolation};
use slotbook_core::schedule::{ensure_no_overlap, WorkRange, WorkRangeDraft};
use slotbook_core::tenant::TenantContext;
use slotbook_core::timezone::{parse_time_zone, today_in};
use slotbook_core::types::{EntityId, Timestamp};
use slotbook_db::models::density::{BranchServiceDensity, EmployeeServiceDensity, SetServiceDensity};
use slotbook_db::models::work_range::WorkRangeRow;
use slotbook_db::repositories::{CatalogRepo, DensityRepo, WorkRangeRepo};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;

/// Body of `POST /employees/{id}/work-ranges` and of the full replacement
/// `PUT /employees/{id}/work-ranges/{range_id}`. `weekday` is 0 for Sunday.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkRange {
    pub branch_id: EntityId,
    pub weekday: i16,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub time_zone: String,
    pub service_ids: Vec<EntityId>,
}

/// Body of `POST /employees/{id}/work-ranges/{range_id}/services`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WorkRangeServices {
    #[validate(length(min = 1, message = "service_ids must not be empty"))]
    pub service_ids: Vec<EntityId>,
}

// ---------------------------------------------------------------------------
// Work ranges
// ---------------------------------------------------------------------------

/// Validate, normalize into the branch zone and store a work range.
pub async fn create_work_range(
    pool: &PgPool,
    tenant: &TenantContext,
    employee_id: EntityId,
    input: NewWorkRange,
    now: Timestamp,
) -> AppResult<WorkRangeRow> {
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, tenant, employee_id).await?;
    let range = prepare_range(&mut tx, tenant, Uuid::new_v4(), employee_id, input, now).await?;
    let row = WorkRangeRepo::create(&mut tx, tenant, &range).await?;
    tx.commit().await?;

    tracing::info!(
        work_range_id = %row.id,
        %employee_id,
        branch_id = %row.branch_id,
        weekday = row.weekday,
        "Work range created",
    );
    Ok(row)
}

/// Replace a range with `input`, revalidated as if newly created. The range
/// itself is excluded from the overlap check.
pub async fn update_work_range(
    pool: &PgPool,
    tenant: &TenantContext,
    employee_id: EntityId,
    range_id: EntityId,
    input: NewWorkRange,
    now: Timestamp,
) -> AppResult<WorkRangeRow> {
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, tenant, employee_id).await?;
    find_range(&mut tx, tenant, employee_id, range_id).await?;
    let range = prepare_range(&mut tx, tenant, range_id, employee_id, input, now).await?;
    let row = WorkRangeRepo::update(&mut tx, tenant, &range).await?;
    tx.commit().await?;

    tracing::info!(
        work_range_id = %row.id,
        %employee_id,
        branch_id = %row.branch_id,
        weekday = row.weekday,
        "Work range updated",
    );
    Ok(row)
}

pub async fn delete_work_range(
    pool: &PgPool,
    tenant: &TenantContext,
    employee_id: EntityId,
    range_id: EntityId,
) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, tenant, employee_id).await?;
    if !WorkRangeRepo::delete(&mut tx, tenant, employee_id, range_id).await? {
        return Err(work_range_not_found(range_id).into());
    }
    tx.commit().await?;

    tracing::info!(work_range_id = %range_id, %employee_id, "Work range deleted");
    Ok(())
}

pub async fn get_work_range(
    pool: &PgPool,
    tenant: &TenantContext,
    employee_id: EntityId,
    range_id: EntityId,
) -> AppResult<WorkRangeRow> {
    let mut conn = pool.acquire().await?;
    find_range(&mut conn, tenant, employee_id, range_id).await
}

pub async fn list_work_ranges(
    pool: &PgPool,
    tenant: &TenantContext,
    employee_id: EntityId,
) -> AppResult<Vec<WorkRangeRow>> {
    let mut conn = pool.acquire().await?;
    CatalogRepo::find_employee(&mut conn, tenant, employee_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "employee",
            id: employee_id,
        })?;
    Ok(WorkRangeRepo::list_for_employee(&mut conn, tenant, employee_id).await?)
}

/// Make more services bookable in an existing range.
pub async fn add_work_range_services(
    pool: &PgPool,
    tenant: &TenantContext,
    employee_id: EntityId,
    range_id: EntityId,
    input: &WorkRangeServices,
) -> AppResult<WorkRangeRow> {
    input.validate().map_err(CoreError::from)?;

    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, tenant, employee_id).await?;
    let range = find_range(&mut tx, tenant, employee_id, range_id).await?;
    check_service_links(&mut tx, tenant, employee_id, range.branch_id, &input.service_ids).await?;
    WorkRangeRepo::add_services(&mut tx, tenant, range_id, &input.service_ids).await?;
    let row = find_range(&mut tx, tenant, employee_id, range_id).await?;
    tx.commit().await?;

    tracing::info!(work_range_id = %range_id, %employee_id, services = row.service_ids.len(), "Work range services added");
    Ok(row)
}

pub async fn remove_work_range_service(
    pool: &PgPool,
    tenant: &TenantContext,
    employee_id: EntityId,
    range_id: EntityId,
    service_id: EntityId,
) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, tenant, employee_id).await?;
    find_range(&mut tx, tenant, employee_id, range_id).await?;
    if !WorkRangeRepo::remove_service(&mut tx, tenant, range_id, service_id).await? {
        return Err(CoreError::NotFound {
            entity: "work range service",
            id: service_id,
        }
        .into());
    }
    tx.commit().await?;

    tracing::info!(work_range_id = %range_id, %employee_id, %service_id, "Work range service removed");
    Ok(())
}

/// Lock the employee row so concurrent edits of one employee's schedule run
/// one after another; the overlap check is only sound under this lock.
async fn lock_employee(
    conn: &mut PgConnection,
    tenant: &TenantContext,
    employee_id: EntityId,
) -> AppResult<()> {
    if WorkRangeRepo::lock_employee_schedule(conn, tenant, employee_id).await? {
        Ok(())
    } else {
        Err(CoreError::NotFound {
            entity: "employee",
            id: employee_id,
        }
        .into())
    }
}

async fn find_range(
    conn: &mut PgConnection,
    tenant: &TenantContext,
    employee_id: EntityId,
    range_id: EntityId,
) -> AppResult<WorkRangeRow> {
    WorkRangeRepo::find_for_employee(conn, tenant, employee_id, range_id)
        .await?
        .ok_or_else(|| work_range_not_found(range_id).into())
}

fn work_range_not_found(id: EntityId) -> CoreError {
    CoreError::NotFound {
        entity: "work range",
        id,
    }
}

/// The employee must offer every service and the branch must offer it too.
async fn check_service_links(
    conn: &mut PgConnection,
    tenant: &TenantContext,
    employee_id: EntityId,
    branch_id: EntityId,
    service_ids: &[EntityId],
) -> AppResult<()> {
    let unknown =
        CatalogRepo::services_not_offered_by_employee(&mut *conn, tenant, employee_id, service_ids).await?;
    if !unknown.is_empty() {
        return Err(CoreError::Referential(ReferentialViolation::EmployeeDoesNotOfferService).into());
    }
    let unknown = CatalogRepo::services_not_offered_at_branch(conn, tenant, branch_id, service_ids).await?;
    if !unknown.is_empty() {
        return Err(CoreError::Referential(ReferentialViolation::ServiceNotOfferedAtBranch).into());
    }
    Ok(())
}

/// Run every write rule for a range with id `id`. The caller holds the
/// employee lock.
async fn prepare_range(
    conn: &mut PgConnection,
    tenant: &TenantContext,
    id: EntityId,
    employee_id: EntityId,
    input: NewWorkRange,
    now: Timestamp,
) -> AppResult<WorkRange> {
    let draft = WorkRangeDraft {
        employee_id,
        branch_id: input.branch_id,
        weekday: input.weekday,
        start: input.start,
        end: input.end,
        time_zone: parse_time_zone(&input.time_zone)?,
        service_ids: input.service_ids,
    };

    let branch = CatalogRepo::find_branch(&mut *conn, tenant, draft.branch_id)
        .await?
        .ok_or(CoreError::Referential(ReferentialViolation::BranchNotInCompany))?
        .profile()?;
    if !CatalogRepo::employee_works_at_branch(&mut *conn, tenant, employee_id, branch.id).await? {
        return Err(CoreError::Referential(ReferentialViolation::EmployeeNotAtBranch).into());
    }
    check_service_links(&mut *conn, tenant, employee_id, branch.id, &draft.service_ids).await?;

    let today = today_in(branch.time_zone, now);
    let range = draft.normalize(id, branch.time_zone, today)?;

    let existing = WorkRangeRepo::list_for_employee(conn, tenant, employee_id)
        .await?
        .into_iter()
        .map(|row| row.into_range())
        .collect::<Result<Vec<WorkRange>, _>>()?;
    ensure_no_overlap(&range, &existing, today)?;
    Ok(range)
}

// ---------------------------------------------------------------------------
// Density overrides
// ---------------------------------------------------------------------------

pub async fn set_employee_service_density(
    pool: &PgPool,
    tenant: &TenantContext,
    employee_id: EntityId,
    service_id: EntityId,
    input: &SetServiceDensity,
) -> AppResult<EmployeeServiceDensity> {
    input.validate().map_err(CoreError::from)?;

    let mut tx = pool.begin().await?;
    let employee = CatalogRepo::find_employee(&mut tx, tenant, employee_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "employee",
            id: employee_id,
        })?
        .profile()?;
    if !CatalogRepo::employee_offers_service(&mut tx, tenant, employee_id, service_id).await? {
        return Err(CoreError::Referential(ReferentialViolation::EmployeeDoesNotOfferService).into());
    }
    check_density_override(input.density, employee.total_service_density)?;

    let row = DensityRepo::upsert_employee_service_density(
        &mut tx,
        tenant,
        employee_id,
        service_id,
        input.density,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(%employee_id, %service_id, density = row.density, "Employee service density set");
    Ok(row)
}

pub async fn set_branch_service_density(
    pool: &PgPool,
    tenant: &TenantContext,
    branch_id: EntityId,
    service_id: EntityId,
    input: &SetServiceDensity,
) -> AppResult<BranchServiceDensity> {
    input.validate().map_err(CoreError::from)?;

    let mut tx = pool.begin().await?;
    let branch = CatalogRepo::find_branch(&mut tx, tenant, branch_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "branch",
            id: branch_id,
        })?
        .profile()?;
    if !CatalogRepo::service_offered_at_branch(&mut tx, tenant, service_id, branch_id).await? {
        return Err(CoreError::Referential(ReferentialViolation::ServiceNotOfferedAtBranch).into());
    }
    check_density_override(input.density, branch.total_service_density)?;

    let row =
        DensityRepo::upsert_branch_service_density(&mut tx, tenant, branch_id, service_id, input.density)
            .await?;
    tx.commit().await?;

    tracing::info!(%branch_id, %service_id, density = row.density, "Branch service density set");
    Ok(row)
}
