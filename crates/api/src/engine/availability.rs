//! The availability read path.
//!
//! Every aggregate is read inside one `REPEATABLE READ, READ ONLY`
//! transaction so the result reflects a single snapshot.

use std::collections::BTreeSet;

use slotbook_core::availability::{
    assemble, AvailabilityParams, AvailabilityQuery, AvailabilitySnapshot, ServiceAvailability,
};
use slotbook_core::capacity::{BookingCounts, DensityOverrides};
use slotbook_core::conflict::ConflictFilter;
use slotbook_core::error::CoreError;
use slotbook_core::schedule::{WorkRange, WorkScheduleIndex};
use slotbook_core::tenant::TenantContext;
use slotbook_core::types::{EntityId, Timestamp};
use slotbook_db::repositories::{
    AppointmentRepo, CatalogRepo, ClientAppointmentRepo, DensityRepo, WorkRangeRepo,
};
use sqlx::PgPool;

use crate::error::AppResult;

pub async fn service_availability(
    pool: &PgPool,
    tenant: &TenantContext,
    service_id: EntityId,
    params: &AvailabilityParams,
    now: Timestamp,
) -> AppResult<ServiceAvailability> {
    let query = AvailabilityQuery::from_params(service_id, params)?;
    let window = query.window(now);

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let service = CatalogRepo::find_service(&mut tx, tenant, service_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "service",
            id: service_id,
        })?
        .profile();

    let ranges = WorkRangeRepo::list_for_service(&mut tx, tenant, service_id)
        .await?
        .into_iter()
        .map(|row| row.into_range())
        .collect::<Result<Vec<WorkRange>, _>>()?;

    let employee_ids: Vec<EntityId> = ranges
        .iter()
        .map(|r| r.employee_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let branch_ids: Vec<EntityId> = ranges
        .iter()
        .map(|r| r.branch_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let employees = CatalogRepo::list_employees(&mut tx, tenant, &employee_ids)
        .await?
        .iter()
        .map(|e| e.profile())
        .collect::<Result<Vec<_>, _>>()?;
    let branches = CatalogRepo::list_branches(&mut tx, tenant, &branch_ids)
        .await?
        .iter()
        .map(|b| b.profile())
        .collect::<Result<Vec<_>, _>>()?;

    let counts = AppointmentRepo::booking_counts(&mut tx, tenant, &employee_ids, window.span).await?;
    let overrides = DensityRepo::employee_overrides_for_service(&mut tx, tenant, service_id).await?;

    let client_conflicts = match query.client_id {
        Some(client_id) => {
            let spans = ClientAppointmentRepo::spans_for_client(&mut tx, client_id, window.span).await?;
            Some(ConflictFilter::new(spans, service.duration_minutes))
        }
        None => None,
    };

    tx.commit().await?;

    let snapshot = AvailabilitySnapshot {
        service,
        index: WorkScheduleIndex::build(ranges, employees, branches),
        counts: BookingCounts::from_rows(counts),
        overrides: DensityOverrides::from_rows(overrides),
        client_conflicts,
    };
    let result = assemble(&query, &window, &snapshot, now);

    tracing::debug!(
        company_id = %tenant.company_id(),
        %service_id,
        dates = result.available_dates.len(),
        "Availability assembled",
    );
    Ok(result)
}
