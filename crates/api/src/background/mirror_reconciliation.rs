//! Periodic repair of the cross-tenant client appointment mirror.
//!
//! Every booking write updates the mirror in the same transaction, so drift
//! only appears after manual edits or restores. The job walks every company
//! and lets the [`MirrorReconciler`] bring the mirror back in line.

use std::time::Duration;

use slotbook_core::reconciliation::{DriftReport, MirrorReconciler};
use slotbook_core::tenant::TenantContext;
use slotbook_db::repositories::{CompanyRepo, PgMirrorReconciler};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;

/// Reconcile every company once. A failing company is logged and skipped.
pub async fn reconcile_all(pool: &PgPool, reconciler: &dyn MirrorReconciler) -> AppResult<DriftReport> {
    let mut conn = pool.acquire().await?;
    let companies = CompanyRepo::list_ids(&mut conn).await?;
    drop(conn);

    let mut total = DriftReport::default();
    for company_id in companies {
        match reconciler.reconcile(&TenantContext::new(company_id)).await {
            Ok(report) => total.merge(report),
            Err(e) => tracing::warn!(%company_id, error = %e, "Skipping company in mirror reconciliation"),
        }
    }
    Ok(total)
}

/// Run the reconciliation loop until `cancel` is triggered.
pub async fn run(pool: PgPool, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Mirror reconciliation job started");

    let reconciler = PgMirrorReconciler::new(pool.clone());
    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Mirror reconciliation job stopping");
                break;
            }
            _ = interval.tick() => {
                match reconcile_all(&pool, &reconciler).await {
                    Ok(report) if report.is_clean() => {
                        tracing::debug!("Mirror reconciliation: no drift");
                    }
                    Ok(report) => {
                        tracing::info!(
                            inserted = report.inserted,
                            updated = report.updated,
                            orphaned = report.orphaned,
                            "Mirror reconciliation: repaired drift",
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Mirror reconciliation: pass failed");
                    }
                }
            }
        }
    }
}
