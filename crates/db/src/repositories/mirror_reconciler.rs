//! Postgres implementation of [`MirrorReconciler`].

use async_trait::async_trait;
use slotbook_core::error::CoreError;
use slotbook_core::reconciliation::{plan_repairs, DriftReport, MirrorReconciler};
use slotbook_core::tenant::TenantContext;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::{AppointmentRepo, ClientAppointmentRepo};

/// Rewrites a tenant's mirror rows inside one snapshot transaction.
#[derive(Clone)]
pub struct PgMirrorReconciler {
    pool: PgPool,
}

/// Passes that lose a race with a concurrent booking are replayed this many
/// times before the tenant is left for the next run.
const MAX_ATTEMPTS: u32 = 3;

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

fn is_conflict(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.code().as_deref(), Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED))
    )
}

impl PgMirrorReconciler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the transaction a pass runs in. Both sides are read from one
    /// `REPEATABLE READ` snapshot, and a write to a mirror changed after that
    /// snapshot fails with a serialization error instead of overwriting it.
    pub async fn begin_pass(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Compare a tenant's appointments with their mirrors and repair the
    /// drift. Run inside [`begin_pass`](Self::begin_pass).
    pub async fn repair(
        conn: &mut PgConnection,
        tenant: &TenantContext,
    ) -> Result<DriftReport, sqlx::Error> {
        let source = AppointmentRepo::list_mirror_source(&mut *conn, tenant).await?;
        let mirrors = ClientAppointmentRepo::list_for_company(&mut *conn, tenant.company_id()).await?;
        let plan = plan_repairs(&source, &mirrors);

        let mut report = DriftReport::default();
        if plan.is_empty() {
            return Ok(report);
        }

        for record in &plan.missing {
            ClientAppointmentRepo::upsert(&mut *conn, record).await?;
            report.inserted += 1;
        }
        for record in &plan.stale {
            ClientAppointmentRepo::upsert(&mut *conn, record).await?;
            report.updated += 1;
        }
        report.orphaned = ClientAppointmentRepo::mark_orphaned(conn, tenant, &plan.orphaned).await?;
        Ok(report)
    }

    async fn run(&self, tenant: &TenantContext) -> Result<DriftReport, sqlx::Error> {
        let mut attempt = 1;
        loop {
            let mut tx = self.begin_pass().await?;
            let outcome = match Self::repair(&mut tx, tenant).await {
                Ok(report) => tx.commit().await.map(|()| report),
                Err(e) => Err(e),
            };
            match outcome {
                Err(e) if is_conflict(&e) && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        company_id = %tenant.company_id(),
                        attempt,
                        error = %e,
                        "Mirror reconciliation raced a booking, retrying",
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl MirrorReconciler for PgMirrorReconciler {
    async fn reconcile(&self, tenant: &TenantContext) -> Result<DriftReport, CoreError> {
        self.run(tenant).await.map_err(|e| {
            tracing::error!(company_id = %tenant.company_id(), error = %e, "Mirror reconciliation failed");
            CoreError::Internal(format!("mirror reconciliation failed: {e}"))
        })
    }
}
