//! Drift detection between tenant appointments and the cross-tenant mirror.
//!
//! Appointments and their `client_appointments` mirror are written in one
//! transaction, but the mirror lives in a different schema and can still be
//! touched by tooling. A [`MirrorReconciler`] brings a tenant's mirrors back in
//! line; [`plan_repairs`] decides what needs fixing.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::tenant::TenantContext;
use crate::types::{EntityId, Timestamp};

/// The projection of an appointment kept in the shared schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRecord {
    pub appointment_id: EntityId,
    pub client_id: EntityId,
    pub company_id: EntityId,
    pub branch_id: EntityId,
    pub employee_id: EntityId,
    pub service_id: EntityId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub time_zone: String,
    pub is_cancelled: bool,
}

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub inserted: u64,
    pub updated: u64,
    pub orphaned: u64,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.orphaned == 0
    }

    pub fn merge(&mut self, other: DriftReport) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.orphaned += other.orphaned;
    }
}

/// Repairs needed to make the mirror match the tenant's appointments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftPlan {
    pub missing: Vec<MirrorRecord>,
    pub stale: Vec<MirrorRecord>,
    /// Live mirrors whose appointment no longer exists.
    pub orphaned: Vec<EntityId>,
}

impl DriftPlan {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty() && self.orphaned.is_empty()
    }
}

/// Compare the expected projection (`source`) against stored `mirrors`.
pub fn plan_repairs(source: &[MirrorRecord], mirrors: &[MirrorRecord]) -> DriftPlan {
    let stored: HashMap<EntityId, &MirrorRecord> =
        mirrors.iter().map(|m| (m.appointment_id, m)).collect();
    let expected: HashSet<EntityId> = source.iter().map(|s| s.appointment_id).collect();

    let mut plan = DriftPlan::default();
    for record in source {
        match stored.get(&record.appointment_id) {
            None => plan.missing.push(record.clone()),
            Some(mirror) if *mirror != record => plan.stale.push(record.clone()),
            Some(_) => {}
        }
    }
    plan.orphaned = mirrors
        .iter()
        .filter(|m| !m.is_cancelled && !expected.contains(&m.appointment_id))
        .map(|m| m.appointment_id)
        .collect();
    plan
}

#[async_trait]
pub trait MirrorReconciler: Send + Sync {
    async fn reconcile(&self, tenant: &TenantContext) -> Result<DriftReport, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn record() -> MirrorRecord {
        MirrorRecord {
            appointment_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            start_time: Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 3, 2, 13, 0, 0).unwrap(),
            time_zone: "UTC".into(),
            is_cancelled: false,
        }
    }

    #[test]
    fn in_sync_mirror_needs_nothing() {
        let a = record();
        let plan = plan_repairs(&[a.clone()], &[a]);
        assert!(plan.is_empty());
    }

    #[test]
    fn detects_missing_stale_and_orphaned() {
        let missing = record();
        let source_stale = record();
        let mut mirror_stale = source_stale.clone();
        mirror_stale.is_cancelled = true;
        let orphan = record();
        let mut cancelled_orphan = record();
        cancelled_orphan.is_cancelled = true;

        let plan = plan_repairs(
            &[missing.clone(), source_stale.clone()],
            &[mirror_stale, orphan.clone(), cancelled_orphan],
        );
        assert_eq!(plan.missing, vec![missing]);
        assert_eq!(plan.stale, vec![source_stale]);
        assert_eq!(plan.orphaned, vec![orphan.appointment_id]);
    }

    #[test]
    fn report_merge_and_clean() {
        let mut total = DriftReport::default();
        assert!(total.is_clean());
        total.merge(DriftReport { inserted: 1, updated: 2, orphaned: 0 });
        total.merge(DriftReport { inserted: 0, updated: 1, orphaned: 4 });
        assert_eq!(total, DriftReport { inserted: 1, updated: 3, orphaned: 4 });
    }
}
