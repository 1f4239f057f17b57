//! Density caps: the read-side slot evaluator and the write-side checks.
//!
//! Capacity is counted, never stored. The read path counts appointments that
//! start at exactly the slot instant; the write path counts appointments whose
//! interval overlaps the requested one.

use std::collections::HashMap;

use crate::catalog::{density_limit, EmployeeProfile, UNLIMITED_DENSITY};
use crate::error::{CapacityScope, CoreError};
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// Non-cancelled appointment counts keyed by `(employee, start instant)`.
#[derive(Debug, Default, Clone)]
pub struct BookingCounts(HashMap<(EntityId, Timestamp), i64>);

impl BookingCounts {
    pub fn from_rows(rows: impl IntoIterator<Item = (EntityId, Timestamp, i64)>) -> Self {
        let mut counts = HashMap::new();
        for (employee_id, start, count) in rows {
            *counts.entry((employee_id, start)).or_insert(0) += count;
        }
        Self(counts)
    }

    pub fn get(&self, employee_id: EntityId, start: Timestamp) -> i64 {
        self.0.get(&(employee_id, start)).copied().unwrap_or(0)
    }
}

/// Per-employee density overrides for a single service.
#[derive(Debug, Default, Clone)]
pub struct DensityOverrides(HashMap<EntityId, i32>);

impl DensityOverrides {
    /// Negative stored values mean "no override" and are dropped.
    pub fn from_rows(rows: impl IntoIterator<Item = (EntityId, i32)>) -> Self {
        Self(rows.into_iter().filter(|(_, density)| *density >= 0).collect())
    }

    pub fn get(&self, employee_id: EntityId) -> Option<i32> {
        self.0.get(&employee_id).copied()
    }
}

/// Decides whether a candidate slot still has room.
#[derive(Debug, Clone, Copy)]
pub struct CapacityEvaluator<'a> {
    counts: &'a BookingCounts,
    overrides: &'a DensityOverrides,
}

impl<'a> CapacityEvaluator<'a> {
    pub fn new(counts: &'a BookingCounts, overrides: &'a DensityOverrides) -> Self {
        Self { counts, overrides }
    }

    /// Service override if configured, otherwise the employee total.
    /// `None` means unlimited.
    pub fn effective_cap(&self, employee: &EmployeeProfile) -> Option<i64> {
        match self.overrides.get(employee.id) {
            Some(density) => Some(i64::from(density)),
            None => density_limit(employee.total_service_density),
        }
    }

    pub fn has_room(&self, employee: &EmployeeProfile, start: Timestamp) -> bool {
        match self.effective_cap(employee) {
            Some(cap) => self.counts.get(employee.id, start) < cap,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Overlapping bookings observed for one scope plus its configured caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensityUsage {
    pub overlapping: i64,
    pub total_density: i32,
    /// Per-service override, negative or `None` when not configured.
    pub service_density: Option<i32>,
}

/// Employee-wide check followed by the employee/service override.
pub fn check_employee_capacity(usage: DensityUsage) -> Result<(), CoreError> {
    check_scope(usage, CapacityScope::Employee, CapacityScope::EmployeeService)
}

/// Branch-wide check followed by the branch/service override.
pub fn check_branch_capacity(usage: DensityUsage) -> Result<(), CoreError> {
    check_scope(usage, CapacityScope::Branch, CapacityScope::BranchService)
}

fn check_scope(
    usage: DensityUsage,
    total_scope: CapacityScope,
    service_scope: CapacityScope,
) -> Result<(), CoreError> {
    if let Some(limit) = density_limit(usage.total_density) {
        if usage.overlapping >= limit {
            return Err(CoreError::CapacityExceeded {
                scope: total_scope,
                limit,
            });
        }
    }
    if let Some(limit) = usage.service_density.and_then(density_limit) {
        if usage.overlapping >= limit {
            return Err(CoreError::CapacityExceeded {
                scope: service_scope,
                limit,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Validate a per-service override against its owner's total.
///
/// `-1` (clear) is always accepted; otherwise the value must be non-negative
/// and may not exceed a configured total.
pub fn check_density_override(density: i32, total_density: i32) -> Result<(), CoreError> {
    if density < UNLIMITED_DENSITY {
        return Err(CoreError::Validation(
            "density must be -1 (clear) or a non-negative number".into(),
        ));
    }
    if density == UNLIMITED_DENSITY {
        return Ok(());
    }
    match density_limit(total_density) {
        Some(limit) if i64::from(density) > limit => Err(CoreError::Validation(format!(
            "Service density {density} exceeds the total density {limit}"
        ))),
        _ => Ok(()),
    }
}
