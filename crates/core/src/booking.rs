//! Booking validation for the create and reschedule paths.
//!
//! Validation is staged as a small typestate so that an appointment can only
//! be written from a [`ValidatedBooking`]:
//!
//! ```text
//! BookingRequest --new--> PendingBooking --with_service--> TimedBooking --validate--> ValidatedBooking
//! ```
//!
//! The repository layer loads [`BookingFacts`] for the [`TimedBooking`] span
//! inside the booking transaction; every check here is pure.

use chrono::{Datelike, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::capacity::{check_branch_capacity, check_employee_capacity, DensityUsage};
use crate::catalog::{BranchProfile, EmployeeProfile, ServiceProfile};
use crate::error::{CoreError, OverlapScope, ReferentialViolation};
use crate::schedule::WorkRange;
use crate::span::Span;
use crate::timezone::parse_time_zone;
use crate::types::{EntityId, Timestamp};

/// Clock skew tolerated when rejecting start times in the past.
pub const PAST_START_TOLERANCE_SECS: i64 = 60;

/// Identifiers fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingIdentity {
    pub company_id: EntityId,
    pub branch_id: EntityId,
    pub employee_id: EntityId,
    pub service_id: EntityId,
    pub client_id: EntityId,
}

/// Create request body. Every field is optional at the wire level so that a
/// missing one surfaces as a validation error naming it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub company_id: Option<EntityId>,
    pub branch_id: Option<EntityId>,
    pub employee_id: Option<EntityId>,
    pub service_id: Option<EntityId>,
    pub client_id: Option<EntityId>,
    pub start_time: Option<Timestamp>,
    pub time_zone: Option<String>,
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, CoreError> {
    value.ok_or_else(|| CoreError::Validation(format!("{name} is required")))
}

fn reject_past(start_time: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if start_time < now - Duration::seconds(PAST_START_TOLERANCE_SECS) {
        return Err(CoreError::Validation(
            "start_time can not be in the past".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Request with all identifiers present and a start that is not in the past.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBooking {
    identity: BookingIdentity,
    start_time: Timestamp,
    time_zone: Tz,
    /// Appointment being rescheduled, excluded from overlap counts.
    existing: Option<EntityId>,
}

impl PendingBooking {
    /// Create path. `tenant_company` is the company the request is scoped to.
    pub fn new(
        request: BookingRequest,
        tenant_company: EntityId,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        let start_time = require(request.start_time, "start_time")?;
        let identity = BookingIdentity {
            company_id: require(request.company_id, "company_id")?,
            branch_id: require(request.branch_id, "branch_id")?,
            employee_id: require(request.employee_id, "employee_id")?,
            service_id: require(request.service_id, "service_id")?,
            client_id: require(request.client_id, "client_id")?,
        };
        if identity.company_id != tenant_company {
            return Err(CoreError::Validation(
                "company_id does not match the X-Company-ID header".into(),
            ));
        }
        reject_past(start_time, now)?;
        let time_zone = parse_time_zone(request.time_zone.as_deref().unwrap_or_default())?;

        Ok(Self {
            identity,
            start_time,
            time_zone,
            existing: None,
        })
    }

    /// Reschedule path for an existing appointment.
    pub fn reschedule(
        appointment_id: EntityId,
        identity: BookingIdentity,
        start_time: Timestamp,
        time_zone: &str,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        reject_past(start_time, now)?;
        Ok(Self {
            identity,
            start_time,
            time_zone: parse_time_zone(time_zone)?,
            existing: Some(appointment_id),
        })
    }

    pub fn identity(&self) -> &BookingIdentity {
        &self.identity
    }

    /// Derive the end from the service duration. `None` means the service
    /// does not exist in this company.
    pub fn with_service(self, service: Option<&ServiceProfile>) -> Result<TimedBooking, CoreError> {
        let service = service
            .filter(|s| s.company_id == self.identity.company_id)
            .ok_or(CoreError::Referential(ReferentialViolation::ServiceNotInCompany))?;
        if service.duration_minutes <= 0 {
            return Err(CoreError::Validation(format!(
                "Service {} has a non-positive duration",
                service.id
            )));
        }
        let end = self.start_time + Duration::minutes(i64::from(service.duration_minutes));
        if end <= self.start_time {
            return Err(CoreError::Validation("end_time must be after start_time".into()));
        }
        let span = Span::new(self.start_time, end);
        Ok(TimedBooking {
            pending: self,
            span,
        })
    }
}

/// Pending booking whose interval is known.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedBooking {
    pending: PendingBooking,
    span: Span,
}

/// Data the repository layer reads inside the booking transaction.
#[derive(Debug, Clone)]
pub struct BookingFacts {
    /// `None` when the branch is not in the company.
    pub branch: Option<BranchProfile>,
    /// `None` when the employee is not in the company.
    pub employee: Option<EmployeeProfile>,
    pub service_at_branch: bool,
    pub employee_offers_service: bool,
    pub employee_at_branch: bool,
    /// The employee's work ranges at the branch.
    pub work_ranges: Vec<WorkRange>,
    pub employee_usage: DensityUsage,
    pub branch_usage: DensityUsage,
    pub client_overlaps_same_tenant: i64,
    pub client_overlaps_cross_tenant: i64,
}

impl TimedBooking {
    pub fn identity(&self) -> &BookingIdentity {
        &self.pending.identity
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn existing(&self) -> Option<EntityId> {
        self.pending.existing
    }

    /// Ownership, relationships, coverage, capacity and client overlap, in
    /// that order. The first failing rule is returned.
    pub fn validate(self, facts: &BookingFacts) -> Result<ValidatedBooking, CoreError> {
        let identity = self.pending.identity;

        let branch_ok = facts
            .branch
            .as_ref()
            .is_some_and(|b| b.id == identity.branch_id && b.company_id == identity.company_id);
        if !branch_ok {
            return Err(CoreError::Referential(ReferentialViolation::BranchNotInCompany));
        }
        let employee_ok = facts
            .employee
            .as_ref()
            .is_some_and(|e| e.id == identity.employee_id && e.company_id == identity.company_id);
        if !employee_ok {
            return Err(CoreError::Referential(ReferentialViolation::EmployeeNotInCompany));
        }

        check_relationships(facts)?;
        check_schedule_coverage(&facts.work_ranges, identity.branch_id, &self.span)?;
        check_employee_capacity(facts.employee_usage)?;
        check_branch_capacity(facts.branch_usage)?;
        check_client_overlap(
            facts.client_overlaps_same_tenant,
            facts.client_overlaps_cross_tenant,
        )?;

        Ok(ValidatedBooking {
            identity,
            span: self.span,
            time_zone: self.pending.time_zone,
            existing: self.pending.existing,
        })
    }
}

/// A booking that passed every rule; the only input accepted by the writers.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    identity: BookingIdentity,
    span: Span,
    time_zone: Tz,
    existing: Option<EntityId>,
}

impl ValidatedBooking {
    pub fn identity(&self) -> &BookingIdentity {
        &self.identity
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn existing(&self) -> Option<EntityId> {
        self.existing
    }
}

// ---------------------------------------------------------------------------
// Individual rules
// ---------------------------------------------------------------------------

pub fn check_relationships(facts: &BookingFacts) -> Result<(), CoreError> {
    if !facts.service_at_branch {
        return Err(CoreError::Referential(ReferentialViolation::ServiceNotOfferedAtBranch));
    }
    if !facts.employee_offers_service {
        return Err(CoreError::Referential(ReferentialViolation::EmployeeDoesNotOfferService));
    }
    if !facts.employee_at_branch {
        return Err(CoreError::Referential(ReferentialViolation::EmployeeNotAtBranch));
    }
    Ok(())
}

/// Some range at `branch_id`, on the weekday the booking starts (in the
/// branch's zone), must contain the whole booking.
pub fn check_schedule_coverage(
    ranges: &[WorkRange],
    branch_id: EntityId,
    span: &Span,
) -> Result<(), CoreError> {
    let covered = ranges
        .iter()
        .filter(|r| r.branch_id == branch_id)
        .any(|r| {
            let local_start = span.start.with_timezone(&r.time_zone);
            local_start.weekday() == r.weekday
                && r
                    .span_on(local_start.date_naive())
                    .is_some_and(|window| window.contains_span(span))
        });
    if covered {
        Ok(())
    } else {
        Err(CoreError::ScheduleCoverage(format!(
            "No work range covers {} to {}",
            span.start.with_timezone(&Utc).to_rfc3339(),
            span.end.with_timezone(&Utc).to_rfc3339()
        )))
    }
}

/// Clients may never hold two overlapping appointments, in any company.
pub fn check_client_overlap(same_tenant: i64, cross_tenant: i64) -> Result<(), CoreError> {
    if same_tenant > 0 {
        return Err(CoreError::Overlap(OverlapScope::SameTenant));
    }
    if cross_tenant > 0 {
        return Err(CoreError::Overlap(OverlapScope::CrossTenant));
    }
    Ok(())
}
