use serde::Serialize;

use crate::types::EntityId;

/// Domain error taxonomy shared by the read and write paths.
///
/// Every variant except `Internal` is a caller-actionable rejection; the
/// transport layer maps each to a 4xx status with [`CoreError::reason`] as the
/// machine-readable code.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: EntityId },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Referential error: {0}")]
    Referential(ReferentialViolation),

    #[error("Schedule coverage error: {0}")]
    ScheduleCoverage(String),

    #[error("Capacity exceeded: {scope} density cap of {limit} reached")]
    CapacityExceeded { scope: CapacityScope, limit: i64 },

    #[error("Overlap error: {0}")]
    Overlap(OverlapScope),

    #[error("State error: {0}")]
    State(StateViolation),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable reason code for the error.
    pub fn reason(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation(_) => "INVALID_INPUT",
            CoreError::Referential(v) => v.code(),
            CoreError::ScheduleCoverage(_) => "OUTSIDE_WORK_RANGE",
            CoreError::CapacityExceeded { scope, .. } => scope.code(),
            CoreError::Overlap(scope) => scope.code(),
            CoreError::State(v) => v.code(),
            CoreError::Unauthorized(_) => "UNAUTHORIZED",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(errors.to_string())
    }
}

// ---------------------------------------------------------------------------
// Error detail kinds
// ---------------------------------------------------------------------------

/// Which referential rule a booking broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ReferentialViolation {
    #[error("branch does not belong to the company")]
    BranchNotInCompany,
    #[error("employee does not belong to the company")]
    EmployeeNotInCompany,
    #[error("service does not belong to the company")]
    ServiceNotInCompany,
    #[error("service is not offered at the branch")]
    ServiceNotOfferedAtBranch,
    #[error("employee does not offer the service")]
    EmployeeDoesNotOfferService,
    #[error("employee does not work at the branch")]
    EmployeeNotAtBranch,
}

impl ReferentialViolation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BranchNotInCompany => "BRANCH_NOT_IN_COMPANY",
            Self::EmployeeNotInCompany => "EMPLOYEE_NOT_IN_COMPANY",
            Self::ServiceNotInCompany => "SERVICE_NOT_IN_COMPANY",
            Self::ServiceNotOfferedAtBranch => "SERVICE_NOT_OFFERED_AT_BRANCH",
            Self::EmployeeDoesNotOfferService => "EMPLOYEE_DOES_NOT_OFFER_SERVICE",
            Self::EmployeeNotAtBranch => "EMPLOYEE_NOT_AT_BRANCH",
        }
    }
}

/// Which density cap a booking ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum CapacityScope {
    #[error("employee")]
    Employee,
    #[error("employee service")]
    EmployeeService,
    #[error("branch")]
    Branch,
    #[error("branch service")]
    BranchService,
}

impl CapacityScope {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Employee => "EMPLOYEE_CAPACITY_EXCEEDED",
            Self::EmployeeService => "EMPLOYEE_SERVICE_CAPACITY_EXCEEDED",
            Self::Branch => "BRANCH_CAPACITY_EXCEEDED",
            Self::BranchService => "BRANCH_SERVICE_CAPACITY_EXCEEDED",
        }
    }
}

/// Where a client's conflicting appointment lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum OverlapScope {
    #[error("client already has an overlapping appointment in this company")]
    SameTenant,
    #[error("client already has an overlapping appointment in another company")]
    CrossTenant,
}

impl OverlapScope {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SameTenant => "CLIENT_OVERLAP",
            Self::CrossTenant => "CROSS_TENANT_CLIENT_OVERLAP",
        }
    }
}

/// Lifecycle rule that forbids the requested mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum StateViolation {
    #[error("appointment is already cancelled")]
    AlreadyCancelled,
    #[error("appointment is already fulfilled")]
    AlreadyFulfilled,
    #[error("appointment has already started")]
    AlreadyStarted,
    #[error("appointments can not be deleted, cancel instead")]
    DeletionForbidden,
    #[error("field `{0}` can not be changed after creation")]
    ImmutableField(&'static str),
}

impl StateViolation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyCancelled => "ALREADY_CANCELLED",
            Self::AlreadyFulfilled => "ALREADY_FULFILLED",
            Self::AlreadyStarted => "ALREADY_STARTED",
            Self::DeletionForbidden => "DELETION_FORBIDDEN",
            Self::ImmutableField(_) => "IMMUTABLE_FIELD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_follow_detail_kind() {
        let err = CoreError::CapacityExceeded {
            scope: CapacityScope::BranchService,
            limit: 2,
        };
        assert_eq!(err.reason(), "BRANCH_SERVICE_CAPACITY_EXCEEDED");
        assert_eq!(
            CoreError::State(StateViolation::DeletionForbidden).reason(),
            "DELETION_FORBIDDEN"
        );
        assert_eq!(
            CoreError::Overlap(OverlapScope::CrossTenant).reason(),
            "CROSS_TENANT_CLIENT_OVERLAP"
        );
    }

    #[test]
    fn display_includes_scope_and_limit() {
        let err = CoreError::CapacityExceeded {
            scope: CapacityScope::Employee,
            limit: 1,
        };
        assert_eq!(
            err.to_string(),
            "Capacity exceeded: employee density cap of 1 reached"
        );
    }
}
