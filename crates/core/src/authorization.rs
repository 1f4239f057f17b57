//! The yes/no gate consulted before any scheduling operation.
//!
//! Policy lives outside the scheduler; the engine only calls [`require`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employee,
    Client,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Self::Admin),
            "employee" => Some(Self::Employee),
            "client" => Some(Self::Client),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingAction {
    ViewAvailability,
    CreateAppointment,
    ViewAppointment,
    UpdateAppointment,
    CancelAppointment,
    FulfillAppointment,
    CommentAppointment,
    ManageSchedule,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: EntityId,
    pub role: Role,
    /// Company the user belongs to, for staff accounts.
    pub company_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub subject: Subject,
    pub action: SchedulingAction,
    pub company_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    async fn authorize(&self, request: &AccessRequest) -> Decision;
}

/// Ask `gate` and turn a denial into `CoreError::Forbidden`.
pub async fn require(gate: &dyn AuthorizationGate, request: AccessRequest) -> Result<(), CoreError> {
    match gate.authorize(&request).await {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(CoreError::Forbidden(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    struct DenyAll;

    #[async_trait]
    impl AuthorizationGate for DenyAll {
        async fn authorize(&self, _request: &AccessRequest) -> Decision {
            Decision::Deny("closed".into())
        }
    }

    #[test]
    fn role_parse() {
        assert_eq!(Role::parse("client"), Some(Role::Client));
        assert_eq!(Role::parse("root"), None);
    }

    #[tokio::test]
    async fn denial_becomes_forbidden() {
        let request = AccessRequest {
            subject: Subject {
                user_id: Uuid::new_v4(),
                role: Role::Admin,
                company_id: None,
            },
            action: SchedulingAction::CreateAppointment,
            company_id: Uuid::new_v4(),
        };
        assert_matches!(
            require(&DenyAll, request).await,
            Err(CoreError::Forbidden(reason)) if reason == "closed"
        );
    }
}
