//! Role-based [`AuthorizationGate`].
//!
//! | Role       | Allowed                                                        |
//! |------------|----------------------------------------------------------------|
//! | `admin`    | everything                                                     |
//! | `employee` | everything inside its own company                              |
//! | `client`   | view availability, create, view and cancel appointments        |

use async_trait::async_trait;
use slotbook_core::authorization::{
    AccessRequest, AuthorizationGate, Decision, Role, SchedulingAction,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RoleGate;

fn client_may(action: SchedulingAction) -> bool {
    matches!(
        action,
        SchedulingAction::ViewAvailability
            | SchedulingAction::CreateAppointment
            | SchedulingAction::ViewAppointment
            | SchedulingAction::CancelAppointment
    )
}

#[async_trait]
impl AuthorizationGate for RoleGate {
    async fn authorize(&self, request: &AccessRequest) -> Decision {
        let subject = &request.subject;
        match subject.role {
            Role::Admin => Decision::Allow,
            Role::Employee if subject.company_id == Some(request.company_id) => Decision::Allow,
            Role::Employee => Decision::Deny("Employees may only act within their own company".into()),
            Role::Client if client_may(request.action) => Decision::Allow,
            Role::Client => Decision::Deny(format!(
                "Clients may not perform {:?}",
                request.action
            )),
        }
    }
}
