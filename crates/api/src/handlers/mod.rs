pub mod appointment;
pub mod availability;
pub mod density;
pub mod health;
pub mod work_range;

use slotbook_core::authorization::Role;
use slotbook_core::error::CoreError;
use slotbook_core::types::EntityId;

use crate::middleware::auth::AuthUser;

/// A client caller may only name its own client id.
pub(crate) fn ensure_own_client(user: &AuthUser, client_id: Option<EntityId>) -> Result<(), CoreError> {
    if user.role == Role::Client && client_id != user.client_id {
        return Err(CoreError::Forbidden(
            "Clients may only act on their own behalf".into(),
        ));
    }
    Ok(())
}
