//! Authentication and authorization primitives.
//!
//! - [`jwt`] -- access-token generation and validation.
//! - [`gate`] -- the role-based [`AuthorizationGate`](slotbook_core::authorization::AuthorizationGate).

pub mod gate;
pub mod jwt;
