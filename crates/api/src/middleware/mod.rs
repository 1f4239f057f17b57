//! Request extractors shared by every scheduling route.
//!
//! - [`auth::AuthUser`] -- the caller, from a JWT Bearer token.
//! - [`tenant::Tenant`] -- the company the request is scoped to, from `X-Company-ID`.

pub mod auth;
pub mod tenant;
