//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` create DTOs used by provisioning and admin endpoints
//! - Conversions into the pure `slotbook_core` views

pub mod appointment;
pub mod catalog;
pub mod client_appointment;
pub mod company;
pub mod density;
pub mod work_range;
