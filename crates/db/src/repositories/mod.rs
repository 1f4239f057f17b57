//! Repository structs, one per aggregate.
//!
//! Repositories are zero-sized; every method takes the connection it runs on
//! and, for tenant tables, the [`TenantContext`](slotbook_core::tenant::TenantContext)
//! that picks the schema.

pub mod appointment_repo;
pub mod catalog_repo;
pub mod client_appointment_repo;
pub mod company_repo;
pub mod density_repo;
pub mod mirror_reconciler;
pub mod provisioning_repo;
pub mod work_range_repo;

pub use appointment_repo::AppointmentRepo;
pub use catalog_repo::CatalogRepo;
pub use client_appointment_repo::ClientAppointmentRepo;
pub use company_repo::{ClientRepo, CompanyRepo};
pub use density_repo::DensityRepo;
pub use mirror_reconciler::PgMirrorReconciler;
pub use provisioning_repo::ProvisioningRepo;
pub use work_range_repo::WorkRangeRepo;
