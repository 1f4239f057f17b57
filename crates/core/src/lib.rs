//! Pure scheduling domain: slot generation, capacity, booking validation and
//! the appointment audit trail. No I/O lives here.

pub mod authorization;
pub mod availability;
pub mod booking;
pub mod capacity;
pub mod catalog;
pub mod conflict;
pub mod error;
pub mod lifecycle;
pub mod reconciliation;
pub mod schedule;
pub mod seeding;
pub mod slots;
pub mod span;
pub mod tenant;
pub mod timezone;
pub mod types;
