//! Transactional orchestration of the scheduling core.
//!
//! - [`availability`] -- the read path, one snapshot transaction per request.
//! - [`booking`] -- create, reschedule, cancel, fulfill and comment.
//! - [`schedule`] -- work range and density override administration.
//!
//! The engine loads facts through `slotbook_db` repositories and leaves every
//! decision to `slotbook_core`.

pub mod availability;
pub mod booking;
pub mod retry;
pub mod schedule;

use chrono::{SubsecRound, Utc};
use slotbook_core::types::Timestamp;

/// Current instant at the precision Postgres stores, so that history values
/// equal the columns they describe.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}
