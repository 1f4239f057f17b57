//! Shared primitive types used across all crates.

/// Every persisted entity is keyed by a UUID so identifiers stay unique across
/// tenant schemas (the cross-tenant mirror is keyed by appointment id).
pub type EntityId = uuid::Uuid;

/// All instants are stored and compared in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Durations and granularities are expressed in whole minutes.
pub type Minutes = i32;
