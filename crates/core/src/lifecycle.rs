//! Appointment lifecycle: status machine, tracked fields and audit history.
//!
//! The audit trail is an explicit list of trackable fields. Adding a field to
//! [`TrackedFields`] without teaching [`TrackedFields::diff`] about it fails to
//! compile because the diff destructures the struct exhaustively.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::booking::BookingIdentity;
use crate::error::{CoreError, StateViolation};
use crate::timezone::parse_time_zone;
use crate::types::{EntityId, Minutes, Timestamp};

// ---------------------------------------------------------------------------
// Status machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Active,
    Cancelled,
    Fulfilled,
}

impl AppointmentStatus {
    pub fn of(is_cancelled: bool, is_fulfilled: bool) -> Self {
        if is_cancelled {
            Self::Cancelled
        } else if is_fulfilled {
            Self::Fulfilled
        } else {
            Self::Active
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Mutations a caller may request on a persisted appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentAction {
    Update,
    Comment,
    Cancel,
    Fulfill,
    Delete,
}

pub mod state_machine {
    use super::{AppointmentAction, AppointmentStatus};
    use crate::error::{CoreError, StateViolation};
    use crate::types::Timestamp;

    /// Status reached after `action` succeeds from `Active`.
    pub fn target(action: AppointmentAction) -> Option<AppointmentStatus> {
        match action {
            AppointmentAction::Update | AppointmentAction::Comment => Some(AppointmentStatus::Active),
            AppointmentAction::Cancel => Some(AppointmentStatus::Cancelled),
            AppointmentAction::Fulfill => Some(AppointmentStatus::Fulfilled),
            // Deletion has no target: the audit trail is permanent.
            AppointmentAction::Delete => None,
        }
    }

    /// Check that `action` may be applied to an appointment in `status`
    /// starting at `start_time`.
    pub fn ensure_allowed(
        status: AppointmentStatus,
        action: AppointmentAction,
        start_time: Timestamp,
        now: Timestamp,
    ) -> Result<AppointmentStatus, CoreError> {
        let Some(next) = target(action) else {
            return Err(CoreError::State(StateViolation::DeletionForbidden));
        };
        match status {
            AppointmentStatus::Cancelled => {
                return Err(CoreError::State(StateViolation::AlreadyCancelled))
            }
            AppointmentStatus::Fulfilled => {
                return Err(CoreError::State(StateViolation::AlreadyFulfilled))
            }
            AppointmentStatus::Active => {}
        }
        if action == AppointmentAction::Cancel && now > start_time {
            return Err(CoreError::State(StateViolation::AlreadyStarted));
        }
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Tracked fields and field changes
// ---------------------------------------------------------------------------

/// The mutable, audited part of an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFields {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub time_zone: String,
    pub is_cancelled: bool,
    pub cancel_time: Option<Timestamp>,
    pub is_fulfilled: bool,
    pub is_confirmed_by_client: bool,
    pub is_cancelled_by_client: bool,
    pub is_cancelled_by_employee: bool,
    pub cancelled_employee_id: Option<EntityId>,
    pub actual_start_time: Option<Timestamp>,
    pub actual_end_time: Option<Timestamp>,
}

/// One audited change, typed per field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldChange {
    StartTime { old: Timestamp, new: Timestamp },
    EndTime { old: Timestamp, new: Timestamp },
    TimeZone { old: String, new: String },
    IsCancelled { old: bool, new: bool },
    CancelTime { old: Option<Timestamp>, new: Option<Timestamp> },
    IsFulfilled { old: bool, new: bool },
    IsConfirmedByClient { old: bool, new: bool },
    IsCancelledByClient { old: bool, new: bool },
    IsCancelledByEmployee { old: bool, new: bool },
    CancelledEmployeeId { old: Option<EntityId>, new: Option<EntityId> },
    ActualStartTime { old: Option<Timestamp>, new: Option<Timestamp> },
    ActualEndTime { old: Option<Timestamp>, new: Option<Timestamp> },
}

impl FieldChange {
    pub fn field(&self) -> &'static str {
        match self {
            Self::StartTime { .. } => "start_time",
            Self::EndTime { .. } => "end_time",
            Self::TimeZone { .. } => "time_zone",
            Self::IsCancelled { .. } => "is_cancelled",
            Self::CancelTime { .. } => "cancel_time",
            Self::IsFulfilled { .. } => "is_fulfilled",
            Self::IsConfirmedByClient { .. } => "is_confirmed_by_client",
            Self::IsCancelledByClient { .. } => "is_cancelled_by_client",
            Self::IsCancelledByEmployee { .. } => "is_cancelled_by_employee",
            Self::CancelledEmployeeId { .. } => "cancelled_employee_id",
            Self::ActualStartTime { .. } => "actual_start_time",
            Self::ActualEndTime { .. } => "actual_end_time",
        }
    }

    /// Changes that require coverage, capacity and overlap to be re-checked.
    pub fn is_schedule_relevant(&self) -> bool {
        matches!(self, Self::StartTime { .. } | Self::EndTime { .. })
    }
}

fn push_if_changed<T: PartialEq + Clone>(
    changes: &mut Vec<FieldChange>,
    old: &T,
    new: &T,
    make: impl FnOnce(T, T) -> FieldChange,
) {
    if old != new {
        changes.push(make(old.clone(), new.clone()));
    }
}

impl TrackedFields {
    /// Field-by-field changes from `self` to `next`, in declaration order.
    pub fn diff(&self, next: &TrackedFields) -> Vec<FieldChange> {
        let TrackedFields {
            start_time,
            end_time,
            time_zone,
            is_cancelled,
            cancel_time,
            is_fulfilled,
            is_confirmed_by_client,
            is_cancelled_by_client,
            is_cancelled_by_employee,
            cancelled_employee_id,
            actual_start_time,
            actual_end_time,
        } = self;

        let mut c = Vec::new();
        push_if_changed(&mut c, start_time, &next.start_time, |old, new| FieldChange::StartTime { old, new });
        push_if_changed(&mut c, end_time, &next.end_time, |old, new| FieldChange::EndTime { old, new });
        push_if_changed(&mut c, time_zone, &next.time_zone, |old, new| FieldChange::TimeZone { old, new });
        push_if_changed(&mut c, is_cancelled, &next.is_cancelled, |old, new| FieldChange::IsCancelled { old, new });
        push_if_changed(&mut c, cancel_time, &next.cancel_time, |old, new| FieldChange::CancelTime { old, new });
        push_if_changed(&mut c, is_fulfilled, &next.is_fulfilled, |old, new| FieldChange::IsFulfilled { old, new });
        push_if_changed(&mut c, is_confirmed_by_client, &next.is_confirmed_by_client, |old, new| {
            FieldChange::IsConfirmedByClient { old, new }
        });
        push_if_changed(&mut c, is_cancelled_by_client, &next.is_cancelled_by_client, |old, new| {
            FieldChange::IsCancelledByClient { old, new }
        });
        push_if_changed(&mut c, is_cancelled_by_employee, &next.is_cancelled_by_employee, |old, new| {
            FieldChange::IsCancelledByEmployee { old, new }
        });
        push_if_changed(&mut c, cancelled_employee_id, &next.cancelled_employee_id, |old, new| {
            FieldChange::CancelledEmployeeId { old, new }
        });
        push_if_changed(&mut c, actual_start_time, &next.actual_start_time, |old, new| {
            FieldChange::ActualStartTime { old, new }
        });
        push_if_changed(&mut c, actual_end_time, &next.actual_end_time, |old, new| {
            FieldChange::ActualEndTime { old, new }
        });
        c
    }

    /// Apply the new value carried by `change`.
    pub fn apply(&mut self, change: &FieldChange) {
        match change.clone() {
            FieldChange::StartTime { new, .. } => self.start_time = new,
            FieldChange::EndTime { new, .. } => self.end_time = new,
            FieldChange::TimeZone { new, .. } => self.time_zone = new,
            FieldChange::IsCancelled { new, .. } => self.is_cancelled = new,
            FieldChange::CancelTime { new, .. } => self.cancel_time = new,
            FieldChange::IsFulfilled { new, .. } => self.is_fulfilled = new,
            FieldChange::IsConfirmedByClient { new, .. } => self.is_confirmed_by_client = new,
            FieldChange::IsCancelledByClient { new, .. } => self.is_cancelled_by_client = new,
            FieldChange::IsCancelledByEmployee { new, .. } => self.is_cancelled_by_employee = new,
            FieldChange::CancelledEmployeeId { new, .. } => self.cancelled_employee_id = new,
            FieldChange::ActualStartTime { new, .. } => self.actual_start_time = new,
            FieldChange::ActualEndTime { new, .. } => self.actual_end_time = new,
        }
    }

    pub fn status(&self) -> AppointmentStatus {
        AppointmentStatus::of(self.is_cancelled, self.is_fulfilled)
    }

    /// Fields after a cancellation by `actor` at `now`.
    pub fn cancelled(&self, actor: CancelActor, now: Timestamp) -> TrackedFields {
        let mut next = self.clone();
        next.is_cancelled = true;
        next.cancel_time = Some(now);
        match actor {
            CancelActor::Client => next.is_cancelled_by_client = true,
            CancelActor::Employee(id) => {
                next.is_cancelled_by_employee = true;
                next.cancelled_employee_id = Some(id);
            }
            CancelActor::System => {}
        }
        next
    }

    /// Fields after the appointment is marked fulfilled.
    pub fn fulfilled(&self) -> TrackedFields {
        let mut next = self.clone();
        next.is_fulfilled = true;
        next
    }
}

/// Who asked for a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelActor {
    Client,
    Employee(EntityId),
    System,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub changed_at: Timestamp,
    pub change: FieldChange,
}

/// Append-only audit trail stored with the appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<HistoryEntry>);

impl History {
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append one entry per change, all stamped `at`. Returns how many were added.
    pub fn record(&mut self, changes: Vec<FieldChange>, at: Timestamp) -> usize {
        let added = changes.len();
        self.0.extend(changes.into_iter().map(|change| HistoryEntry {
            changed_at: at,
            change,
        }));
        added
    }

    /// Rebuild the current fields by applying every new value to `initial`.
    pub fn replay(&self, initial: &TrackedFields) -> TrackedFields {
        let mut fields = initial.clone();
        for entry in &self.0 {
            fields.apply(&entry.change);
        }
        fields
    }
}

// ---------------------------------------------------------------------------
// Update patch
// ---------------------------------------------------------------------------

/// PATCH body. Identity fields are accepted only to reject changes to them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentPatch {
    pub company_id: Option<EntityId>,
    pub branch_id: Option<EntityId>,
    pub employee_id: Option<EntityId>,
    pub service_id: Option<EntityId>,
    pub client_id: Option<EntityId>,
    pub start_time: Option<Timestamp>,
    pub time_zone: Option<String>,
    pub is_confirmed_by_client: Option<bool>,
    pub actual_start_time: Option<Timestamp>,
    pub actual_end_time: Option<Timestamp>,
}

impl AppointmentPatch {
    pub fn ensure_identity_unchanged(&self, identity: &BookingIdentity) -> Result<(), CoreError> {
        let checks = [
            ("company_id", self.company_id, identity.company_id),
            ("branch_id", self.branch_id, identity.branch_id),
            ("employee_id", self.employee_id, identity.employee_id),
            ("service_id", self.service_id, identity.service_id),
            ("client_id", self.client_id, identity.client_id),
        ];
        for (field, requested, current) in checks {
            if requested.is_some_and(|id| id != current) {
                return Err(CoreError::State(StateViolation::ImmutableField(field)));
            }
        }
        Ok(())
    }

    /// Apply to `current`, recomputing the end from `duration`.
    pub fn apply(&self, current: &TrackedFields, duration: Minutes) -> Result<TrackedFields, CoreError> {
        let mut next = current.clone();
        if let Some(start) = self.start_time {
            next.start_time = start;
            next.end_time = start + Duration::minutes(i64::from(duration));
        }
        if let Some(tz) = &self.time_zone {
            next.time_zone = parse_time_zone(tz)?.name().to_string();
        }
        if let Some(confirmed) = self.is_confirmed_by_client {
            next.is_confirmed_by_client = confirmed;
        }
        if let Some(actual) = self.actual_start_time {
            next.actual_start_time = Some(actual);
        }
        if let Some(actual) = self.actual_end_time {
            next.actual_end_time = Some(actual);
        }
        if let (Some(s), Some(e)) = (next.actual_start_time, next.actual_end_time) {
            if e <= s {
                return Err(CoreError::Validation(
                    "actual_end_time must be after actual_start_time".into(),
                ));
            }
        }
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author_id: EntityId,
    pub body: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewComment {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

impl NewComment {
    pub fn into_comment(self, author_id: EntityId, now: Timestamp) -> Result<Comment, CoreError> {
        self.validate()?;
        Ok(Comment {
            author_id,
            body: self.body,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn at(h: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap()
    }

    fn fields() -> TrackedFields {
        TrackedFields {
            start_time: at(12),
            end_time: at(13),
            time_zone: "America/Sao_Paulo".into(),
            is_cancelled: false,
            cancel_time: None,
            is_fulfilled: false,
            is_confirmed_by_client: false,
            is_cancelled_by_client: false,
            is_cancelled_by_employee: false,
            cancelled_employee_id: None,
            actual_start_time: None,
            actual_end_time: None,
        }
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    #[test]
    fn terminal_states_reject_everything() {
        for status in [AppointmentStatus::Cancelled, AppointmentStatus::Fulfilled] {
            assert!(status.is_terminal());
            for action in [AppointmentAction::Update, AppointmentAction::Cancel, AppointmentAction::Fulfill] {
                assert_matches!(
                    state_machine::ensure_allowed(status, action, at(12), at(6)),
                    Err(CoreError::State(_))
                );
            }
        }
    }

    #[test]
    fn cancelling_twice_reports_already_cancelled() {
        assert_matches!(
            state_machine::ensure_allowed(AppointmentStatus::Cancelled, AppointmentAction::Cancel, at(12), at(6)),
            Err(CoreError::State(StateViolation::AlreadyCancelled))
        );
        assert_matches!(
            state_machine::ensure_allowed(AppointmentStatus::Fulfilled, AppointmentAction::Cancel, at(12), at(6)),
            Err(CoreError::State(StateViolation::AlreadyFulfilled))
        );
    }

    #[test]
    fn cancel_after_start_is_rejected() {
        assert_matches!(
            state_machine::ensure_allowed(AppointmentStatus::Active, AppointmentAction::Cancel, at(12), at(13)),
            Err(CoreError::State(StateViolation::AlreadyStarted))
        );
        assert_eq!(
            state_machine::ensure_allowed(AppointmentStatus::Active, AppointmentAction::Cancel, at(12), at(11)).unwrap(),
            AppointmentStatus::Cancelled
        );
    }

    #[test]
    fn delete_is_always_forbidden() {
        for status in [AppointmentStatus::Active, AppointmentStatus::Cancelled] {
            assert_matches!(
                state_machine::ensure_allowed(status, AppointmentAction::Delete, at(12), at(6)),
                Err(CoreError::State(StateViolation::DeletionForbidden))
            );
        }
    }

    // -----------------------------------------------------------------------
    // Diff and history
    // -----------------------------------------------------------------------

    #[test]
    fn diff_lists_only_changed_fields() {
        let before = fields();
        let mut after = before.clone();
        after.start_time = at(14);
        after.end_time = at(15);
        after.is_confirmed_by_client = true;

        let changes = before.diff(&after);
        let names: Vec<_> = changes.iter().map(FieldChange::field).collect();
        assert_eq!(names, vec!["start_time", "end_time", "is_confirmed_by_client"]);
        assert!(changes[0].is_schedule_relevant());
        assert!(!changes[2].is_schedule_relevant());
        assert!(before.diff(&before).is_empty());
    }

    #[test]
    fn cancellation_diff_records_actor() {
        let employee = Uuid::new_v4();
        let before = fields();
        let after = before.cancelled(CancelActor::Employee(employee), at(8));
        let changes = before.diff(&after);
        assert_eq!(changes.len(), 4);
        assert_eq!(
            changes[0],
            FieldChange::IsCancelled { old: false, new: true }
        );
        assert!(changes.contains(&FieldChange::CancelledEmployeeId {
            old: None,
            new: Some(employee)
        }));
        assert_eq!(after.status(), AppointmentStatus::Cancelled);
    }

    #[test]
    fn history_appends_and_replays_to_current_state() {
        let initial = fields();
        let mut history = History::default();

        let moved = {
            let mut f = initial.clone();
            f.start_time = at(14);
            f.end_time = at(15);
            f
        };
        assert_eq!(history.record(initial.diff(&moved), at(7)), 2);
        let first_entries = history.entries().to_vec();

        let cancelled = moved.cancelled(CancelActor::Client, at(9));
        assert_eq!(history.record(moved.diff(&cancelled), at(9)), 3);

        assert_eq!(history.len(), 5);
        assert_eq!(&history.entries()[..2], first_entries.as_slice());
        assert_eq!(history.replay(&initial), cancelled);
    }

    #[test]
    fn field_change_serializes_with_field_tag() {
        let change = FieldChange::IsFulfilled { old: false, new: true };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["field"], "is_fulfilled");
        assert_eq!(json["old"], false);
        assert_eq!(json["new"], true);
        let back: FieldChange = serde_json::from_value(json).unwrap();
        assert_eq!(back, change);
    }

    // -----------------------------------------------------------------------
    // Patch
    // -----------------------------------------------------------------------

    fn identity() -> BookingIdentity {
        BookingIdentity {
            company_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn patch_rejects_identity_change_but_allows_echo() {
        let id = identity();
        let echo = AppointmentPatch {
            branch_id: Some(id.branch_id),
            ..Default::default()
        };
        assert!(echo.ensure_identity_unchanged(&id).is_ok());

        let moved = AppointmentPatch {
            employee_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_matches!(
            moved.ensure_identity_unchanged(&id),
            Err(CoreError::State(StateViolation::ImmutableField("employee_id")))
        );
    }

    #[test]
    fn patch_recomputes_end_from_duration() {
        let patch = AppointmentPatch {
            start_time: Some(at(16)),
            ..Default::default()
        };
        let next = patch.apply(&fields(), 45).unwrap();
        assert_eq!(next.end_time - next.start_time, Duration::minutes(45));
    }

    #[test]
    fn patch_validates_time_zone_and_actual_times() {
        let bad_zone = AppointmentPatch {
            time_zone: Some("Atlantis/Capital".into()),
            ..Default::default()
        };
        assert_matches!(bad_zone.apply(&fields(), 60), Err(CoreError::Validation(_)));

        let backwards = AppointmentPatch {
            actual_start_time: Some(at(13)),
            actual_end_time: Some(at(12)),
            ..Default::default()
        };
        assert_matches!(backwards.apply(&fields(), 60), Err(CoreError::Validation(_)));
    }

    #[test]
    fn comment_body_is_validated() {
        let empty = NewComment { body: String::new() };
        assert_matches!(empty.into_comment(Uuid::nil(), at(8)), Err(CoreError::Validation(_)));
        let ok = NewComment { body: "Running late".into() };
        assert_eq!(ok.into_comment(Uuid::nil(), at(8)).unwrap().body, "Running late");
    }
}
