//! Employee work ranges and the per-request schedule index.
//!
//! A work range is a recurring weekly window (weekday + wall-clock start/end)
//! during which an employee takes bookings at one branch. Ranges are always
//! persisted in the branch's time zone; [`WorkRangeDraft::normalize`] does the
//! conversion and enforces the write-time rules. [`WorkScheduleIndex`] is the
//! read-side structure rebuilt for every availability request.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::catalog::{BranchProfile, EmployeeProfile};
use crate::error::CoreError;
use crate::span::Span;
use crate::timezone::resolve_local;
use crate::types::EntityId;

/// Work range clock values must land on a multiple of this many seconds.
pub const CLOCK_SECOND_STEP: u32 = 15;

// ---------------------------------------------------------------------------
// Weekday encoding
// ---------------------------------------------------------------------------

/// Stored weekday encoding: 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(weekday: Weekday) -> i16 {
    weekday.num_days_from_sunday() as i16
}

/// Decode a stored weekday index.
pub fn weekday_from_index(index: i16) -> Result<Weekday, CoreError> {
    let weekday = match index {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        _ => {
            return Err(CoreError::Validation(format!(
                "Weekday must be between 0 (Sunday) and 6 (Saturday), got {index}"
            )))
        }
    };
    Ok(weekday)
}

/// First date on or after `from` that falls on `weekday`.
pub fn next_occurrence(weekday: Weekday, from: NaiveDate) -> NaiveDate {
    let ahead = (weekday_index(weekday) - weekday_index(from.weekday())).rem_euclid(7);
    from + Duration::days(i64::from(ahead))
}

// ---------------------------------------------------------------------------
// WorkRange
// ---------------------------------------------------------------------------

/// A persisted work range, normalized to its branch's time zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkRange {
    pub id: EntityId,
    pub employee_id: EntityId,
    pub branch_id: EntityId,
    pub weekday: Weekday,
    pub start: NaiveTime,
    /// `00:00` means the range runs until the end of the day.
    pub end: NaiveTime,
    pub time_zone: Tz,
    pub service_ids: Vec<EntityId>,
}

impl WorkRange {
    pub fn ends_at_midnight(&self) -> bool {
        self.end == NaiveTime::MIN
    }

    /// Concrete start/end of this range on `date`, in the range's zone.
    ///
    /// A DST gap can push the start past the end; the window is then empty
    /// (`end == start`).
    pub fn window_on(&self, date: NaiveDate) -> (DateTime<Tz>, DateTime<Tz>) {
        let start = resolve_local(date, self.start, self.time_zone);
        let end = if self.ends_at_midnight() {
            let next = date.succ_opt().unwrap_or(date);
            resolve_local(next, NaiveTime::MIN, self.time_zone)
        } else {
            resolve_local(date, self.end, self.time_zone)
        };
        (start, end.max(start))
    }

    /// UTC span of this range on `date`, `None` when the window is empty.
    pub fn span_on(&self, date: NaiveDate) -> Option<Span> {
        let (start, end) = self.window_on(date);
        (start < end).then(|| Span::new(start.with_timezone(&Utc), end.with_timezone(&Utc)))
    }

    pub fn offers(&self, service_id: EntityId) -> bool {
        self.service_ids.contains(&service_id)
    }

    /// True when both ranges belong to the same employee and their weekly
    /// occurrences intersect, whatever zones they are stored in.
    pub fn conflicts_with(&self, other: &WorkRange, reference: NaiveDate) -> bool {
        if self.employee_id != other.employee_id {
            return false;
        }
        let week_start =
            reference - Duration::days(i64::from(weekday_index(reference.weekday())));
        let Some(own) =
            self.span_on(week_start + Duration::days(i64::from(weekday_index(self.weekday))))
        else {
            return false;
        };
        let base = week_start + Duration::days(i64::from(weekday_index(other.weekday)));
        [-7, 0, 7]
            .into_iter()
            .filter_map(|offset| other.span_on(base + Duration::days(offset)))
            .any(|theirs| own.overlaps(&theirs))
    }
}

fn validate_clock(start: NaiveTime, end: NaiveTime) -> Result<(), CoreError> {
    for (label, t) in [("start", start), ("end", end)] {
        if t.nanosecond() != 0 || t.second() % CLOCK_SECOND_STEP != 0 {
            return Err(CoreError::Validation(format!(
                "Work range {label} seconds must be 0 or a multiple of {CLOCK_SECOND_STEP}"
            )));
        }
    }
    if start == end {
        return Err(CoreError::Validation(
            "Work range start and end must differ".into(),
        ));
    }
    if start > end && end != NaiveTime::MIN {
        return Err(CoreError::Validation(
            "Work range start must be before end (only an end of 00:00 may wrap to midnight)"
                .into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write-time validation
// ---------------------------------------------------------------------------

/// A work range as submitted by an administrator, before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkRangeDraft {
    pub employee_id: EntityId,
    pub branch_id: EntityId,
    pub weekday: i16,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub time_zone: Tz,
    pub service_ids: Vec<EntityId>,
}

impl WorkRangeDraft {
    /// Validate the clock rules and re-express the range in `branch_tz`.
    ///
    /// Conversion uses the next occurrence of the weekday on or after
    /// `today`, so a DST change between now and a later week is not applied.
    pub fn normalize(
        self,
        id: EntityId,
        branch_tz: Tz,
        today: NaiveDate,
    ) -> Result<WorkRange, CoreError> {
        let weekday = weekday_from_index(self.weekday)?;
        validate_clock(self.start, self.end)?;
        if self.service_ids.is_empty() {
            return Err(CoreError::Validation(
                "Work range must list at least one service".into(),
            ));
        }

        let input = WorkRange {
            id,
            employee_id: self.employee_id,
            branch_id: self.branch_id,
            weekday,
            start: self.start,
            end: self.end,
            time_zone: self.time_zone,
            service_ids: self.service_ids,
        };
        if input.time_zone == branch_tz {
            return Ok(input);
        }

        let (start, end) = input.window_on(next_occurrence(weekday, today));
        let start = start.with_timezone(&branch_tz);
        let end = end.with_timezone(&branch_tz);
        let same_day = end.date_naive() == start.date_naive();
        let ends_next_midnight =
            end.date_naive() == start.date_naive() + Duration::days(1) && end.time() == NaiveTime::MIN;
        if !same_day && !ends_next_midnight {
            return Err(CoreError::Validation(
                "Work range crosses midnight in the branch time zone; split it in two".into(),
            ));
        }
        validate_clock(start.time(), end.time())?;

        Ok(WorkRange {
            weekday: start.weekday(),
            start: start.time(),
            end: end.time(),
            time_zone: branch_tz,
            ..input
        })
    }
}

/// Reject `candidate` if it intersects any other range of the same employee.
pub fn ensure_no_overlap(
    candidate: &WorkRange,
    existing: &[WorkRange],
    reference: NaiveDate,
) -> Result<(), CoreError> {
    match existing
        .iter()
        .filter(|r| r.id != candidate.id)
        .find(|r| candidate.conflicts_with(r, reference))
    {
        Some(clash) => Err(CoreError::Validation(format!(
            "Work range overlaps existing range {} on the same weekday",
            clash.id
        ))),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// WorkScheduleIndex
// ---------------------------------------------------------------------------

/// `weekday -> branch -> ranges`, plus the employee and branch profiles the
/// ranges reference. Built once per availability request.
#[derive(Debug, Default)]
pub struct WorkScheduleIndex {
    days: HashMap<Weekday, BTreeMap<EntityId, Vec<WorkRange>>>,
    employees: HashMap<EntityId, EmployeeProfile>,
    branches: HashMap<EntityId, BranchProfile>,
}

impl WorkScheduleIndex {
    /// Index `ranges`, dropping any whose employee or branch is unknown or
    /// whose employee has a non-positive slot granularity.
    pub fn build(
        ranges: impl IntoIterator<Item = WorkRange>,
        employees: impl IntoIterator<Item = EmployeeProfile>,
        branches: impl IntoIterator<Item = BranchProfile>,
    ) -> Self {
        let employees: HashMap<_, _> = employees.into_iter().map(|e| (e.id, e)).collect();
        let branches: HashMap<_, _> = branches.into_iter().map(|b| (b.id, b)).collect();
        let mut days: HashMap<Weekday, BTreeMap<EntityId, Vec<WorkRange>>> = HashMap::new();

        for range in ranges {
            let usable = employees
                .get(&range.employee_id)
                .is_some_and(|e| e.slot_granularity > 0)
                && branches.contains_key(&range.branch_id);
            if !usable {
                continue;
            }
            days.entry(range.weekday)
                .or_default()
                .entry(range.branch_id)
                .or_default()
                .push(range);
        }

        Self {
            days,
            employees,
            branches,
        }
    }

    /// Branches with at least one range on `weekday`, in id order.
    pub fn ranges_on(&self, weekday: Weekday) -> impl Iterator<Item = (&EntityId, &[WorkRange])> {
        self.days
            .get(&weekday)
            .into_iter()
            .flat_map(|branches| branches.iter().map(|(id, ranges)| (id, ranges.as_slice())))
    }

    pub fn employee(&self, id: &EntityId) -> Option<&EmployeeProfile> {
        self.employees.get(id)
    }

    pub fn branch(&self, id: &EntityId) -> Option<&BranchProfile> {
        self.branches.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
