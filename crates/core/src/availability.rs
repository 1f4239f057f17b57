//! Availability query validation and assembly.
//!
//! [`AvailabilityQuery::from_params`] rejects malformed input before any
//! database work happens. [`assemble`] is the pure part of the read path: it
//! walks every date in the search window, expands the ranges active on that
//! weekday into slots, keeps those with remaining capacity and finally drops
//! slots that collide with the requesting client's own appointments.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::capacity::{BookingCounts, CapacityEvaluator, DensityOverrides};
use crate::catalog::{BranchProfile, EmployeeProfile, ServiceProfile};
use crate::conflict::ConflictFilter;
use crate::error::CoreError;
use crate::schedule::WorkScheduleIndex;
use crate::slots::{self, SlotPlan};
use crate::span::Span;
use crate::timezone::{hh_mm, parse_time_zone, resolve_local, today_in};
use crate::types::{EntityId, Timestamp};

/// Longest allowed distance between the first and last day offset.
pub const MAX_SEARCH_WINDOW_DAYS: i64 = 31;

/// Furthest day offset a caller may look ahead.
pub const MAX_DAYS_FORWARD: i64 = 100;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Raw query-string parameters, kept as strings so that malformed values are
/// reported as validation errors rather than extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityParams {
    pub timezone: Option<String>,
    pub date_forward_start: Option<String>,
    pub date_forward_end: Option<String>,
    pub client_public_id: Option<String>,
}

impl AvailabilityParams {
    /// The client whose appointments filter the result, if one was given.
    pub fn client_id(&self) -> Result<Option<EntityId>, CoreError> {
        match self.client_public_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse::<EntityId>().map(Some).map_err(|_| {
                CoreError::Validation(format!("client_public_id is not a valid id: '{raw}'"))
            }),
        }
    }
}

/// A validated availability request.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityQuery {
    pub service_id: EntityId,
    pub start_offset: i64,
    pub end_offset: i64,
    pub time_zone: Tz,
    pub client_id: Option<EntityId>,
}

fn required_offset(name: &str, value: Option<&str>) -> Result<i64, CoreError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::Validation(format!("{name} is required")))?;
    raw.parse::<i64>()
        .map_err(|_| CoreError::Validation(format!("{name} must be an integer, got '{raw}'")))
}

impl AvailabilityQuery {
    pub fn from_params(
        service_id: EntityId,
        params: &AvailabilityParams,
    ) -> Result<Self, CoreError> {
        let start = required_offset("date_forward_start", params.date_forward_start.as_deref())?;
        let end = required_offset("date_forward_end", params.date_forward_end.as_deref())?;

        if end <= start {
            return Err(CoreError::Validation(
                "date_forward_end must be greater than date_forward_start".into(),
            ));
        }
        if end - start > MAX_SEARCH_WINDOW_DAYS {
            return Err(CoreError::Validation(format!(
                "Search window can not exceed {MAX_SEARCH_WINDOW_DAYS} days"
            )));
        }
        if end > MAX_DAYS_FORWARD {
            return Err(CoreError::Validation(format!(
                "date_forward_end can not exceed {MAX_DAYS_FORWARD} days"
            )));
        }
        if start < 0 {
            return Err(CoreError::Validation(
                "date_forward_start can not be negative".into(),
            ));
        }

        let time_zone = parse_time_zone(params.timezone.as_deref().unwrap_or_default())?;
        let client_id = params.client_id()?;

        Ok(Self {
            service_id,
            start_offset: start,
            end_offset: end,
            time_zone,
            client_id,
        })
    }

    /// Calendar dates and absolute UTC span covered by this query as of `now`.
    pub fn window(&self, now: Timestamp) -> SearchWindow {
        let today = today_in(self.time_zone, now);
        let first = today + Duration::days(self.start_offset);
        let last = today + Duration::days(self.end_offset);
        let dates = first
            .iter_days()
            .take_while(|d| *d <= last)
            .collect::<Vec<_>>();
        let start = resolve_local(first, NaiveTime::MIN, self.time_zone);
        let end = resolve_local(last + Duration::days(1), NaiveTime::MIN, self.time_zone);
        SearchWindow {
            dates,
            span: Span::new(start.with_timezone(&Utc), end.with_timezone(&Utc)),
        }
    }
}

/// Dates to enumerate and the UTC span used for every aggregate query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchWindow {
    pub dates: Vec<NaiveDate>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceAvailability {
    pub service_id: EntityId,
    pub time_zone: String,
    pub available_dates: Vec<AvailableDate>,
    pub employee_info: Vec<EmployeeSummary>,
    pub branch_info: Vec<BranchSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableDate {
    pub date: NaiveDate,
    pub branch_id: EntityId,
    pub available_times: Vec<AvailableTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableTime {
    pub time: String,
    pub employee_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeSummary {
    pub id: EntityId,
    pub name: String,
    pub surname: String,
    pub time_zone: String,
    pub slot_granularity: i32,
    pub total_service_density: i32,
}

impl From<&EmployeeProfile> for EmployeeSummary {
    fn from(e: &EmployeeProfile) -> Self {
        Self {
            id: e.id,
            name: e.name.clone(),
            surname: e.surname.clone(),
            time_zone: e.time_zone.name().to_string(),
            slot_granularity: e.slot_granularity,
            total_service_density: e.total_service_density,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchSummary {
    pub id: EntityId,
    pub name: String,
    pub time_zone: String,
    pub total_service_density: i32,
}

impl From<&BranchProfile> for BranchSummary {
    fn from(b: &BranchProfile) -> Self {
        Self {
            id: b.id,
            name: b.name.clone(),
            time_zone: b.time_zone.name().to_string(),
            total_service_density: b.total_service_density,
        }
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Everything the read path loads inside its single snapshot transaction.
#[derive(Debug)]
pub struct AvailabilitySnapshot {
    pub service: ServiceProfile,
    pub index: WorkScheduleIndex,
    pub counts: BookingCounts,
    pub overrides: DensityOverrides,
    /// Present only when the request names a client.
    pub client_conflicts: Option<ConflictFilter>,
}

type SlotKey = DateTime<Utc>;
type Accumulator = BTreeMap<NaiveDate, BTreeMap<EntityId, BTreeMap<SlotKey, (String, BTreeSet<EntityId>)>>>;

/// Build the public availability result. Output is ordered by date, then
/// branch id, then slot instant; employee ids inside a slot are sorted.
pub fn assemble(
    query: &AvailabilityQuery,
    window: &SearchWindow,
    snapshot: &AvailabilitySnapshot,
    now: Timestamp,
) -> ServiceAvailability {
    let evaluator = CapacityEvaluator::new(&snapshot.counts, &snapshot.overrides);
    let mut open: Accumulator = BTreeMap::new();

    for date in &window.dates {
        for (branch_id, ranges) in snapshot.index.ranges_on(date.weekday()) {
            for range in ranges.iter().filter(|r| r.offers(snapshot.service.id)) {
                let Some(employee) = snapshot.index.employee(&range.employee_id) else {
                    continue;
                };
                let plan = SlotPlan {
                    granularity: employee.slot_granularity,
                    duration: snapshot.service.duration_minutes,
                };
                for slot in slots::generate(range, *date, query.time_zone, plan, now) {
                    let instant = slot.with_timezone(&Utc);
                    if !window.span.contains_instant(instant) || !evaluator.has_room(employee, instant) {
                        continue;
                    }
                    open.entry(slot.date_naive())
                        .or_default()
                        .entry(*branch_id)
                        .or_default()
                        .entry(instant)
                        .or_insert_with(|| (hh_mm(&slot), BTreeSet::new()))
                        .1
                        .insert(employee.id);
                }
            }
        }
    }

    if let Some(filter) = &snapshot.client_conflicts {
        for branches in open.values_mut() {
            for times in branches.values_mut() {
                times.retain(|instant, _| filter.allows(*instant));
            }
            branches.retain(|_, times| !times.is_empty());
        }
        open.retain(|_, branches| !branches.is_empty());
    }

    let mut employees = BTreeSet::new();
    let mut branches = BTreeSet::new();
    let mut available_dates = Vec::new();
    for (date, by_branch) in open {
        for (branch_id, times) in by_branch {
            branches.insert(branch_id);
            let available_times = times
                .into_values()
                .map(|(time, ids)| {
                    employees.extend(ids.iter().copied());
                    AvailableTime {
                        time,
                        employee_ids: ids.into_iter().collect(),
                    }
                })
                .collect();
            available_dates.push(AvailableDate {
                date,
                branch_id,
                available_times,
            });
        }
    }

    ServiceAvailability {
        service_id: snapshot.service.id,
        time_zone: query.time_zone.name().to_string(),
        available_dates,
        employee_info: employees
            .iter()
            .filter_map(|id| snapshot.index.employee(id))
            .map(EmployeeSummary::from)
            .collect(),
        branch_info: branches
            .iter()
            .filter_map(|id| snapshot.index.branch(id))
            .map(BranchSummary::from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Weekday};
    use chrono_tz::America::Sao_Paulo;
    use uuid::Uuid;

    use crate::schedule::WorkRange;

    fn params(start: &str, end: &str, tz: Option<&str>) -> AvailabilityParams {
        AvailabilityParams {
            timezone: tz.map(String::from),
            date_forward_start: Some(start.into()),
            date_forward_end: Some(end.into()),
            client_public_id: None,
        }
    }

    // -----------------------------------------------------------------------
    // Query validation
    // -----------------------------------------------------------------------

    #[test]
    fn valid_query_defaults_to_utc() {
        let q = AvailabilityQuery::from_params(Uuid::nil(), &params("0", "7", None)).unwrap();
        assert_eq!(q.time_zone, Tz::UTC);
        assert_eq!((q.start_offset, q.end_offset), (0, 7));
        assert_eq!(q.client_id, None);
    }

    #[test]
    fn rejects_bad_ranges() {
        for (start, end) in [("3", "3"), ("5", "2"), ("0", "32"), ("80", "101"), ("-1", "4")] {
            assert_matches!(
                AvailabilityQuery::from_params(Uuid::nil(), &params(start, end, None)),
                Err(CoreError::Validation(_)),
                "{start}..{end} should be rejected"
            );
        }
        assert!(AvailabilityQuery::from_params(Uuid::nil(), &params("69", "100", None)).is_ok());
    }

    #[test]
    fn rejects_missing_or_malformed_offsets() {
        let mut p = params("0", "1", None);
        p.date_forward_end = None;
        assert_matches!(
            AvailabilityQuery::from_params(Uuid::nil(), &p),
            Err(CoreError::Validation(msg)) if msg.contains("date_forward_end")
        );
        assert_matches!(
            AvailabilityQuery::from_params(Uuid::nil(), &params("zero", "1", None)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn rejects_unknown_zone_and_bad_client() {
        assert_matches!(
            AvailabilityQuery::from_params(Uuid::nil(), &params("0", "1", Some("Nowhere/City"))),
            Err(CoreError::Validation(_))
        );
        let mut p = params("0", "1", None);
        p.client_public_id = Some("not-a-uuid".into());
        assert_matches!(
            AvailabilityQuery::from_params(Uuid::nil(), &p),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn window_covers_inclusive_days_from_local_midnight() {
        let q = AvailabilityQuery::from_params(
            Uuid::nil(),
            &params("1", "2", Some("America/Sao_Paulo")),
        )
        .unwrap();
        // Sunday 2026-03-01 23:30 in Sao Paulo.
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 2, 30, 0).unwrap();
        let window = q.window(now);
        assert_eq!(
            window.dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()
            ]
        );
        assert_eq!(window.span.start, Utc.with_ymd_and_hms(2026, 3, 2, 3, 0, 0).unwrap());
        assert_eq!(window.span.end, Utc.with_ymd_and_hms(2026, 3, 4, 3, 0, 0).unwrap());
    }

    // -----------------------------------------------------------------------
    // Assembly
    // -----------------------------------------------------------------------

    struct Fixture {
        service: ServiceProfile,
        employee: EmployeeProfile,
        branch: BranchProfile,
        range: WorkRange,
    }

    fn fixture() -> Fixture {
        let company = Uuid::new_v4();
        let service = ServiceProfile {
            id: Uuid::new_v4(),
            company_id: company,
            name: "Haircut".into(),
            duration_minutes: 60,
        };
        let employee = EmployeeProfile {
            id: Uuid::new_v4(),
            company_id: company,
            name: "Ana".into(),
            surname: "Lima".into(),
            time_zone: Sao_Paulo,
            slot_granularity: 30,
            total_service_density: 1,
        };
        let branch = BranchProfile {
            id: Uuid::new_v4(),
            company_id: company,
            name: "Centro".into(),
            time_zone: Sao_Paulo,
            total_service_density: -1,
        };
        let range = WorkRange {
            id: Uuid::new_v4(),
            employee_id: employee.id,
            branch_id: branch.id,
            weekday: Weekday::Mon,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            time_zone: Sao_Paulo,
            service_ids: vec![service.id],
        };
        Fixture {
            service,
            employee,
            branch,
            range,
        }
    }

    fn snapshot(f: &Fixture, counts: BookingCounts, conflicts: Option<ConflictFilter>) -> AvailabilitySnapshot {
        AvailabilitySnapshot {
            service: f.service.clone(),
            index: WorkScheduleIndex::build(
                vec![f.range.clone()],
                vec![f.employee.clone()],
                vec![f.branch.clone()],
            ),
            counts,
            overrides: DensityOverrides::default(),
            client_conflicts: conflicts,
        }
    }

    /// Saturday 2026-02-28 noon in Sao Paulo; offsets 2..3 cover Monday/Tuesday.
    fn saturday() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 2, 28, 15, 0, 0).unwrap()
    }

    fn monday_at(h: u32, m: u32) -> Timestamp {
        Sao_Paulo
            .with_ymd_and_hms(2026, 3, 2, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn query(service_id: EntityId) -> AvailabilityQuery {
        AvailabilityQuery::from_params(service_id, &params("2", "3", Some("America/Sao_Paulo")))
            .unwrap()
    }

    #[test]
    fn monday_has_fifteen_slots_before_any_booking() {
        let f = fixture();
        let q = query(f.service.id);
        let result = assemble(&q, &q.window(saturday()), &snapshot(&f, BookingCounts::default(), None), saturday());

        assert_eq!(result.available_dates.len(), 1);
        let day = &result.available_dates[0];
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(day.branch_id, f.branch.id);
        let times: Vec<_> = day.available_times.iter().map(|t| t.time.as_str()).collect();
        assert_eq!(times.len(), 15);
        assert_eq!(times[0], "09:00");
        assert_eq!(times[14], "16:00");
        assert_eq!(day.available_times[0].employee_ids, vec![f.employee.id]);
        assert_eq!(result.employee_info.len(), 1);
        assert_eq!(result.branch_info[0].name, "Centro");
    }

    #[test]
    fn booked_slot_disappears_but_neighbour_stays() {
        let f = fixture();
        let q = query(f.service.id);
        let counts = BookingCounts::from_rows([(f.employee.id, monday_at(9, 0), 1)]);
        let result = assemble(&q, &q.window(saturday()), &snapshot(&f, counts, None), saturday());

        let times: Vec<_> = result.available_dates[0]
            .available_times
            .iter()
            .map(|t| t.time.as_str())
            .collect();
        assert_eq!(times.len(), 14);
        assert_eq!(times[0], "09:30");
    }

    #[test]
    fn client_conflicts_are_removed_last() {
        let f = fixture();
        let q = query(f.service.id);
        let existing = Span::from_start(monday_at(12, 0), 60);
        let filter = ConflictFilter::new([existing], f.service.duration_minutes);
        let result = assemble(&q, &q.window(saturday()), &snapshot(&f, BookingCounts::default(), Some(filter)), saturday());

        let times: Vec<_> = result.available_dates[0]
            .available_times
            .iter()
            .map(|t| t.time.as_str())
            .collect();
        assert!(!times.contains(&"11:30"));
        assert!(!times.contains(&"12:00"));
        assert!(!times.contains(&"12:30"));
        assert!(times.contains(&"11:00"));
        assert!(times.contains(&"13:00"));
        assert_eq!(times.len(), 12);
    }

    #[test]
    fn ranges_for_other_services_are_ignored() {
        let mut f = fixture();
        f.range.service_ids = vec![Uuid::new_v4()];
        let q = query(f.service.id);
        let result = assemble(&q, &q.window(saturday()), &snapshot(&f, BookingCounts::default(), None), saturday());
        assert!(result.available_dates.is_empty());
        assert!(result.employee_info.is_empty());
        assert!(result.branch_info.is_empty());
    }

    #[test]
    fn fully_booked_day_is_omitted() {
        let f = fixture();
        let q = query(f.service.id);
        let counts = BookingCounts::from_rows(
            (0..15).map(|i| (f.employee.id, monday_at(9, 0) + Duration::minutes(30 * i), 1)),
        );
        let result = assemble(&q, &q.window(saturday()), &snapshot(&f, counts, None), saturday());
        assert!(result.available_dates.is_empty());
    }
}
