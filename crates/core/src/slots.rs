//! Slot generation: expand one work range on one date into candidate starts.

use chrono::{DateTime, Duration, NaiveDate, Timelike};
use chrono_tz::Tz;

use crate::schedule::WorkRange;
use crate::timezone::minutes_since_midnight;
use crate::types::{Minutes, Timestamp};

/// Step and length used when expanding a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPlan {
    /// Employee slot granularity.
    pub granularity: Minutes,
    /// Service duration.
    pub duration: Minutes,
}

/// Candidate slot starts for `range` on `date`, expressed in `caller_tz`.
///
/// Starts are never earlier than `now`, always land on a multiple of the
/// granularity counted from local midnight, and every slot ends at or before
/// the range end.
pub fn generate(
    range: &WorkRange,
    date: NaiveDate,
    caller_tz: Tz,
    plan: SlotPlan,
    now: Timestamp,
) -> Vec<DateTime<Tz>> {
    if plan.granularity <= 0 || plan.duration <= 0 {
        return Vec::new();
    }

    let (start, end) = range.window_on(date);
    let end = end.with_timezone(&caller_tz);
    let now = now.with_timezone(&caller_tz);
    let mut cursor = start.with_timezone(&caller_tz);
    if cursor < now {
        cursor = now;
    }
    cursor = align(ceil_to_minute(cursor), plan.granularity);

    let step = Duration::minutes(i64::from(plan.granularity));
    let length = Duration::minutes(i64::from(plan.duration));
    let mut slots = Vec::new();
    while cursor + length <= end {
        slots.push(cursor);
        cursor = align(cursor + step, plan.granularity);
    }
    slots
}

fn ceil_to_minute(t: DateTime<Tz>) -> DateTime<Tz> {
    if t.second() == 0 && t.nanosecond() == 0 {
        return t;
    }
    let truncated = t
        - Duration::seconds(i64::from(t.second()))
        - Duration::nanoseconds(i64::from(t.nanosecond()));
    truncated + Duration::minutes(1)
}

/// Move forward to the next multiple of `granularity` minutes past midnight.
fn align(t: DateTime<Tz>, granularity: Minutes) -> DateTime<Tz> {
    let g = i64::from(granularity);
    let rem = minutes_since_midnight(&t) % g;
    if rem == 0 {
        t
    } else {
        t + Duration::minutes(g - rem)
    }
}
