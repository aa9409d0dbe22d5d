//! Calendar week bucketing for meeting bonuses.
//!
//! SDR bonuses are paid per week, so meetings must be grouped by the
//! week they fall in.  The grouping rule lives behind the
//! [`WeekBucketing`] trait so the engine has exactly one code path; the
//! shipped policy is [`MondayWeekStart`].

use crate::models::Meeting;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Maps a meeting instant to the week it belongs to.
///
/// Implementations must be thread‑safe (`Send + Sync`) because the
/// orchestrator computes many reps concurrently with one engine.
pub trait WeekBucketing: Send + Sync {
    /// The first day of the week containing `at`.  Two instants share a
    /// bucket exactly when their keys are equal.
    fn bucket_key(&self, at: DateTime<Utc>) -> NaiveDate;
    /// A human-readable label for a key returned by `bucket_key`.
    fn label(&self, key: NaiveDate) -> String;
}

/// Weeks start on Monday (UTC).  The label names the month of that
/// Monday and its ordinal within the month, e.g. `"January week 5"` for
/// the week starting 29 January, even when most of the week falls in
/// February.
///
/// Keying on the full date keeps weeks that straddle a year boundary
/// together, which a bare week-of-year number does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct MondayWeekStart;

impl WeekBucketing for MondayWeekStart {
    fn bucket_key(&self, at: DateTime<Utc>) -> NaiveDate {
        let date = at.date_naive();
        date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
    }

    fn label(&self, key: NaiveDate) -> String {
        let ordinal = (key.day() - 1) / 7 + 1;
        format!("{} week {}", key.format("%B"), ordinal)
    }
}

/// Count meetings per week.  The returned buckets are sorted by key and
/// every meeting is counted in exactly one of them.
pub fn bucket_meetings(strategy: &dyn WeekBucketing, meetings: &[Meeting]) -> Vec<(NaiveDate, u32)> {
    let mut weeks: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for meeting in meetings {
        *weeks.entry(strategy.bucket_key(meeting.timestamp)).or_default() += 1;
    }
    weeks.into_iter().collect()
}
