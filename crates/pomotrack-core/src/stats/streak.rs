use chrono::NaiveDate;

use crate::session::SessionRecord;

/// Longest run of chronologically adjacent records sharing a UTC calendar date.
///
/// Several sessions on one day all count toward the same run; any change
/// of date, even to the next day, starts a new run at 1.
pub fn longest_streak(records: &[SessionRecord]) -> u32 {
    let mut days: Vec<(chrono::DateTime<chrono::Utc>, NaiveDate)> = records
        .iter()
        .map(|r| (r.started_at, r.started_at.date_naive()))
        .collect();
    days.sort_by_key(|(started_at, _)| *started_at);

    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for (_, day) in days {
        current = if previous == Some(day) { current + 1 } else { 1 };
        longest = longest.max(current);
        previous = Some(day);
    }
    longest
}
