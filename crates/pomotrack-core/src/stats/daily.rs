use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::session::SessionRecord;

/// Minutes recorded on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFocus {
    pub date: NaiveDate,
    pub minutes: u64,
}

/// Per-day duration totals for the `days` days ending at `today`, oldest first.
///
/// Days without sessions appear with zero minutes. Records outside the
/// window are ignored.
pub fn daily_focus(records: &[SessionRecord], today: NaiveDate, days: u32) -> Vec<DailyFocus> {
    let mut series: Vec<DailyFocus> = (0..i64::from(days))
        .rev()
        .map(|back| DailyFocus {
            date: today - Duration::days(back),
            minutes: 0,
        })
        .collect();

    let Some(first) = series.first().map(|d| d.date) else {
        return series;
    };
    for record in records {
        let date = record.started_at.date_naive();
        if date < first || date > today {
            continue;
        }
        let index = (date - first).num_days() as usize;
        if let Some(slot) = series.get_mut(index) {
            slot.minutes += u64::from(record.duration_min);
        }
    }
    series
}
