use serde::{Deserialize, Serialize};

use super::streak::longest_streak;
use crate::session::{SessionRecord, SessionStatus};

/// Which records contribute to `total_focus_time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusTimePolicy {
    /// Every record, whatever its type.
    #[default]
    All,
    /// Only work records.
    WorkOnly,
}

impl FocusTimePolicy {
    fn counts(&self, record: &SessionRecord) -> bool {
        match self {
            FocusTimePolicy::All => true,
            FocusTimePolicy::WorkOnly => record.session_type.is_work(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub interrupted_sessions: u64,
    pub aborted_sessions: u64,
    /// Minutes.
    pub total_focus_time: u64,
    /// `total_focus_time / total_sessions`, or 0 with no sessions.
    pub average_session_duration: f64,
    pub longest_streak: u32,
    pub focus_time_policy: FocusTimePolicy,
}

/// Reduce records to summary statistics.
///
/// Open records count toward the total but toward no status bucket.
pub fn summarize(records: &[SessionRecord], policy: FocusTimePolicy) -> StatsSummary {
    let mut summary = StatsSummary {
        focus_time_policy: policy,
        ..Default::default()
    };

    for record in records {
        summary.total_sessions += 1;
        match record.status {
            Some(SessionStatus::Completed) => summary.completed_sessions += 1,
            Some(SessionStatus::Interrupted) => summary.interrupted_sessions += 1,
            Some(SessionStatus::Aborted) => summary.aborted_sessions += 1,
            None => {}
        }
        if policy.counts(record) {
            summary.total_focus_time += u64::from(record.duration_min);
        }
    }

    summary.average_session_duration = if summary.total_sessions == 0 {
        0.0
    } else {
        summary.total_focus_time as f64 / summary.total_sessions as f64
    };
    summary.longest_streak = longest_streak(records);
    summary
}
