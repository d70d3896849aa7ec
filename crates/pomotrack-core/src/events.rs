use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionStatus;
use crate::timer::Phase;

/// Every timer state change produces an Event.
/// The controller broadcasts them; callers render or log them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase: Phase,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    /// An interval ran to zero and the machine moved to the next phase.
    PhaseCompleted {
        phase: Phase,
        next_phase: Phase,
        completed_work_count: u32,
        at: DateTime<Utc>,
    },
    /// The user cut an interval short.
    IntervalInterrupted {
        phase: Phase,
        status: SessionStatus,
        next_phase: Phase,
        completed_work_count: u32,
        at: DateTime<Utc>,
    },
    /// A finished interval was persisted.
    SessionRecorded {
        session_id: i64,
        phase: Phase,
        status: SessionStatus,
        at: DateTime<Utc>,
    },
    /// Persisting a finished interval failed; it stays pending for retry.
    RecordFailed {
        pending_id: uuid::Uuid,
        message: String,
        at: DateTime<Utc>,
    },
}
