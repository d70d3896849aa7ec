use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::settings::Settings;

/// Activity type of an interval. Also used as the type of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Work,
    Break,
    LongBreak,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::Break => "break",
            Phase::LongBreak => "longBreak",
        }
    }

    pub fn is_work(&self) -> bool {
        matches!(self, Phase::Work)
    }

    /// Configured length of this phase in minutes.
    pub fn minutes(&self, settings: &Settings) -> u32 {
        match self {
            Phase::Work => settings.work_duration,
            Phase::Break => settings.break_duration,
            Phase::LongBreak => settings.long_break_duration,
        }
    }

    /// Configured length of this phase in seconds.
    pub fn seconds(&self, settings: &Settings) -> u32 {
        self.minutes(settings).saturating_mul(60)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Phase::Work),
            "break" => Ok(Phase::Break),
            "longBreak" | "long_break" | "long-break" => Ok(Phase::LongBreak),
            other => Err(ValidationError::InvalidValue {
                field: "type".into(),
                message: format!("unknown session type '{other}'"),
            }),
        }
    }
}

/// Phase that follows a finished work interval.
///
/// `completed_work_count` is 1-based: the count after the just-finished
/// interval was added. A count of zero never yields a long break.
pub fn break_after(completed_work_count: u32, cycles_until_long_break: u32) -> Phase {
    if completed_work_count > 0
        && cycles_until_long_break > 0
        && completed_work_count % cycles_until_long_break == 0
    {
        Phase::LongBreak
    } else {
        Phase::Break
    }
}
