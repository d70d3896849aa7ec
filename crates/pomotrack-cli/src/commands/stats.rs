use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use pomotrack_core::{AppConfig, FocusTimePolicy};

use super::{open_tracker, parse_end, parse_start, print_json, CmdResult};

#[derive(Clone, Copy, ValueEnum)]
pub enum FocusTime {
    /// Every session counts
    All,
    /// Only work sessions count
    WorkOnly,
}

impl From<FocusTime> for FocusTimePolicy {
    fn from(value: FocusTime) -> Self {
        match value {
            FocusTime::All => FocusTimePolicy::All,
            FocusTime::WorkOnly => FocusTimePolicy::WorkOnly,
        }
    }
}

#[derive(Subcommand)]
pub enum StatsAction {
    /// Summary statistics over the user's sessions
    Summary {
        /// Earliest start (RFC 3339 or YYYY-MM-DD); needs --end to filter
        #[arg(long, value_parser = parse_start)]
        start: Option<DateTime<Utc>>,
        /// Latest start (RFC 3339 or YYYY-MM-DD); needs --start to filter
        #[arg(long, value_parser = parse_end)]
        end: Option<DateTime<Utc>>,
        /// Which sessions count toward total focus time [default: from config]
        #[arg(long, value_enum)]
        focus_time: Option<FocusTime>,
    },
    /// Minutes per day over the last seven days
    Week,
}

pub fn run(action: StatsAction, user: &str, config: &AppConfig) -> CmdResult {
    let tracker = open_tracker(config)?;

    match action {
        StatsAction::Summary {
            start,
            end,
            focus_time,
        } => {
            let stats = match focus_time {
                Some(policy) => tracker.stats_with(user, start, end, policy.into())?,
                None => tracker.stats(user, start, end)?,
            };
            print_json(&stats)
        }
        StatsAction::Week => print_json(&tracker.weekly_focus(user)?),
    }
}
