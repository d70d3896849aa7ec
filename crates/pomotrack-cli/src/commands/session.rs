use chrono::{DateTime, Utc};
use clap::Subcommand;
use pomotrack_core::{AppConfig, Phase, SessionStatus};

use super::{open_tracker, parse_end, parse_start, print_json, CmdResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Open a session starting now
    Create {
        /// work, break or longBreak
        #[arg(long = "type", default_value = "work")]
        session_type: Phase,
        /// Planned minutes; defaults to the user's setting for the type
        #[arg(long, allow_negative_numbers = true)]
        duration: Option<i64>,
    },
    /// Finalize an open session
    End {
        /// Session ID
        id: i64,
        /// completed, interrupted or aborted
        #[arg(long, default_value = "completed")]
        status: SessionStatus,
        /// Why the session was cut short
        #[arg(long)]
        reason: Option<String>,
    },
    /// List sessions, newest first
    List {
        /// Earliest start (RFC 3339 or YYYY-MM-DD); needs --end to filter
        #[arg(long, value_parser = parse_start)]
        start: Option<DateTime<Utc>>,
        /// Latest start (RFC 3339 or YYYY-MM-DD); needs --start to filter
        #[arg(long, value_parser = parse_end)]
        end: Option<DateTime<Utc>>,
    },
}

pub fn run(action: SessionAction, user: &str, config: &AppConfig) -> CmdResult {
    let tracker = open_tracker(config)?;

    match action {
        SessionAction::Create {
            session_type,
            duration,
        } => {
            let duration = match duration {
                Some(minutes) => minutes,
                None => i64::from(session_type.minutes(&tracker.settings(user)?)),
            };
            print_json(&tracker.create(user, session_type, duration)?)
        }
        SessionAction::End { id, status, reason } => {
            print_json(&tracker.end(id, user, status, reason.as_deref())?)
        }
        SessionAction::List { start, end } => print_json(&tracker.list(user, start, end)?),
    }
}
