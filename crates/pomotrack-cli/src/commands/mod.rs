pub mod config;
pub mod session;
pub mod settings;
pub mod stats;
pub mod timer;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use pomotrack_core::{AppConfig, Database, Tracker};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn open_tracker(config: &AppConfig) -> Result<Tracker, Box<dyn std::error::Error>> {
    let db = Database::open_at(&config.database_path()?)?;
    Ok(Tracker::with_database(Arc::new(db)).with_focus_time(config.analytics.focus_time))
}

pub fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// RFC 3339 instant, or a bare date meaning its first instant (UTC).
pub fn parse_start(s: &str) -> Result<DateTime<Utc>, String> {
    parse_instant(s, NaiveTime::MIN)
}

/// RFC 3339 instant, or a bare date meaning its last instant (UTC).
pub fn parse_end(s: &str) -> Result<DateTime<Utc>, String> {
    let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    parse_instant(s, last)
}

fn parse_instant(s: &str, time_of_day: NaiveTime) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(time_of_day).and_utc())
        .map_err(|_| format!("expected RFC 3339 or YYYY-MM-DD, got '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn bare_dates_cover_the_whole_day() {
        let start = parse_start("2024-05-01").unwrap();
        let end = parse_end("2024-05-01").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(end.hour(), 23);
        assert_eq!(end.date_naive(), start.date_naive());
    }

    #[test]
    fn rfc3339_is_normalized_to_utc() {
        let at = parse_start("2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_start("yesterday").is_err());
    }
}
