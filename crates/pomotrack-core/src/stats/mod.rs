//! Statistics over session history.
//!
//! Everything here is a pure function of a record snapshot: summary counts
//! and totals, the longest same-day streak, and the per-day focus series
//! used for charts. Input order never matters.

mod daily;
mod streak;
mod summary;

pub use daily::{daily_focus, DailyFocus};
pub use streak::longest_streak;
pub use summary::{summarize, FocusTimePolicy, StatsSummary};
