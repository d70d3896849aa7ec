use chrono::{DateTime, Utc};

use super::{DateRange, SessionRecord, SessionStatus};
use crate::error::Result;
use crate::timer::Phase;

/// Fields of a record about to be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub user: String,
    pub session_type: Phase,
    pub duration_min: u32,
    pub started_at: DateTime<Utc>,
}

/// Generic record store for sessions.
///
/// Every lookup is scoped to a user; a record owned by someone else is
/// indistinguishable from a missing one.
pub trait SessionStore: Send + Sync {
    /// Persist an open record and return it with its id.
    fn insert(&self, new: &NewSession) -> Result<SessionRecord>;

    fn get(&self, user: &str, id: i64) -> Result<Option<SessionRecord>>;

    /// Move an open record to a terminal status.
    ///
    /// Returns `false` without writing when the record is missing, foreign,
    /// or already finalized.
    fn finalize(
        &self,
        user: &str,
        id: i64,
        status: SessionStatus,
        interruption_reason: Option<&str>,
        ended_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Records for `user`, newest `started_at` first.
    fn list(&self, user: &str, range: Option<&DateRange>) -> Result<Vec<SessionRecord>>;
}
