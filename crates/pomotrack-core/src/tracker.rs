//! User-scoped operations over the session and settings stores.
//!
//! This is the surface the CLI talks to. Every call names the user it acts
//! for; records owned by someone else are reported as not found.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::session::{DateRange, SessionRecord, SessionRecorder, SessionStatus, SessionStore};
use crate::settings::{Settings, SettingsPatch, SettingsStore};
use crate::stats::{daily_focus, summarize, DailyFocus, FocusTimePolicy, StatsSummary};
use crate::storage::Database;
use crate::timer::{ControllerOptions, Phase, TimerController};

const WEEK_DAYS: u32 = 7;

#[derive(Clone)]
pub struct Tracker {
    recorder: SessionRecorder,
    settings: Arc<dyn SettingsStore>,
    focus_time: FocusTimePolicy,
}

impl Tracker {
    pub fn new(sessions: Arc<dyn SessionStore>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            recorder: SessionRecorder::new(sessions),
            settings,
            focus_time: FocusTimePolicy::default(),
        }
    }

    /// Both stores backed by one database.
    pub fn with_database(db: Arc<Database>) -> Self {
        Self::new(db.clone(), db)
    }

    /// Policy used by [`Tracker::stats`].
    pub fn with_focus_time(mut self, policy: FocusTimePolicy) -> Self {
        self.focus_time = policy;
        self
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// Open a session starting now with a planned duration in minutes.
    ///
    /// # Errors
    /// Validation error unless `duration_min` is a positive minute count.
    pub fn create(&self, user: &str, session_type: Phase, duration_min: i64) -> Result<SessionRecord> {
        let minutes = u32::try_from(duration_min)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "duration".into(),
                message: format!("must be a positive number of minutes, got {duration_min}"),
            })?;
        self.recorder.open(user, session_type, minutes)
    }

    /// Finalize one of the user's open sessions.
    pub fn end(
        &self,
        session_id: i64,
        user: &str,
        status: SessionStatus,
        interruption_reason: Option<&str>,
    ) -> Result<SessionRecord> {
        self.recorder.end(user, session_id, status, interruption_reason)
    }

    /// The user's sessions, newest first. Filtered only when both bounds are given.
    pub fn list(
        &self,
        user: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SessionRecord>> {
        let range = DateRange::from_bounds(start, end)?;
        self.recorder.list(user, range.as_ref())
    }

    /// Summary over [`Tracker::list`] with the configured focus-time policy.
    pub fn stats(
        &self,
        user: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<StatsSummary> {
        self.stats_with(user, start, end, self.focus_time)
    }

    pub fn stats_with(
        &self,
        user: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        policy: FocusTimePolicy,
    ) -> Result<StatsSummary> {
        let records = self.list(user, start, end)?;
        debug!(user, count = records.len(), ?policy, "summarizing sessions");
        Ok(summarize(&records, policy))
    }

    /// Minutes per UTC day over the last seven days, oldest first.
    pub fn weekly_focus(&self, user: &str) -> Result<Vec<DailyFocus>> {
        self.weekly_focus_at(user, Utc::now())
    }

    fn weekly_focus_at(&self, user: &str, now: DateTime<Utc>) -> Result<Vec<DailyFocus>> {
        let today = now.date_naive();
        let first = today - Duration::days(i64::from(WEEK_DAYS) - 1);
        let start = first.and_time(NaiveTime::MIN).and_utc();
        let range = DateRange::new(start, now)?;
        let records = self.recorder.list(user, Some(&range))?;
        Ok(daily_focus(&records, today, WEEK_DAYS))
    }

    pub fn settings(&self, user: &str) -> Result<Settings> {
        self.settings.get(user)
    }

    /// # Errors
    /// Every out-of-range field is reported; nothing is written in that case.
    pub fn update_settings(&self, user: &str, patch: &SettingsPatch) -> Result<Settings> {
        self.settings.update(user, patch)
    }

    /// A timer for `user` loaded with their current settings.
    pub fn controller(&self, user: &str, options: ControllerOptions) -> Result<TimerController> {
        let settings = self.settings(user)?;
        Ok(TimerController::new(
            user,
            settings,
            self.recorder.clone(),
            options,
        ))
    }
}
