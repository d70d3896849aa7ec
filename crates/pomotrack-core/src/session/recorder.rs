//! Session recorder: opens and finalizes records through a [`SessionStore`].
//!
//! The recorder keeps no cache; every call is a store round trip.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{DateRange, NewSession, SessionRecord, SessionStatus, SessionStore};
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::timer::{FinishedInterval, Phase};

/// A finished interval that has not been fully persisted yet.
///
/// Retrying reuses the captured start instant and planned duration. Once
/// the record has been opened its id is kept so a retry only finalizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub id: Uuid,
    pub user: String,
    pub interval: FinishedInterval,
    pub session_id: Option<i64>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl PendingRecord {
    pub fn new(user: impl Into<String>, interval: FinishedInterval) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.into(),
            interval,
            session_id: None,
            attempts: 0,
            last_error: None,
        }
    }
}

#[derive(Clone)]
pub struct SessionRecorder {
    store: Arc<dyn SessionStore>,
}

impl SessionRecorder {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Open a record starting now.
    ///
    /// # Errors
    /// Validation error for a zero duration, or the store's error.
    pub fn open(&self, user: &str, session_type: Phase, planned_minutes: u32) -> Result<SessionRecord> {
        self.open_at(user, session_type, planned_minutes, Utc::now())
    }

    /// Open a record with an already captured start instant.
    pub fn open_at(
        &self,
        user: &str,
        session_type: Phase,
        planned_minutes: u32,
        started_at: DateTime<Utc>,
    ) -> Result<SessionRecord> {
        if planned_minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration".into(),
                message: "must be a positive number of minutes".into(),
            }
            .into());
        }
        let record = self.store.insert(&NewSession {
            user: user.to_string(),
            session_type,
            duration_min: planned_minutes,
            started_at,
        })?;
        debug!(id = record.id, user, %session_type, "session opened");
        Ok(record)
    }

    /// Move an open record to its terminal status.
    ///
    /// # Errors
    /// - [`ValidationError::ReasonWithCompleted`] for a reason on `completed`
    /// - [`ValidationError::AlreadyFinalized`] if the record has a status
    /// - not found if the record vanished, or the store's error
    pub fn finalize(
        &self,
        record: &SessionRecord,
        status: SessionStatus,
        interruption_reason: Option<&str>,
    ) -> Result<SessionRecord> {
        let reason = normalize_reason(status, interruption_reason)?;
        if !record.is_open() {
            return Err(ValidationError::AlreadyFinalized { id: record.id }.into());
        }

        let ended_at = Utc::now().max(record.started_at);
        let written = self.store.finalize(
            &record.user,
            record.id,
            status,
            reason.as_deref(),
            ended_at,
        )?;
        if !written {
            // Lost a race with another finalize, or the record is gone.
            return match self.store.get(&record.user, record.id)? {
                Some(current) if !current.is_open() => {
                    Err(ValidationError::AlreadyFinalized { id: record.id }.into())
                }
                Some(_) => Err(DatabaseError::QueryFailed(format!(
                    "session {} was not updated",
                    record.id
                ))
                .into()),
                None => Err(CoreError::session_not_found(record.id)),
            };
        }

        info!(id = record.id, user = %record.user, %status, "session finalized");
        Ok(SessionRecord {
            ended_at: Some(ended_at),
            status: Some(status),
            interruption_reason: reason,
            ..record.clone()
        })
    }

    /// Finalize the user's record `id`.
    pub fn end(
        &self,
        user: &str,
        id: i64,
        status: SessionStatus,
        interruption_reason: Option<&str>,
    ) -> Result<SessionRecord> {
        normalize_reason(status, interruption_reason)?;
        let record = self
            .store
            .get(user, id)?
            .ok_or_else(|| CoreError::session_not_found(id))?;
        self.finalize(&record, status, interruption_reason)
    }

    /// The user's records, newest first, optionally limited to `range`.
    pub fn list(&self, user: &str, range: Option<&DateRange>) -> Result<Vec<SessionRecord>> {
        self.store.list(user, range)
    }

    /// Persist a finished interval: open (unless already opened) then finalize.
    ///
    /// On failure `pending` keeps whatever progress was made, so calling
    /// this again resumes instead of duplicating the record.
    pub fn record(&self, pending: &mut PendingRecord) -> Result<SessionRecord> {
        pending.attempts = pending.attempts.saturating_add(1);
        let result = self.record_inner(pending);
        pending.last_error = result.as_ref().err().map(ToString::to_string);
        result
    }

    fn record_inner(&self, pending: &mut PendingRecord) -> Result<SessionRecord> {
        let interval = pending.interval.clone();
        let record = match pending.session_id {
            None => {
                let record = self.open_at(
                    &pending.user,
                    interval.phase,
                    interval.planned_minutes,
                    interval.started_at,
                )?;
                pending.session_id = Some(record.id);
                record
            }
            Some(id) => {
                let record = self
                    .store
                    .get(&pending.user, id)?
                    .ok_or_else(|| CoreError::session_not_found(id))?;
                if !record.is_open() {
                    return Ok(record);
                }
                record
            }
        };
        self.finalize(
            &record,
            interval.status,
            interval.interruption_reason.as_deref(),
        )
    }
}

fn normalize_reason(
    status: SessionStatus,
    reason: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    match (status, reason) {
        (SessionStatus::Completed, Some(_)) => Err(ValidationError::ReasonWithCompleted),
        (_, reason) => Ok(reason.map(str::to_string)),
    }
}
