//! In-process record store.
//!
//! Backs tests and short-lived runs that should leave nothing on disk.
//! [`MemoryStore::set_offline`] makes every call fail with
//! [`DatabaseError::Unavailable`], which is how callers exercise their
//! persistence-failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::{DatabaseError, Result};
use crate::session::{DateRange, NewSession, SessionRecord, SessionStatus, SessionStore};
use crate::settings::{Settings, SettingsPatch, SettingsStore};

#[derive(Default)]
struct Tables {
    next_id: i64,
    sessions: Vec<SessionRecord>,
    settings: HashMap<String, Settings>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable backend.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, DatabaseError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("memory store is offline".into()));
        }
        self.tables
            .lock()
            .map_err(|_| DatabaseError::Unavailable("memory store lock poisoned".into()))
    }
}

impl SessionStore for MemoryStore {
    fn insert(&self, new: &NewSession) -> Result<SessionRecord> {
        let mut tables = self.tables()?;
        tables.next_id += 1;
        let record = SessionRecord {
            id: tables.next_id,
            user: new.user.clone(),
            session_type: new.session_type,
            duration_min: new.duration_min,
            started_at: new.started_at,
            ended_at: None,
            status: None,
            interruption_reason: None,
        };
        tables.sessions.push(record.clone());
        Ok(record)
    }

    fn get(&self, user: &str, id: i64) -> Result<Option<SessionRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .sessions
            .iter()
            .find(|s| s.id == id && s.user == user)
            .cloned())
    }

    fn finalize(
        &self,
        user: &str,
        id: i64,
        status: SessionStatus,
        interruption_reason: Option<&str>,
        ended_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tables = self.tables()?;
        let Some(record) = tables
            .sessions
            .iter_mut()
            .find(|s| s.id == id && s.user == user && s.is_open())
        else {
            return Ok(false);
        };
        record.status = Some(status);
        record.ended_at = Some(ended_at);
        record.interruption_reason = interruption_reason.map(str::to_string);
        Ok(true)
    }

    fn list(&self, user: &str, range: Option<&DateRange>) -> Result<Vec<SessionRecord>> {
        let tables = self.tables()?;
        let mut records: Vec<SessionRecord> = tables
            .sessions
            .iter()
            .filter(|s| s.user == user)
            .filter(|s| range.map_or(true, |r| r.contains(s.started_at)))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, user: &str) -> Result<Settings> {
        let tables = self.tables()?;
        Ok(tables.settings.get(user).cloned().unwrap_or_default())
    }

    fn update(&self, user: &str, patch: &SettingsPatch) -> Result<Settings> {
        let mut tables = self.tables()?;
        let current = tables.settings.get(user).cloned().unwrap_or_default();
        let merged = current.apply(patch)?;
        tables.settings.insert(user.to_string(), merged.clone());
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Phase;
    use chrono::Duration;

    fn new_session(user: &str, minutes_ago: i64) -> NewSession {
        NewSession {
            user: user.into(),
            session_type: Phase::Work,
            duration_min: 25,
            started_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn list_is_newest_first_and_user_scoped() {
        let store = MemoryStore::new();
        store.insert(&new_session("ada", 90)).unwrap();
        store.insert(&new_session("ada", 10)).unwrap();
        store.insert(&new_session("bob", 5)).unwrap();

        let listed = store.list("ada", None).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].started_at > listed[1].started_at);
    }

    #[test]
    fn finalize_only_once() {
        let store = MemoryStore::new();
        let rec = store.insert(&new_session("ada", 1)).unwrap();
        let now = Utc::now();
        assert!(SessionStore::finalize(&store, "ada", rec.id, SessionStatus::Completed, None, now).unwrap());
        assert!(!SessionStore::finalize(&store, "ada", rec.id, SessionStatus::Aborted, None, now).unwrap());
        assert!(!SessionStore::finalize(&store, "bob", rec.id, SessionStatus::Aborted, None, now).unwrap());
    }

    #[test]
    fn settings_default_then_patch() {
        let store = MemoryStore::new();
        assert_eq!(SettingsStore::get(&store, "ada").unwrap(), Settings::default());
        let patch = SettingsPatch {
            work_duration: Some(50),
            ..Default::default()
        };
        let updated = store.update("ada", &patch).unwrap();
        assert_eq!(updated.work_duration, 50);
        assert_eq!(SettingsStore::get(&store, "bob").unwrap(), Settings::default());
    }

    #[test]
    fn rejected_patch_leaves_settings_untouched() {
        let store = MemoryStore::new();
        let bad = SettingsPatch {
            work_duration: Some(40),
            break_duration: Some(99),
            ..Default::default()
        };
        assert!(store.update("ada", &bad).is_err());
        assert_eq!(SettingsStore::get(&store, "ada").unwrap(), Settings::default());
    }

    #[test]
    fn offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(store.insert(&new_session("ada", 1)).is_err());
        assert!(store.list("ada", None).is_err());
        store.set_offline(false);
        assert!(store.list("ada", None).unwrap().is_empty());
    }
}
