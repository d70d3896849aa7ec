//! SQLite-backed session and settings storage.
//!
//! Provides persistent storage for:
//! - Session records (open and finalized)
//! - One settings row per user

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::session::{DateRange, NewSession, SessionRecord, SessionStatus, SessionStore};
use crate::settings::{Settings, SettingsPatch, SettingsStore};
use crate::timer::Phase;

const SESSION_COLUMNS: &str = "id, user, session_type, duration_min, started_at, ended_at, status, interruption_reason";

/// SQLite database for session and settings storage.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data dir>/pomotrack.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("pomotrack.db");
        Self::open_at(&path)
    }

    /// Open (and migrate) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn
            .lock()
            .map_err(|_| DatabaseError::Unavailable("connection lock poisoned".into()))
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            user                TEXT NOT NULL,
            session_type        TEXT NOT NULL,
            duration_min        INTEGER NOT NULL CHECK (duration_min > 0),
            started_at          TEXT NOT NULL,
            ended_at            TEXT,
            status              TEXT,
            interruption_reason TEXT,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
            user                    TEXT PRIMARY KEY,
            work_duration           INTEGER NOT NULL,
            break_duration          INTEGER NOT NULL,
            long_break_duration     INTEGER NOT NULL,
            cycles_until_long_break INTEGER NOT NULL,
            notifications           INTEGER NOT NULL,
            sound                   INTEGER NOT NULL,
            updated_at              TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user_started_at ON sessions(user, started_at);",
    )
}

/// Fixed-width UTC text, so lexical order equals chronological order.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Corrupt {
            table: "sessions",
            message: format!("bad timestamp '{raw}': {e}"),
        })
}

struct RawSession {
    id: i64,
    user: String,
    session_type: String,
    duration_min: u32,
    started_at: String,
    ended_at: Option<String>,
    status: Option<String>,
    interruption_reason: Option<String>,
}

impl RawSession {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user: row.get(1)?,
            session_type: row.get(2)?,
            duration_min: row.get(3)?,
            started_at: row.get(4)?,
            ended_at: row.get(5)?,
            status: row.get(6)?,
            interruption_reason: row.get(7)?,
        })
    }

    fn decode(self) -> Result<SessionRecord, DatabaseError> {
        let corrupt = |message: String| DatabaseError::Corrupt {
            table: "sessions",
            message,
        };
        let session_type = self
            .session_type
            .parse::<Phase>()
            .map_err(|e| corrupt(e.to_string()))?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<SessionStatus>)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;
        Ok(SessionRecord {
            id: self.id,
            user: self.user,
            session_type,
            duration_min: self.duration_min,
            started_at: parse_ts(&self.started_at)?,
            ended_at: self.ended_at.as_deref().map(parse_ts).transpose()?,
            status,
            interruption_reason: self.interruption_reason,
        })
    }
}

impl SessionStore for Database {
    fn insert(&self, new: &NewSession) -> Result<SessionRecord> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (user, session_type, duration_min, started_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new.user,
                new.session_type.as_str(),
                new.duration_min,
                ts(new.started_at),
                ts(Utc::now()),
            ],
        )?;
        Ok(SessionRecord {
            id: conn.last_insert_rowid(),
            user: new.user.clone(),
            session_type: new.session_type,
            duration_min: new.duration_min,
            started_at: new.started_at,
            ended_at: None,
            status: None,
            interruption_reason: None,
        })
    }

    fn get(&self, user: &str, id: i64) -> Result<Option<SessionRecord>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1 AND user = ?2"),
                params![id, user],
                RawSession::from_row,
            )
            .optional()?;
        Ok(raw.map(RawSession::decode).transpose()?)
    }

    fn finalize(
        &self,
        user: &str,
        id: i64,
        status: SessionStatus,
        interruption_reason: Option<&str>,
        ended_at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE sessions
             SET status = ?1, interruption_reason = ?2, ended_at = ?3
             WHERE id = ?4 AND user = ?5 AND status IS NULL",
            params![status.as_str(), interruption_reason, ts(ended_at), id, user],
        )?;
        Ok(changed == 1)
    }

    fn list(&self, user: &str, range: Option<&DateRange>) -> Result<Vec<SessionRecord>> {
        let conn = self.conn()?;
        let raws = match range {
            Some(range) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE user = ?1 AND started_at >= ?2 AND started_at <= ?3
                     ORDER BY started_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map(
                    params![user, ts(range.start), ts(range.end)],
                    RawSession::from_row,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE user = ?1
                     ORDER BY started_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map(params![user], RawSession::from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        let records = raws
            .into_iter()
            .map(RawSession::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

impl SettingsStore for Database {
    fn get(&self, user: &str) -> Result<Settings> {
        let conn = self.conn()?;
        Ok(load_settings(&conn, user)?.unwrap_or_default())
    }

    fn update(&self, user: &str, patch: &SettingsPatch) -> Result<Settings> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let current = load_settings(&tx, user)?.unwrap_or_default();
        let merged = current.apply(patch)?;
        tx.execute(
            "INSERT INTO settings (user, work_duration, break_duration, long_break_duration,
                                   cycles_until_long_break, notifications, sound, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(user) DO UPDATE SET
                work_duration = excluded.work_duration,
                break_duration = excluded.break_duration,
                long_break_duration = excluded.long_break_duration,
                cycles_until_long_break = excluded.cycles_until_long_break,
                notifications = excluded.notifications,
                sound = excluded.sound,
                updated_at = excluded.updated_at",
            params![
                user,
                merged.work_duration,
                merged.break_duration,
                merged.long_break_duration,
                merged.cycles_until_long_break,
                merged.notifications,
                merged.sound,
                ts(Utc::now()),
            ],
        )?;
        tx.commit()?;
        Ok(merged)
    }
}

fn load_settings(conn: &Connection, user: &str) -> Result<Option<Settings>, DatabaseError> {
    let settings = conn
        .query_row(
            "SELECT work_duration, break_duration, long_break_duration,
                    cycles_until_long_break, notifications, sound
             FROM settings WHERE user = ?1",
            params![user],
            |row| {
                Ok(Settings {
                    work_duration: row.get(0)?,
                    break_duration: row.get(1)?,
                    long_break_duration: row.get(2)?,
                    cycles_until_long_break: row.get(3)?,
                    notifications: row.get(4)?,
                    sound: row.get(5)?,
                })
            },
        )
        .optional()?;
    if let Some(settings) = &settings {
        settings.validate().map_err(|e| DatabaseError::Corrupt {
            table: "settings",
            message: format!("user '{user}': {e}"),
        })?;
    }
    Ok(settings)
}
