//! Core error types for pomotrack-core.
//!
//! Errors are split by concern: validation failures are recoverable by the
//! caller fixing the input, persistence failures leave timer state untouched
//! and can be retried, and lookups that miss (or hit another user's record)
//! are reported as not found.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomotrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// App configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The record does not exist or belongs to a different user.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn session_not_found(id: i64) -> Self {
        CoreError::NotFound {
            what: "Session",
            id: id.to_string(),
        }
    }

    /// True for failures of the underlying store, which callers may retry.
    pub fn is_persistence(&self) -> bool {
        matches!(self, CoreError::Database(_))
    }
}

/// Persistence errors raised by a record store.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The store cannot be reached at all.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded.
    #[error("Corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },
}

/// App configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// No usable data directory
    #[error("Cannot resolve data directory: {0}")]
    DataDir(String),
}

/// One rejected field of a settings update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub value: i64,
    pub min: u32,
    pub max: u32,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must be between {} and {} (got {})",
            self.field, self.min, self.max, self.value
        )
    }
}

/// Validation errors. The rejected mutation is never applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Settings fields outside their allowed ranges
    #[error("invalid settings: {}", join_violations(.0))]
    Settings(Vec<FieldViolation>),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Session has already reached a terminal status
    #[error("session {id} is already finalized")]
    AlreadyFinalized { id: i64 },

    /// Completed sessions carry no interruption reason
    #[error("interruption reason is only allowed for interrupted or aborted sessions")]
    ReasonWithCompleted,

    /// Invalid time range
    #[error("Invalid time range: end ({end}) must not precede start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// The current interval was never started
    #[error("no interval in progress")]
    NothingInProgress,
}

impl ValidationError {
    /// Names of the offending fields, for structured reporting.
    pub fn fields(&self) -> Vec<String> {
        match self {
            ValidationError::Settings(violations) => {
                violations.iter().map(|v| v.field.to_string()).collect()
            }
            ValidationError::InvalidValue { field, .. } => vec![field.clone()],
            ValidationError::AlreadyFinalized { .. } => vec!["status".into()],
            ValidationError::ReasonWithCompleted => vec!["interruption_reason".into()],
            ValidationError::InvalidTimeRange { .. } => {
                vec!["start_date".into(), "end_date".into()]
            }
            ValidationError::NothingInProgress => vec!["timer".into()],
        }
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_violation_lists_every_field() {
        let err = ValidationError::Settings(vec![
            FieldViolation {
                field: "work_duration",
                value: 0,
                min: 1,
                max: 60,
            },
            FieldViolation {
                field: "break_duration",
                value: 31,
                min: 1,
                max: 30,
            },
        ]);
        assert_eq!(err.fields(), vec!["work_duration", "break_duration"]);
        let msg = err.to_string();
        assert!(msg.contains("work_duration must be between 1 and 60 (got 0)"));
        assert!(msg.contains("break_duration"));
    }

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }

    #[test]
    fn persistence_errors_are_flagged() {
        let err = CoreError::Database(DatabaseError::Unavailable("down".into()));
        assert!(err.is_persistence());
        assert!(!CoreError::session_not_found(3).is_persistence());
    }
}
