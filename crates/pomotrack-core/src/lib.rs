//! # Pomotrack Core Library
//!
//! Core logic for the pomotrack Pomodoro tracker. Everything the CLI does
//! goes through this crate.
//!
//! ## Architecture
//!
//! - **Timer**: a pure work/break/long-break state machine, plus an async
//!   controller that ticks it once per second and hands finished intervals
//!   to the recorder
//! - **Sessions**: durable records opened at interval start and finalized
//!   exactly once
//! - **Stats**: summaries, same-day streaks and daily focus series computed
//!   from record snapshots
//! - **Storage**: SQLite stores for sessions and per-user settings, an
//!   in-memory store, and TOML application config
//!
//! ## Key Components
//!
//! - [`TimerMachine`]: timer state machine
//! - [`TimerController`]: real-time driver for one timer
//! - [`Tracker`]: user-scoped operations over the stores
//! - [`Database`]: SQLite persistence
//! - [`AppConfig`]: application configuration

pub mod error;
pub mod events;
pub mod session;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod timer;
pub mod tracker;

pub use error::{ConfigError, CoreError, DatabaseError, FieldViolation, Result, ValidationError};
pub use events::Event;
pub use session::{DateRange, PendingRecord, SessionRecord, SessionRecorder, SessionStatus, SessionStore};
pub use settings::{Settings, SettingsPatch, SettingsStore};
pub use stats::{DailyFocus, FocusTimePolicy, StatsSummary};
pub use storage::{AppConfig, Database, MemoryStore};
pub use timer::{ControllerOptions, Phase, TimerController, TimerMachine, TimerSnapshot};
pub use tracker::Tracker;
