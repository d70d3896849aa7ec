//! Work / break / long-break state machine.
//!
//! The machine is pure: no clock, no threads, no I/O. Callers pass the
//! current instant into every command and drive `tick()` once per second.
//!
//! ## Transitions
//!
//! ```text
//! work --complete--> break | longBreak --complete--> work
//! ```
//!
//! Every completion (natural or interrupted) forces `running = false`, so
//! the next interval needs an explicit start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::{break_after, Phase};
use crate::error::ValidationError;
use crate::events::Event;
use crate::session::SessionStatus;
use crate::settings::Settings;

/// Identity of the in-progress interval, captured on its first start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalCapture {
    pub phase: Phase,
    /// Minutes configured for the phase when the interval started.
    pub planned_minutes: u32,
    pub started_at: DateTime<Utc>,
}

/// An interval that reached a terminal status and should become a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedInterval {
    pub phase: Phase,
    pub planned_minutes: u32,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub interruption_reason: Option<String>,
}

/// Result of a phase completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub event: Event,
    /// Present when the finished interval must be recorded.
    pub finished: Option<FinishedInterval>,
}

/// Read-only view of the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub remaining_secs: u32,
    pub total_secs: u32,
    pub running: bool,
    pub completed_work_count: u32,
    pub interval: Option<IntervalCapture>,
}

#[derive(Debug, Clone)]
pub struct TimerMachine {
    /// Settings governing the current interval.
    settings: Settings,
    /// Settings received mid-interval, adopted at the next transition.
    next_settings: Option<Settings>,
    phase: Phase,
    remaining_secs: u32,
    running: bool,
    completed_work_count: u32,
    interval: Option<IntervalCapture>,
    record_breaks: bool,
}

impl TimerMachine {
    /// Fresh machine: work phase at full length, paused, zero completed.
    pub fn new(settings: Settings) -> Self {
        let remaining_secs = Phase::Work.seconds(&settings);
        Self {
            settings,
            next_settings: None,
            phase: Phase::Work,
            remaining_secs,
            running: false,
            completed_work_count: 0,
            interval: None,
            record_breaks: false,
        }
    }

    /// Also emit finished break and long-break intervals for recording.
    pub fn with_record_breaks(mut self, record_breaks: bool) -> Self {
        self.record_breaks = record_breaks;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_work_count(&self) -> u32 {
        self.completed_work_count
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn interval(&self) -> Option<&IntervalCapture> {
        self.interval.as_ref()
    }

    pub fn total_secs(&self) -> u32 {
        self.interval
            .as_ref()
            .map(|i| i.planned_minutes.saturating_mul(60))
            .unwrap_or_else(|| self.phase.seconds(&self.settings))
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs(),
            running: self.running,
            completed_work_count: self.completed_work_count,
            interval: self.interval.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Flip between running and paused. Phase and remaining time are untouched.
    pub fn toggle(&mut self, now: DateTime<Utc>) -> Event {
        if self.running {
            self.running = false;
            Event::TimerPaused {
                phase: self.phase,
                remaining_secs: self.remaining_secs,
                at: now,
            }
        } else {
            if self.interval.is_none() {
                self.interval = Some(IntervalCapture {
                    phase: self.phase,
                    planned_minutes: self.phase.minutes(&self.settings),
                    started_at: now,
                });
            }
            self.running = true;
            Event::TimerStarted {
                phase: self.phase,
                remaining_secs: self.remaining_secs,
                at: now,
            }
        }
    }

    /// Start a fresh interval of the current phase at its full length.
    ///
    /// Pending settings are adopted, since nothing is left running.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Event {
        if let Some(next) = self.next_settings.take() {
            self.settings = next;
        }
        self.running = false;
        self.interval = None;
        self.remaining_secs = self.phase.seconds(&self.settings);
        Event::TimerReset {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: now,
        }
    }

    /// One-second step. Returns the transition when the interval hits zero.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            return Some(self.finish(SessionStatus::Completed, None, now));
        }
        None
    }

    /// Cut the in-progress interval short.
    ///
    /// With a reason the interval ends `interrupted`, without one `aborted`.
    /// The machine then advances exactly as on natural completion.
    ///
    /// # Errors
    /// [`ValidationError::NothingInProgress`] if the interval was never started.
    pub fn interrupt(
        &mut self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Transition, ValidationError> {
        if self.interval.is_none() {
            return Err(ValidationError::NothingInProgress);
        }
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let status = if reason.is_some() {
            SessionStatus::Interrupted
        } else {
            SessionStatus::Aborted
        };
        Ok(self.finish(status, reason, now))
    }

    /// Take new settings into account.
    ///
    /// An interval that has not started yet is resized immediately; a
    /// started one keeps its length and the settings wait for the next
    /// transition.
    pub fn apply_settings(&mut self, settings: Settings) {
        if self.interval.is_none() && !self.running {
            self.settings = settings;
            self.next_settings = None;
            self.remaining_secs = self.phase.seconds(&self.settings);
        } else {
            self.next_settings = Some(settings);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish(
        &mut self,
        status: SessionStatus,
        interruption_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Transition {
        let finished_phase = self.phase;
        let capture = self.interval.take().unwrap_or_else(|| IntervalCapture {
            phase: finished_phase,
            planned_minutes: finished_phase.minutes(&self.settings),
            started_at: now,
        });

        if let Some(next) = self.next_settings.take() {
            self.settings = next;
        }

        let next_phase = if finished_phase.is_work() {
            self.completed_work_count = self.completed_work_count.saturating_add(1);
            break_after(
                self.completed_work_count,
                self.settings.cycles_until_long_break,
            )
        } else {
            Phase::Work
        };

        self.phase = next_phase;
        self.remaining_secs = next_phase.seconds(&self.settings);
        self.running = false;

        let finished = (finished_phase.is_work() || self.record_breaks).then(|| FinishedInterval {
            phase: finished_phase,
            planned_minutes: capture.planned_minutes,
            started_at: capture.started_at,
            status,
            interruption_reason,
        });

        let event = if status == SessionStatus::Completed {
            Event::PhaseCompleted {
                phase: finished_phase,
                next_phase,
                completed_work_count: self.completed_work_count,
                at: now,
            }
        } else {
            Event::IntervalInterrupted {
                phase: finished_phase,
                status,
                next_phase,
                completed_work_count: self.completed_work_count,
                at: now,
            }
        };

        Transition { event, finished }
    }
}
