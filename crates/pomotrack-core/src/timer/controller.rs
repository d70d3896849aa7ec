//! Async owner of one [`TimerMachine`].
//!
//! All commands and ticks go through a single mutex. The tick task carries
//! the generation it was spawned for and re-checks it, together with the
//! running flag, under that mutex before every decrement; any command that
//! stops the timer bumps the generation, so no tick lands after a pause.
//!
//! Finished intervals are handed to the recorder on a blocking worker.
//! The tick task never waits for persistence. Failed recordings stay in
//! the pending book until [`TimerController::retry_pending`] succeeds.

use std::collections::HashSet;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::machine::{TimerMachine, TimerSnapshot, Transition};
use crate::error::ValidationError;
use crate::events::Event;
use crate::session::{PendingRecord, SessionRecorder};
use crate::settings::Settings;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Wall time per one-second decrement.
    pub tick_interval: Duration,
    /// Record finished breaks as sessions.
    pub record_breaks: bool,
    /// Start the next phase right after a natural completion.
    pub auto_start: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            record_breaks: false,
            auto_start: false,
        }
    }
}

struct Cell {
    machine: TimerMachine,
    generation: u64,
}

#[derive(Default)]
struct PendingBook {
    records: Vec<PendingRecord>,
    in_flight: HashSet<Uuid>,
}

struct Shared {
    user: String,
    cell: Mutex<Cell>,
    recorder: SessionRecorder,
    pending: std::sync::Mutex<PendingBook>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    events: broadcast::Sender<Event>,
    tick_interval: Duration,
    auto_start: bool,
}

fn guard<T>(mutex: &std::sync::Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn emit(&self, event: Event) {
        debug!(?event, "timer event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Publish a transition and queue its interval for recording.
    ///
    /// Synchronous on purpose: it runs while the cell lock is held and must
    /// not be cancellable half-way.
    fn handle_transition(self: &Arc<Self>, transition: Transition) {
        self.emit(transition.event);
        if let Some(finished) = transition.finished {
            let pending = PendingRecord::new(self.user.clone(), finished);
            let id = pending.id;
            guard(&self.pending).records.push(pending);
            self.persist(id);
        }
    }

    fn persist(self: &Arc<Self>, id: Uuid) {
        let claimed = {
            let mut book = guard(&self.pending);
            if book.in_flight.contains(&id) {
                None
            } else {
                let found = book.records.iter().find(|p| p.id == id).cloned();
                if found.is_some() {
                    book.in_flight.insert(id);
                }
                found
            }
        };
        let Some(mut pending) = claimed else {
            return;
        };

        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let recorder = shared.recorder.clone();
            let joined = tokio::task::spawn_blocking(move || {
                let result = recorder.record(&mut pending);
                (pending, result)
            })
            .await;

            let mut book = guard(&shared.pending);
            book.in_flight.remove(&id);
            match joined {
                Ok((pending, Ok(saved))) => {
                    book.records.retain(|p| p.id != id);
                    drop(book);
                    info!(
                        session_id = saved.id,
                        user = %saved.user,
                        attempts = pending.attempts,
                        "interval recorded"
                    );
                    shared.emit(Event::SessionRecorded {
                        session_id: saved.id,
                        phase: saved.session_type,
                        status: pending.interval.status,
                        at: Utc::now(),
                    });
                }
                Ok((pending, Err(err))) => {
                    if let Some(slot) = book.records.iter_mut().find(|p| p.id == id) {
                        *slot = pending;
                    }
                    drop(book);
                    warn!(pending_id = %id, error = %err, "failed to record interval; kept for retry");
                    shared.emit(Event::RecordFailed {
                        pending_id: id,
                        message: err.to_string(),
                        at: Utc::now(),
                    });
                }
                Err(join_err) => {
                    drop(book);
                    warn!(pending_id = %id, error = %join_err, "recording worker died; kept for retry");
                    shared.emit(Event::RecordFailed {
                        pending_id: id,
                        message: join_err.to_string(),
                        at: Utc::now(),
                    });
                }
            }
        });

        let mut workers = guard(&self.workers);
        workers.retain(|h| !h.is_finished());
        workers.push(handle);
    }
}

/// Drives one timer for one user.
#[derive(Clone)]
pub struct TimerController {
    shared: Arc<Shared>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TimerController {
    pub fn new(
        user: impl Into<String>,
        settings: Settings,
        recorder: SessionRecorder,
        options: ControllerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let machine = TimerMachine::new(settings).with_record_breaks(options.record_breaks);
        Self {
            shared: Arc::new(Shared {
                user: user.into(),
                cell: Mutex::new(Cell {
                    machine,
                    generation: 0,
                }),
                recorder,
                pending: std::sync::Mutex::new(PendingBook::default()),
                workers: std::sync::Mutex::new(Vec::new()),
                events,
                tick_interval: options.tick_interval,
                auto_start: options.auto_start,
            }),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn user(&self) -> &str {
        &self.shared.user
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.events.subscribe()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        self.shared.cell.lock().await.machine.snapshot()
    }

    /// Start when paused, pause when running.
    pub async fn toggle(&self) -> Event {
        let mut cell = self.shared.cell.lock().await;
        self.toggle_locked(&mut cell).await
    }

    /// Start if paused. `None` when already running.
    pub async fn start(&self) -> Option<Event> {
        let mut cell = self.shared.cell.lock().await;
        if cell.machine.is_running() {
            return None;
        }
        Some(self.toggle_locked(&mut cell).await)
    }

    /// Pause if running. `None` when already paused.
    pub async fn pause(&self) -> Option<Event> {
        let mut cell = self.shared.cell.lock().await;
        if !cell.machine.is_running() {
            return None;
        }
        Some(self.toggle_locked(&mut cell).await)
    }

    /// Flip under the caller's lock; the ticker is swapped before it is released.
    async fn toggle_locked(&self, cell: &mut Cell) -> Event {
        let event = cell.machine.toggle(Utc::now());
        cell.generation += 1;
        let running = cell.machine.is_running();
        self.replace_ticker(running.then_some(cell.generation)).await;
        self.shared.emit(event.clone());
        event
    }

    /// Restore the current phase to its full length, paused.
    pub async fn reset(&self) -> Event {
        let event = {
            let mut cell = self.shared.cell.lock().await;
            cell.generation += 1;
            cell.machine.reset(Utc::now())
        };
        self.replace_ticker(None).await;
        self.shared.emit(event.clone());
        event
    }

    /// End the current interval early and advance.
    ///
    /// # Errors
    /// [`ValidationError::NothingInProgress`] when the interval never started.
    pub async fn interrupt(&self, reason: Option<String>) -> Result<Event, ValidationError> {
        let event = {
            let mut cell = self.shared.cell.lock().await;
            let transition = cell.machine.interrupt(reason, Utc::now())?;
            cell.generation += 1;
            let event = transition.event.clone();
            self.shared.handle_transition(transition);
            event
        };
        self.replace_ticker(None).await;
        Ok(event)
    }

    /// Hand newer settings to the machine; a running interval keeps its length.
    pub async fn apply_settings(&self, settings: Settings) {
        self.shared.cell.lock().await.machine.apply_settings(settings);
    }

    /// Recordings that have not been persisted yet.
    pub fn pending(&self) -> Vec<PendingRecord> {
        guard(&self.shared.pending).records.clone()
    }

    /// Resubmit every pending recording. Returns how many were resubmitted.
    pub fn retry_pending(&self) -> usize {
        let ids: Vec<Uuid> = {
            let book = guard(&self.shared.pending);
            book.records
                .iter()
                .map(|p| p.id)
                .filter(|id| !book.in_flight.contains(id))
                .collect()
        };
        for id in &ids {
            self.shared.persist(*id);
        }
        ids.len()
    }

    /// Wait for every recording attempt started so far.
    pub async fn flush(&self) {
        loop {
            let handles = std::mem::take(&mut *guard(&self.shared.workers));
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "recording task failed");
                }
            }
        }
    }

    /// Stop ticking and wait for outstanding recordings.
    pub async fn shutdown(&self) {
        {
            let mut cell = self.shared.cell.lock().await;
            cell.generation += 1;
            if cell.machine.is_running() {
                let event = cell.machine.toggle(Utc::now());
                self.shared.emit(event);
            }
        }
        self.replace_ticker(None).await;
        self.flush().await;
    }

    async fn replace_ticker(&self, generation: Option<u64>) {
        let mut slot = self.ticker.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        if let Some(generation) = generation {
            *slot = Some(spawn_ticker(Arc::clone(&self.shared), generation));
        }
    }
}

fn spawn_ticker(shared: Arc<Shared>, generation: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = shared.tick_interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let mut cell = shared.cell.lock().await;
            if cell.generation != generation || !cell.machine.is_running() {
                break;
            }
            let now = Utc::now();
            let Some(transition) = cell.machine.tick(now) else {
                continue;
            };
            shared.handle_transition(transition);

            if !shared.auto_start {
                break;
            }
            let started = cell.machine.toggle(now);
            shared.emit(started);
        }
    })
}
