//! Timer engine implementation.
//!
//! The engine owns the single active countdown. Counting happens in a spawned
//! Tokio task that sleeps for one [`TICK`] and then commits a one-second
//! decrement under the engine lock. Every running stretch gets its own
//! [`CancellationToken`]; `pause`, `stop` and a restarting `start` cancel it,
//! so a tick that is already sleeping never lands. The tick also re-checks the
//! token, the session generation and the phase after taking the lock, which
//! covers a tick that woke up just before the cancelling call acquired it.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused <-> Running) -> Idle   (completion)
//! Running | Paused -> Idle                            (stop)
//! ```
//!
//! Completion and stop are transient: both leave the engine in `Idle`.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = TimerEngine::new();
//! let completion = engine.start(Some(task.id), task.estimated_minutes)?;
//! if let Some(done) = completion.recv().await {
//!     // fired exactly once; never after stop()
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::task::TaskId;

/// Countdown granularity.
pub const TICK: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Paused,
}

/// Point-in-time view of the engine, published on every transition and tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub task_id: Option<TaskId>,
    pub remaining_secs: u64,
    pub total_secs: u64,
}

impl TimerSnapshot {
    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == TimerPhase::Paused
    }

    /// 0.0 .. 1.0 progress through the session.
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / self.total_secs as f64)
    }
}

/// Message delivered once when a session counts down to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerCompletion {
    pub task_id: Option<TaskId>,
    pub total_secs: u64,
    pub completed_at: DateTime<Utc>,
}

/// Receiving half of a session's one-shot completion.
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: oneshot::Receiver<TimerCompletion>,
}

impl CompletionReceiver {
    /// Wait for the session to finish.
    ///
    /// Returns `None` when the session was stopped or replaced by a newer
    /// `start`.
    pub async fn recv(self) -> Option<TimerCompletion> {
        self.rx.await.ok()
    }

    /// Non-blocking check. `Ok(None)` means the session is still going.
    pub fn try_recv(&mut self) -> std::result::Result<Option<TimerCompletion>, Cancelled> {
        match self.rx.try_recv() {
            Ok(done) => Ok(Some(done)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(Cancelled),
        }
    }
}

/// The session ended without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[derive(Debug, Default)]
struct Session {
    /// Bumped on every start, stop and completion; stale ticks compare it.
    generation: u64,
    phase: TimerPhase,
    task_id: Option<TaskId>,
    remaining_secs: u64,
    total_secs: u64,
    tick: Option<CancellationToken>,
    completion: Option<oneshot::Sender<TimerCompletion>>,
    runtime: Option<Handle>,
}

impl Session {
    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase,
            task_id: self.task_id,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
        }
    }

    fn cancel_tick(&mut self) {
        if let Some(token) = self.tick.take() {
            token.cancel();
        }
    }

    fn reset(&mut self) {
        self.cancel_tick();
        self.generation += 1;
        self.phase = TimerPhase::Idle;
        self.task_id = None;
        self.remaining_secs = 0;
        self.total_secs = 0;
        self.runtime = None;
    }
}

#[derive(Debug)]
struct Shared {
    session: Mutex<Session>,
    state_tx: watch::Sender<TimerSnapshot>,
    events: broadcast::Sender<Event>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &Session) {
        self.state_tx.send_replace(session.snapshot());
    }

    fn emit(&self, event: Event) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

/// Single-countdown timer engine.
///
/// Cloning yields another handle to the same countdown. A host creates one
/// engine per process and hands it to whoever needs it.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    shared: Arc<Shared>,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEngine {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(TimerSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session::default()),
                state_tx,
                events,
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> TimerSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn phase(&self) -> TimerPhase {
        self.shared.lock().phase
    }

    /// Task bound to the current session, if any.
    pub fn active_task(&self) -> Option<TaskId> {
        self.shared.lock().task_id
    }

    /// Subscribe to snapshots. The receiver holds the current value
    /// immediately; intermediate values may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.shared.state_tx.subscribe()
    }

    /// Subscribe to the event bus.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.events.subscribe()
    }

    /// Publish an event on the engine's bus (used by the session coordinator).
    pub(crate) fn emit(&self, event: Event) {
        self.shared.emit(event);
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a new session of `duration_minutes`.
    ///
    /// Any previous session is discarded: its tick is cancelled and its
    /// completion receiver resolves to `None`. Must be called from within a
    /// Tokio runtime.
    ///
    /// # Errors
    /// Returns a validation error for a zero duration and
    /// [`CoreError::Runtime`] outside a Tokio runtime.
    pub fn start(
        &self,
        task_id: Option<TaskId>,
        duration_minutes: u32,
    ) -> Result<CompletionReceiver> {
        if duration_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration {
                field: "duration_minutes",
                value: 0,
            }
            .into());
        }
        let runtime = Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?;
        let total_secs = u64::from(duration_minutes) * 60;
        let (tx, rx) = oneshot::channel();

        let mut session = self.shared.lock();
        let replaced = session.completion.take();
        session.reset();
        session.phase = TimerPhase::Running;
        session.task_id = task_id;
        session.remaining_secs = total_secs;
        session.total_secs = total_secs;
        session.completion = Some(tx);
        session.runtime = Some(runtime.clone());
        let token = CancellationToken::new();
        session.tick = Some(token.clone());
        let generation = session.generation;
        self.shared.publish(&session);
        drop(session);

        if replaced.is_some() {
            debug!("previous session discarded by start");
        }
        drop(replaced);

        runtime.spawn(countdown(Arc::clone(&self.shared), token, generation));
        info!(?task_id, total_secs, "timer started");
        self.shared.emit(Event::TimerStarted {
            task_id,
            duration_secs: total_secs,
            at: Utc::now(),
        });
        Ok(CompletionReceiver { rx })
    }

    /// Freeze the countdown. Returns `None` unless the engine was running.
    pub fn pause(&self) -> Option<Event> {
        let mut session = self.shared.lock();
        if session.phase != TimerPhase::Running {
            return None;
        }
        session.cancel_tick();
        session.phase = TimerPhase::Paused;
        self.shared.publish(&session);
        let event = Event::TimerPaused {
            remaining_secs: session.remaining_secs,
            at: Utc::now(),
        };
        drop(session);

        debug!("timer paused");
        self.shared.emit(event.clone());
        Some(event)
    }

    /// Continue from the frozen value. Returns `None` unless the engine was
    /// paused.
    pub fn resume(&self) -> Option<Event> {
        let mut session = self.shared.lock();
        if session.phase != TimerPhase::Paused {
            return None;
        }
        let runtime = session.runtime.clone()?;
        session.phase = TimerPhase::Running;
        let token = CancellationToken::new();
        session.tick = Some(token.clone());
        let generation = session.generation;
        self.shared.publish(&session);
        let event = Event::TimerResumed {
            remaining_secs: session.remaining_secs,
            at: Utc::now(),
        };
        drop(session);

        runtime.spawn(countdown(Arc::clone(&self.shared), token, generation));
        debug!("timer resumed");
        self.shared.emit(event.clone());
        Some(event)
    }

    /// Cancel the session without delivering its completion.
    ///
    /// Valid from any phase; from `Idle` it resets nothing new and returns
    /// `None`.
    pub fn stop(&self) -> Option<Event> {
        let mut session = self.shared.lock();
        let was_active = session.phase != TimerPhase::Idle;
        let task_id = session.task_id;
        let remaining_secs = session.remaining_secs;
        let discarded = session.completion.take();
        session.reset();
        self.shared.publish(&session);
        drop(session);
        drop(discarded);

        if !was_active {
            return None;
        }
        info!(?task_id, remaining_secs, "timer stopped");
        let event = Event::TimerStopped {
            task_id,
            remaining_secs,
            at: Utc::now(),
        };
        self.shared.emit(event.clone());
        Some(event)
    }
}

/// One running stretch of a session. Ends on cancellation, staleness or
/// completion.
async fn countdown(shared: Arc<Shared>, token: CancellationToken, generation: u64) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(TICK) => {}
        }

        let mut session = shared.lock();
        if token.is_cancelled()
            || session.generation != generation
            || session.phase != TimerPhase::Running
        {
            debug!(generation, "dropping stale tick");
            return;
        }

        session.remaining_secs = session.remaining_secs.saturating_sub(1);
        if session.remaining_secs > 0 {
            shared.publish(&session);
            let event = Event::TimerTick {
                remaining_secs: session.remaining_secs,
                total_secs: session.total_secs,
            };
            drop(session);
            shared.emit(event);
            continue;
        }

        let completion = session.completion.take();
        let task_id = session.task_id;
        let total_secs = session.total_secs;
        session.reset();
        shared.publish(&session);
        drop(session);

        let done = TimerCompletion {
            task_id,
            total_secs,
            completed_at: Utc::now(),
        };
        info!(?task_id, total_secs, "timer completed");
        if let Some(tx) = completion {
            // The receiver may already be gone; the completion is still spent.
            let _ = tx.send(done.clone());
        }
        shared.emit(Event::TimerCompleted {
            task_id,
            total_secs,
            at: done.completed_at,
        });
        return;
    }
}
