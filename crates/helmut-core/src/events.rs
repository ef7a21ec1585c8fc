use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Every state change in the timer and session produces an Event.
/// Hosts subscribe through [`crate::TimerEngine::events`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        task_id: Option<TaskId>,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Session cancelled before completion; its completion is discarded.
    TimerStopped {
        task_id: Option<TaskId>,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// One second committed while running.
    TimerTick {
        remaining_secs: u64,
        total_secs: u64,
    },
    TimerCompleted {
        task_id: Option<TaskId>,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TaskAdded {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    TaskDeleted {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    /// Current task moved on a skip; `to` equals `from` at the end of the list.
    TaskSkipped {
        from: Option<TaskId>,
        to: Option<TaskId>,
        at: DateTime<Utc>,
    },
}
