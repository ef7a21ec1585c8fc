//! # Helmut Core Library
//!
//! Core logic for the Helmut task timer: a task list with time estimates, a
//! pausable countdown run against the current task, reusable templates and
//! completion history. Hosts (the `helmut` CLI, tests) own one
//! [`TimerEngine`] and one [`SessionCoordinator`] per process and inject the
//! stores they want.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a single countdown driven by a cancellable Tokio tick;
//!   completion is delivered once through a one-shot channel
//! - **Session Coordinator**: current-task selection, skip/complete/delete
//!   sequencing against the timer, and completion alerts
//! - **Storage**: SQLite task/template store with watch subscriptions and a
//!   TOML configuration
//! - **History**: per-day grouping, totals and the completion streak
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: countdown state machine
//! - [`SessionCoordinator`]: binds the engine to tasks and alerts
//! - [`SqliteStore`]: [`TaskStore`] and [`TemplateStore`] implementation
//! - [`ConfigSettings`]: [`SettingsStore`] over [`Config`]
//! - [`NotificationDispatcher`]: alert delivery boundary

pub mod error;
pub mod events;
pub mod history;
pub mod notify;
pub mod session;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, NotifyError, ValidationError};
pub use events::Event;
pub use history::{summarize, summarize_in, DayGroup, HistoryEntry, HistorySummary};
pub use notify::{CompletionAlert, LogDispatcher, NotificationDispatcher, NullDispatcher};
pub use session::SessionCoordinator;
pub use storage::{
    Config, ConfigSettings, Database, NotificationSettings, SettingsStore, SoundChoice,
    SqliteStore, TaskStore, TemplateStore,
};
pub use task::{
    NewTask, NewTemplate, NewTemplateTask, Task, TaskId, Template, TemplateId, TemplateTask,
    TemplateWithTasks,
};
pub use timer::{
    format_time, CompletionReceiver, TimerCompletion, TimerEngine, TimerPhase, TimerSnapshot,
};
