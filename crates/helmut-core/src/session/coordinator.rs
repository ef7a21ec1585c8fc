//! Binds the timer engine to the task list and alert preferences.
//!
//! Notification preferences are read once, when a session starts. Changing
//! them mid-session affects the next session only.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::notify::{CompletionAlert, NotificationDispatcher};
use crate::storage::{NotificationSettings, SettingsStore, TaskStore};
use crate::task::templates::materialize_for_today;
use crate::task::{append_order, NewTask, Task, TaskId, TemplateWithTasks};
use crate::timer::{CompletionReceiver, TimerEngine, TimerSnapshot};

/// Session orchestration over an injected engine, store, settings and
/// dispatcher.
pub struct SessionCoordinator {
    engine: TimerEngine,
    tasks: Arc<dyn TaskStore>,
    settings: Arc<dyn SettingsStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    selected: Mutex<Option<TaskId>>,
    alert_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionCoordinator {
    pub fn new(
        engine: TimerEngine,
        tasks: Arc<dyn TaskStore>,
        settings: Arc<dyn SettingsStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            engine,
            tasks,
            settings,
            dispatcher,
            selected: Mutex::new(None),
            alert_task: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn timer(&self) -> TimerSnapshot {
        self.engine.snapshot()
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.engine.events()
    }

    pub fn active_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.active_tasks()
    }

    pub fn completed_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.completed_tasks()
    }

    fn selected(&self) -> MutexGuard<'_, Option<TaskId>> {
        self.selected.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Current task ─────────────────────────────────────────────────

    /// The task in focus.
    ///
    /// The explicit selection wins while it is still active; otherwise the
    /// first active task is current.
    pub fn current_task(&self) -> Option<Task> {
        let active = self.tasks.active_tasks_snapshot();
        let selected = *self.selected();
        resolve_current(&active, selected).map(|i| active[i].clone())
    }

    /// Make `id` the current task without starting it.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if `id` is not an active task.
    pub fn select_task(&self, id: TaskId) -> Result<Task> {
        let task = self
            .tasks
            .active_tasks_snapshot()
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(CoreError::NotFound { entity: "task", id })?;
        *self.selected() = Some(id);
        Ok(task)
    }

    // ── Timer control ────────────────────────────────────────────────

    /// Make `task` current and run the timer for its estimate.
    ///
    /// Any running session is replaced and its completion discarded.
    ///
    /// # Errors
    /// Rejects a zero estimate before the engine is touched; fails with
    /// [`CoreError::Runtime`] outside a Tokio runtime.
    pub fn start_task(&self, task: &Task) -> Result<()> {
        if task.estimated_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration {
                field: "estimated_minutes",
                value: 0,
            }
            .into());
        }

        let prefs = self.settings.notification_settings();
        let completion = self.engine.start(Some(task.id), task.estimated_minutes)?;
        *self.selected() = Some(task.id);

        info!(task_id = task.id, title = %task.title, "session started");
        let handle = tokio::spawn(deliver_alert(
            completion,
            task.title.clone(),
            prefs,
            Arc::clone(&self.dispatcher),
        ));
        *self.alert_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    /// Wait until the latest session's alert has been delivered or dropped.
    ///
    /// Returns at once if no session was started. While a session is still
    /// counting down this waits for it to end.
    pub async fn alerts_settled(&self) {
        let handle = self
            .alert_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "alert task failed");
            }
        }
    }

    /// Start whatever [`current_task`](Self::current_task) resolves to.
    ///
    /// Returns `Ok(None)` when the active list is empty.
    pub fn start_current(&self) -> Result<Option<Task>> {
        let Some(task) = self.current_task() else {
            return Ok(None);
        };
        self.start_task(&task)?;
        Ok(Some(task))
    }

    pub fn pause_timer(&self) -> Option<Event> {
        self.engine.pause()
    }

    pub fn resume_timer(&self) -> Option<Event> {
        self.engine.resume()
    }

    pub fn stop_timer(&self) -> Option<Event> {
        self.engine.stop()
    }

    // ── Task operations ──────────────────────────────────────────────

    /// Mark `id` completed and stop the timer.
    ///
    /// The timer is stopped whether or not it was bound to this task, and
    /// even if the store write then fails.
    pub fn complete_task(&self, id: TaskId) -> Result<Task> {
        self.engine.stop();
        let at = Utc::now();
        let task = self.tasks.complete_task(id, at)?;
        info!(task_id = id, "task completed");
        self.engine.emit(Event::TaskCompleted { task_id: id, at });
        Ok(task)
    }

    /// Stop the timer and move to the next active task.
    ///
    /// At the end of the list the current task stays where it is. Returns the
    /// task that is current afterwards.
    pub fn skip_task(&self) -> Option<Task> {
        self.engine.stop();

        let active = self.tasks.active_tasks_snapshot();
        let mut selected = self.selected();
        let from = resolve_current(&active, *selected)?;
        let to = if from + 1 < active.len() { from + 1 } else { from };
        *selected = Some(active[to].id);
        drop(selected);

        debug!(from = active[from].id, to = active[to].id, "skipped task");
        self.engine.emit(Event::TaskSkipped {
            from: Some(active[from].id),
            to: Some(active[to].id),
            at: Utc::now(),
        });
        Some(active[to].clone())
    }

    /// Delete a task.
    ///
    /// A session bound to the deleted task is stopped and its completion
    /// discarded. Returns whether the task existed.
    pub fn delete_task(&self, id: TaskId) -> Result<bool> {
        let removed = self.tasks.delete_task(id)?;
        if self.engine.active_task() == Some(id) {
            info!(task_id = id, "stopping timer for deleted task");
            self.engine.stop();
        }
        {
            let mut selected = self.selected();
            if *selected == Some(id) {
                *selected = None;
            }
        }
        if removed {
            self.engine.emit(Event::TaskDeleted {
                task_id: id,
                at: Utc::now(),
            });
        }
        Ok(removed)
    }

    /// Append a task to the end of the active list.
    pub fn add_task(&self, title: &str, estimated_minutes: u32) -> Result<Task> {
        let order = append_order(&self.tasks.active_tasks_snapshot());
        let task = self
            .tasks
            .insert_task(NewTask::new(title, estimated_minutes, order))?;
        self.engine.emit(Event::TaskAdded {
            task_id: task.id,
            at: task.created_at,
        });
        Ok(task)
    }

    /// Copy a template's children onto today's list as independent tasks.
    pub fn add_template_to_today(&self, template: &TemplateWithTasks) -> Result<Vec<Task>> {
        let active = self.tasks.active_tasks_snapshot();
        let new_tasks = materialize_for_today(template, &active, Utc::now());
        if new_tasks.is_empty() {
            return Ok(Vec::new());
        }
        let inserted = self.tasks.insert_tasks(new_tasks)?;
        info!(
            template = %template.template.name,
            count = inserted.len(),
            "template added to today"
        );
        for task in &inserted {
            self.engine.emit(Event::TaskAdded {
                task_id: task.id,
                at: task.created_at,
            });
        }
        Ok(inserted)
    }

    /// Remove every completed task. Returns the number removed.
    pub fn clear_completed(&self) -> Result<usize> {
        self.tasks.delete_all_completed()
    }
}

/// Index of the current task within `active`.
fn resolve_current(active: &[Task], selected: Option<TaskId>) -> Option<usize> {
    if active.is_empty() {
        return None;
    }
    let index = selected
        .and_then(|id| active.iter().position(|t| t.id == id))
        .unwrap_or(0);
    Some(index)
}

async fn deliver_alert(
    completion: CompletionReceiver,
    title: String,
    prefs: NotificationSettings,
    dispatcher: Arc<dyn NotificationDispatcher>,
) {
    let Some(done) = completion.recv().await else {
        debug!(title = %title, "session ended without completion");
        return;
    };
    if !prefs.enabled {
        debug!(task_id = ?done.task_id, "notifications disabled for this session");
        return;
    }
    let alert = CompletionAlert::new(title, prefs.sound, prefs.vibration);
    if let Err(e) = dispatcher.notify_timer_complete(&alert) {
        warn!(error = %e, "completion alert failed");
    }
}
