//! Storage contracts used by the session coordinator.
//!
//! The coordinator only talks to these traits, so hosts (and tests) can swap
//! the SQLite store for anything that honors the same ordering and
//! atomicity rules.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::error::Result;
use crate::task::{
    NewTask, NewTemplate, NewTemplateTask, Task, TaskId, TemplateId, TemplateWithTasks,
};

/// Persistent task storage.
///
/// Subscriptions deliver the full list on every committed change.
pub trait TaskStore: Send + Sync {
    /// Active tasks ordered by `order`, then `created_at`.
    fn active_tasks(&self) -> watch::Receiver<Vec<Task>>;

    /// Current active list without subscribing.
    fn active_tasks_snapshot(&self) -> Vec<Task> {
        self.active_tasks().borrow().clone()
    }

    /// Completed tasks, most recently completed first.
    fn completed_tasks(&self) -> watch::Receiver<Vec<Task>>;

    fn get_task(&self, id: TaskId) -> Result<Option<Task>>;

    /// Insert a task and return it with its assigned id.
    fn insert_task(&self, task: NewTask) -> Result<Task>;

    /// Insert several tasks atomically.
    fn insert_tasks(&self, tasks: Vec<NewTask>) -> Result<Vec<Task>>;

    fn update_task(&self, task: &Task) -> Result<()>;

    /// Mark a task completed. An already-completed task keeps its first
    /// `completed_at`.
    fn complete_task(&self, id: TaskId, at: DateTime<Utc>) -> Result<Task>;

    /// Returns whether a task was removed.
    fn delete_task(&self, id: TaskId) -> Result<bool>;

    /// Returns the number of completed tasks removed.
    fn delete_all_completed(&self) -> Result<usize>;
}

/// Persistent template storage.
pub trait TemplateStore: Send + Sync {
    /// Templates newest first, each with children in order.
    fn templates_with_tasks(&self) -> watch::Receiver<Vec<TemplateWithTasks>>;

    fn templates_snapshot(&self) -> Vec<TemplateWithTasks> {
        self.templates_with_tasks().borrow().clone()
    }

    fn get_template(&self, id: TemplateId) -> Result<Option<TemplateWithTasks>>;

    /// Create a template and its children in one transaction.
    fn create_template(
        &self,
        template: NewTemplate,
        children: Vec<NewTemplateTask>,
    ) -> Result<TemplateWithTasks>;

    /// Update the header and replace all children in one transaction.
    fn update_template(
        &self,
        id: TemplateId,
        template: NewTemplate,
        children: Vec<NewTemplateTask>,
    ) -> Result<TemplateWithTasks>;

    /// Replace all children in one transaction. Readers never observe the
    /// template with zero children mid-replace.
    fn replace_template_children(
        &self,
        id: TemplateId,
        children: Vec<NewTemplateTask>,
    ) -> Result<()>;

    /// Returns whether a template was removed. Children go with it.
    fn delete_template(&self, id: TemplateId) -> Result<bool>;
}
