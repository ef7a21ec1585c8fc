//! Shared, observable store backed by [`Database`].
//!
//! Writes go through a mutex-guarded connection. After each committed write
//! the affected lists are re-read and pushed to watch subscribers before the
//! guard is released, so a subscriber only ever sees committed states and
//! the last published value matches the database.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use super::database::Database;
use super::traits::{TaskStore, TemplateStore};
use crate::error::Result;
use crate::task::templates::default_templates;
use crate::task::{
    NewTask, NewTemplate, NewTemplateTask, Task, TaskId, TemplateId, TemplateWithTasks,
};

/// SQLite implementation of [`TaskStore`] and [`TemplateStore`].
pub struct SqliteStore {
    db: Mutex<Database>,
    active: watch::Sender<Vec<Task>>,
    completed: watch::Sender<Vec<Task>>,
    templates: watch::Sender<Vec<TemplateWithTasks>>,
}

impl SqliteStore {
    /// Wrap an open database and load the initial lists.
    pub fn new(db: Database) -> Result<Self> {
        let active = db.active_tasks()?;
        let completed = db.completed_tasks()?;
        let templates = db.templates_with_tasks()?;
        Ok(Self {
            db: Mutex::new(db),
            active: watch::Sender::new(active),
            completed: watch::Sender::new(completed),
            templates: watch::Sender::new(templates),
        })
    }

    /// Open the store in the default data directory.
    pub fn open() -> Result<Self> {
        Self::new(Database::open()?)
    }

    pub fn open_path(path: &Path) -> Result<Self> {
        Self::new(Database::open_path(path)?)
    }

    pub fn open_memory() -> Result<Self> {
        Self::new(Database::open_memory()?)
    }

    /// Insert the built-in templates if there are none yet.
    ///
    /// Returns the number of templates created.
    pub fn seed_default_templates(&self) -> Result<usize> {
        let db = self.db();
        if db.template_count()? > 0 {
            return Ok(0);
        }
        let defaults = default_templates();
        for (header, children) in &defaults {
            db.create_template(header, children)?;
        }
        info!(count = defaults.len(), "Seeded default templates");
        self.publish_templates(&db)?;
        Ok(defaults.len())
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-read both task lists and publish them.
    ///
    /// Callers hold the database guard across their write and this call, so
    /// publications happen in commit order.
    fn publish_tasks(&self, db: &Database) -> Result<()> {
        let active = db.active_tasks()?;
        let completed = db.completed_tasks()?;
        debug!(
            active = active.len(),
            completed = completed.len(),
            "Task lists refreshed"
        );
        self.active.send_replace(active);
        self.completed.send_replace(completed);
        Ok(())
    }

    fn publish_templates(&self, db: &Database) -> Result<()> {
        self.templates.send_replace(db.templates_with_tasks()?);
        Ok(())
    }
}

impl TaskStore for SqliteStore {
    fn active_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.active.subscribe()
    }

    fn completed_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.completed.subscribe()
    }

    fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        self.db().get_task(id)
    }

    fn insert_task(&self, task: NewTask) -> Result<Task> {
        let db = self.db();
        let task = db.insert_task(&task)?;
        self.publish_tasks(&db)?;
        Ok(task)
    }

    fn insert_tasks(&self, tasks: Vec<NewTask>) -> Result<Vec<Task>> {
        let db = self.db();
        let tasks = db.insert_tasks(&tasks)?;
        self.publish_tasks(&db)?;
        Ok(tasks)
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        let db = self.db();
        db.update_task(task)?;
        self.publish_tasks(&db)
    }

    fn complete_task(&self, id: TaskId, at: DateTime<Utc>) -> Result<Task> {
        let db = self.db();
        let task = db.complete_task(id, at)?;
        self.publish_tasks(&db)?;
        Ok(task)
    }

    fn delete_task(&self, id: TaskId) -> Result<bool> {
        let db = self.db();
        let removed = db.delete_task(id)?;
        if removed {
            self.publish_tasks(&db)?;
        }
        Ok(removed)
    }

    fn delete_all_completed(&self) -> Result<usize> {
        let db = self.db();
        let removed = db.delete_all_completed()?;
        if removed > 0 {
            self.publish_tasks(&db)?;
        }
        Ok(removed)
    }
}

impl TemplateStore for SqliteStore {
    fn templates_with_tasks(&self) -> watch::Receiver<Vec<TemplateWithTasks>> {
        self.templates.subscribe()
    }

    fn get_template(&self, id: TemplateId) -> Result<Option<TemplateWithTasks>> {
        self.db().get_template(id)
    }

    fn create_template(
        &self,
        template: NewTemplate,
        children: Vec<NewTemplateTask>,
    ) -> Result<TemplateWithTasks> {
        let db = self.db();
        let created = db.create_template(&template, &children)?;
        self.publish_templates(&db)?;
        Ok(created)
    }

    fn update_template(
        &self,
        id: TemplateId,
        template: NewTemplate,
        children: Vec<NewTemplateTask>,
    ) -> Result<TemplateWithTasks> {
        let db = self.db();
        let updated = db.update_template(id, &template, &children)?;
        self.publish_templates(&db)?;
        Ok(updated)
    }

    fn replace_template_children(
        &self,
        id: TemplateId,
        children: Vec<NewTemplateTask>,
    ) -> Result<()> {
        let db = self.db();
        db.replace_template_children(id, &children)?;
        self.publish_templates(&db)
    }

    fn delete_template(&self, id: TemplateId) -> Result<bool> {
        let db = self.db();
        let removed = db.delete_template(id)?;
        if removed {
            self.publish_templates(&db)?;
        }
        Ok(removed)
    }
}
