//! SQLite-based task and template storage.
//!
//! Provides persistent storage for:
//! - Tasks (active and completed)
//! - Templates and their child tasks
//!
//! Timestamps are stored as RFC 3339 UTC text.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::data_dir;
use super::migrations;
use crate::error::{CoreError, DatabaseError, Result};
use crate::task::{
    NewTask, NewTemplate, NewTemplateTask, Task, TaskId, Template, TemplateId, TemplateTask,
    TemplateWithTasks,
};

const TASK_COLUMNS: &str =
    "id, title, estimated_minutes, is_completed, created_at, completed_at, sort_order";

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let created_at: String = row.get(4)?;
    let completed_at: Option<String> = row.get(5)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        estimated_minutes: row.get(2)?,
        is_completed: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
        completed_at: completed_at
            .as_deref()
            .map(|s| parse_timestamp(5, s))
            .transpose()?,
        order: row.get(6)?,
    })
}

fn row_to_template(row: &Row) -> rusqlite::Result<Template> {
    let created_at: String = row.get(4)?;
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

fn row_to_template_task(row: &Row) -> rusqlite::Result<TemplateTask> {
    Ok(TemplateTask {
        id: row.get(0)?,
        template_id: row.get(1)?,
        title: row.get(2)?,
        estimated_minutes: row.get(3)?,
        order: row.get(4)?,
    })
}

/// SQLite database for task storage.
///
/// A thin synchronous layer over one connection. Multi-statement writes
/// (template creation, child replacement) run in a single transaction.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/helmut.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("helmut.db");
        Self::open_path(&path)
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and ephemeral hosts).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // === Task CRUD ===

    /// Insert a task and return it with its store-assigned id.
    ///
    /// # Errors
    /// Returns a validation error for an empty title or zero estimate.
    pub fn insert_task(&self, task: &NewTask) -> Result<Task> {
        task.validate()?;
        self.conn.execute(
            "INSERT INTO tasks (title, estimated_minutes, is_completed, created_at, completed_at, sort_order)
             VALUES (?1, ?2, 0, ?3, NULL, ?4)",
            params![
                task.title,
                task.estimated_minutes,
                task.created_at.to_rfc3339(),
                task.order,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.require_task(id)
    }

    /// Insert several tasks in one transaction.
    pub fn insert_tasks(&self, tasks: &[NewTask]) -> Result<Vec<Task>> {
        for task in tasks {
            task.validate()?;
        }
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            tx.execute(
                "INSERT INTO tasks (title, estimated_minutes, is_completed, created_at, completed_at, sort_order)
                 VALUES (?1, ?2, 0, ?3, NULL, ?4)",
                params![
                    task.title,
                    task.estimated_minutes,
                    task.created_at.to_rfc3339(),
                    task.order,
                ],
            )?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit()?;
        ids.into_iter().map(|id| self.require_task(id)).collect()
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    fn require_task(&self, id: TaskId) -> Result<Task> {
        self.get_task(id)?
            .ok_or(CoreError::NotFound { entity: "task", id })
    }

    /// Active tasks ordered by `sort_order`, then `created_at`.
    pub fn active_tasks(&self) -> Result<Vec<Task>> {
        self.query_tasks(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE is_completed = 0
             ORDER BY sort_order ASC, created_at ASC, id ASC"
        ))
    }

    /// Completed tasks, most recently completed first.
    pub fn completed_tasks(&self) -> Result<Vec<Task>> {
        self.query_tasks(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE is_completed = 1
             ORDER BY completed_at DESC, id DESC"
        ))
    }

    fn query_tasks(&self, sql: &str) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Overwrite a task's fields.
    ///
    /// `completed_at` is forced to match `is_completed`: it is cleared for an
    /// active task and kept (or set to now) for a completed one.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if no task has this id.
    pub fn update_task(&self, task: &Task) -> Result<()> {
        crate::task::validate_title(&task.title)?;
        crate::task::validate_minutes("estimated_minutes", task.estimated_minutes)?;
        let completed_at = if task.is_completed {
            Some(task.completed_at.unwrap_or_else(Utc::now).to_rfc3339())
        } else {
            None
        };
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?2, estimated_minutes = ?3, is_completed = ?4,
                 completed_at = ?5, sort_order = ?6
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.estimated_minutes,
                task.is_completed,
                completed_at,
                task.order,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound {
                entity: "task",
                id: task.id,
            });
        }
        Ok(())
    }

    /// Mark a task completed at `at`.
    ///
    /// A task that is already completed keeps its original `completed_at`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if no task has this id.
    pub fn complete_task(&self, id: TaskId, at: DateTime<Utc>) -> Result<Task> {
        self.conn.execute(
            "UPDATE tasks SET is_completed = 1, completed_at = ?2
             WHERE id = ?1 AND is_completed = 0",
            params![id, at.to_rfc3339()],
        )?;
        self.require_task(id)
    }

    /// Delete a task. Returns whether a row was removed.
    pub fn delete_task(&self, id: TaskId) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Delete every completed task. Returns the number removed.
    pub fn delete_all_completed(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM tasks WHERE is_completed = 1", [])?;
        Ok(removed)
    }

    // === Template CRUD ===

    /// Create a template and its children in one transaction.
    pub fn create_template(
        &self,
        template: &NewTemplate,
        children: &[NewTemplateTask],
    ) -> Result<TemplateWithTasks> {
        template.validate()?;
        for child in children {
            child.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO templates (name, description, icon, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                template.name,
                template.description,
                template.icon,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        insert_children(&tx, id, children)?;
        tx.commit()?;

        self.get_template(id)?
            .ok_or(CoreError::NotFound { entity: "template", id })
    }

    /// Get one template with its children.
    pub fn get_template(&self, id: TemplateId) -> Result<Option<TemplateWithTasks>> {
        let template = self
            .conn
            .query_row(
                "SELECT id, name, description, icon, created_at FROM templates WHERE id = ?1",
                params![id],
                row_to_template,
            )
            .optional()?;
        match template {
            Some(template) => {
                let tasks = self.template_children(template.id)?;
                Ok(Some(TemplateWithTasks { template, tasks }))
            }
            None => Ok(None),
        }
    }

    /// All templates, newest first, each with its children in order.
    pub fn templates_with_tasks(&self) -> Result<Vec<TemplateWithTasks>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, icon, created_at FROM templates
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], row_to_template)?;
        let mut templates = Vec::new();
        for row in rows {
            let template = row?;
            let tasks = self.template_children(template.id)?;
            templates.push(TemplateWithTasks { template, tasks });
        }
        Ok(templates)
    }

    fn template_children(&self, template_id: TemplateId) -> Result<Vec<TemplateTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, template_id, title, estimated_minutes, sort_order
             FROM template_tasks WHERE template_id = ?1
             ORDER BY sort_order ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![template_id], row_to_template_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Number of templates.
    pub fn template_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM templates", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Replace a template's children atomically (delete + insert in one
    /// transaction).
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if the template does not exist.
    pub fn replace_template_children(
        &self,
        id: TemplateId,
        children: &[NewTemplateTask],
    ) -> Result<()> {
        for child in children {
            child.validate()?;
        }
        let tx = self.conn.unchecked_transaction()?;
        let exists: bool = tx
            .query_row("SELECT 1 FROM templates WHERE id = ?1", params![id], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(CoreError::NotFound { entity: "template", id });
        }
        tx.execute("DELETE FROM template_tasks WHERE template_id = ?1", params![id])?;
        insert_children(&tx, id, children)?;
        tx.commit()?;
        Ok(())
    }

    /// Update a template's header and replace its children in one transaction.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if the template does not exist.
    pub fn update_template(
        &self,
        id: TemplateId,
        template: &NewTemplate,
        children: &[NewTemplateTask],
    ) -> Result<TemplateWithTasks> {
        template.validate()?;
        for child in children {
            child.validate()?;
        }
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE templates SET name = ?2, description = ?3, icon = ?4 WHERE id = ?1",
            params![id, template.name, template.description, template.icon],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound { entity: "template", id });
        }
        tx.execute("DELETE FROM template_tasks WHERE template_id = ?1", params![id])?;
        insert_children(&tx, id, children)?;
        tx.commit()?;

        self.get_template(id)?
            .ok_or(CoreError::NotFound { entity: "template", id })
    }

    /// Delete a template; its children cascade.
    pub fn delete_template(&self, id: TemplateId) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

fn insert_children(
    conn: &Connection,
    template_id: TemplateId,
    children: &[NewTemplateTask],
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO template_tasks (template_id, title, estimated_minutes, sort_order)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for child in children {
        stmt.execute(params![
            template_id,
            child.title,
            child.estimated_minutes,
            child.order
        ])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_task(title: &str, minutes: u32, order: i64) -> NewTask {
        NewTask::new(title, minutes, order)
    }

    #[test]
    fn insert_and_get_task() {
        let db = Database::open_memory().unwrap();
        let task = db.insert_task(&new_task("Write report", 25, 0)).unwrap();
        assert!(task.id > 0);
        assert!(!task.is_completed);
        assert!(task.completed_at.is_none());

        let retrieved = db.get_task(task.id).unwrap().unwrap();
        assert_eq!(retrieved, task);
    }

    #[test]
    fn insert_rejects_invalid_tasks() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.insert_task(&new_task("", 25, 0)),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            db.insert_task(&new_task("Nap", 0, 0)),
            Err(CoreError::Validation(_))
        ));
        assert!(db.active_tasks().unwrap().is_empty());
    }

    #[test]
    fn active_tasks_ordered_by_order_then_created_at() {
        let db = Database::open_memory().unwrap();
        let base = Utc::now();
        let mut late = new_task("late", 5, 0);
        late.created_at = base + Duration::seconds(10);
        let mut early = new_task("early", 5, 0);
        early.created_at = base;
        let first = new_task("first", 5, -1);

        db.insert_task(&late).unwrap();
        db.insert_task(&early).unwrap();
        db.insert_task(&first).unwrap();

        let titles: Vec<_> = db
            .active_tasks()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["first", "early", "late"]);
    }

    #[test]
    fn complete_sets_completed_at_once() {
        let db = Database::open_memory().unwrap();
        let task = db.insert_task(&new_task("Run", 30, 0)).unwrap();
        let first_at = Utc::now() - Duration::hours(1);

        let done = db.complete_task(task.id, first_at).unwrap();
        assert!(done.is_completed);
        assert_eq!(
            done.completed_at.unwrap().timestamp(),
            first_at.timestamp()
        );

        let again = db.complete_task(task.id, Utc::now()).unwrap();
        assert_eq!(again.completed_at, done.completed_at);

        assert!(db.active_tasks().unwrap().is_empty());
        assert_eq!(db.completed_tasks().unwrap().len(), 1);
    }

    #[test]
    fn complete_missing_task_is_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.complete_task(42, Utc::now()),
            Err(CoreError::NotFound { entity: "task", id: 42 })
        ));
    }

    #[test]
    fn update_keeps_completion_invariant() {
        let db = Database::open_memory().unwrap();
        let mut task = db.insert_task(&new_task("Read", 20, 0)).unwrap();

        task.title = "Read chapter 3".to_string();
        task.is_completed = true;
        db.update_task(&task).unwrap();
        let stored = db.get_task(task.id).unwrap().unwrap();
        assert_eq!(stored.title, "Read chapter 3");
        assert!(stored.completed_at.is_some());

        let mut reopened = stored.clone();
        reopened.is_completed = false;
        db.update_task(&reopened).unwrap();
        let stored = db.get_task(task.id).unwrap().unwrap();
        assert!(!stored.is_completed);
        assert!(stored.completed_at.is_none());
    }

    #[test]
    fn completed_tasks_newest_first() {
        let db = Database::open_memory().unwrap();
        let a = db.insert_task(&new_task("a", 5, 0)).unwrap();
        let b = db.insert_task(&new_task("b", 5, 1)).unwrap();
        let now = Utc::now();
        db.complete_task(a.id, now).unwrap();
        db.complete_task(b.id, now - Duration::days(1)).unwrap();

        let titles: Vec<_> = db
            .completed_tasks()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn delete_task_and_clear_completed() {
        let db = Database::open_memory().unwrap();
        let a = db.insert_task(&new_task("a", 5, 0)).unwrap();
        let b = db.insert_task(&new_task("b", 5, 1)).unwrap();
        let c = db.insert_task(&new_task("c", 5, 2)).unwrap();

        assert!(db.delete_task(a.id).unwrap());
        assert!(!db.delete_task(a.id).unwrap());

        db.complete_task(b.id, Utc::now()).unwrap();
        assert_eq!(db.delete_all_completed().unwrap(), 1);
        let remaining: Vec<_> = db.active_tasks().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![c.id]);
        assert!(db.completed_tasks().unwrap().is_empty());
    }

    #[test]
    fn insert_tasks_is_all_or_nothing() {
        let db = Database::open_memory().unwrap();
        let batch = vec![new_task("ok", 5, 0), new_task("", 5, 1)];
        assert!(db.insert_tasks(&batch).is_err());
        assert!(db.active_tasks().unwrap().is_empty());

        let batch = vec![new_task("one", 5, 0), new_task("two", 5, 1)];
        let inserted = db.insert_tasks(&batch).unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(inserted[1].title, "two");
    }

    fn children(entries: &[(&str, u32)]) -> Vec<NewTemplateTask> {
        entries
            .iter()
            .enumerate()
            .map(|(i, (t, m))| NewTemplateTask::new(*t, *m, i as i64))
            .collect()
    }

    #[test]
    fn create_and_get_template() {
        let db = Database::open_memory().unwrap();
        let created = db
            .create_template(
                &NewTemplate::new("Morning").with_icon("☀️"),
                &children(&[("Stretch", 10), ("Coffee", 5)]),
            )
            .unwrap();
        assert_eq!(created.template.name, "Morning");
        assert_eq!(created.tasks.len(), 2);
        assert_eq!(created.tasks[0].title, "Stretch");
        assert!(created.tasks.iter().all(|t| t.template_id == created.template.id));

        let fetched = db.get_template(created.template.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn replace_children_swaps_list() {
        let db = Database::open_memory().unwrap();
        let created = db
            .create_template(&NewTemplate::new("Work"), &children(&[("Old", 10)]))
            .unwrap();
        db.replace_template_children(
            created.template.id,
            &children(&[("New A", 15), ("New B", 20)]),
        )
        .unwrap();

        let fetched = db.get_template(created.template.id).unwrap().unwrap();
        let titles: Vec<_> = fetched.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["New A", "New B"]);
    }

    #[test]
    fn failed_replace_keeps_old_children() {
        let db = Database::open_memory().unwrap();
        let created = db
            .create_template(&NewTemplate::new("Work"), &children(&[("Keep", 10)]))
            .unwrap();
        let bad = vec![NewTemplateTask::new("", 10, 0)];
        assert!(db.replace_template_children(created.template.id, &bad).is_err());
        assert!(db.replace_template_children(999, &children(&[("x", 1)])).is_err());

        let fetched = db.get_template(created.template.id).unwrap().unwrap();
        assert_eq!(fetched.tasks.len(), 1);
        assert_eq!(fetched.tasks[0].title, "Keep");
    }

    #[test]
    fn update_template_renames_and_replaces() {
        let db = Database::open_memory().unwrap();
        let created = db
            .create_template(&NewTemplate::new("Evening"), &children(&[("Read", 20)]))
            .unwrap();
        let updated = db
            .update_template(
                created.template.id,
                &NewTemplate::new("Night").with_description("wind down"),
                &children(&[("Journal", 10)]),
            )
            .unwrap();
        assert_eq!(updated.template.name, "Night");
        assert_eq!(updated.template.description, "wind down");
        assert_eq!(updated.template.created_at, created.template.created_at);
        assert_eq!(updated.tasks.len(), 1);
        assert_eq!(updated.tasks[0].title, "Journal");
    }

    #[test]
    fn delete_template_cascades_children() {
        let db = Database::open_memory().unwrap();
        let created = db
            .create_template(&NewTemplate::new("Gym"), &children(&[("Warm up", 10)]))
            .unwrap();
        assert!(db.delete_template(created.template.id).unwrap());
        assert!(db.get_template(created.template.id).unwrap().is_none());

        let orphans: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM template_tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn templates_listed_newest_first() {
        let db = Database::open_memory().unwrap();
        db.create_template(&NewTemplate::new("first"), &[]).unwrap();
        db.create_template(&NewTemplate::new("second"), &[]).unwrap();
        let names: Vec<_> = db
            .templates_with_tasks()
            .unwrap()
            .into_iter()
            .map(|t| t.template.name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
        assert_eq!(db.template_count().unwrap(), 2);
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helmut.db");
        {
            let db = Database::open_path(&path).unwrap();
            db.insert_task(&new_task("Persist me", 10, 0)).unwrap();
        }
        let db = Database::open_path(&path).unwrap();
        let tasks = db.active_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Persist me");
    }
}
