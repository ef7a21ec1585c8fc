//! Task and template records.
//!
//! A [`Task`] is a single item on today's list. Tasks are either active
//! (`is_completed == false`) or completed; `completed_at` is set exactly when
//! `is_completed` is true. Active tasks are ranked by `order`, ties broken by
//! `created_at` (see [`compare_active`]).
//!
//! A [`Template`] is a reusable, named list of [`TemplateTask`]s that can be
//! materialized into today's list (see [`templates`]).

pub mod templates;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Store-assigned task identifier.
pub type TaskId = i64;

/// Store-assigned template identifier.
pub type TemplateId = i64;

/// Icon used when a template is created without one.
pub const DEFAULT_TEMPLATE_ICON: &str = "⚡";

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (assigned by the store)
    pub id: TaskId,
    /// Task title (non-empty)
    pub title: String,
    /// Estimated duration in minutes (positive)
    pub estimated_minutes: u32,
    /// Whether the task is completed
    pub is_completed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Completion timestamp (set once, on completion)
    pub completed_at: Option<DateTime<Utc>>,
    /// Rank among active tasks
    pub order: i64,
}

impl Task {
    /// Estimated duration in seconds.
    pub fn estimated_secs(&self) -> u64 {
        u64::from(self.estimated_minutes) * 60
    }
}

/// A task that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub estimated_minutes: u32,
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, estimated_minutes: u32, order: i64) -> Self {
        Self {
            title: title.into(),
            estimated_minutes,
            order,
            created_at: Utc::now(),
        }
    }

    /// Check the title and estimate before the task reaches the store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_minutes("estimated_minutes", self.estimated_minutes)
    }
}

/// Ordering contract for the active list: `order` ascending, then
/// `created_at` ascending, then `id` so the ranking is total.
pub fn compare_active(a: &Task, b: &Task) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort a slice of tasks by the active ordering contract.
pub fn sort_active(tasks: &mut [Task]) {
    tasks.sort_by(compare_active);
}

/// Order value a new task should take to land at the end of `active`.
///
/// Single added tasks use the list length; template materialization uses
/// `max(order) + 1` instead (see [`templates::materialize_for_today`]).
pub fn append_order(active: &[Task]) -> i64 {
    active.len() as i64
}

/// A reusable template header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

/// One child entry of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateTask {
    pub id: i64,
    pub template_id: TemplateId,
    pub title: String,
    pub estimated_minutes: u32,
    /// Rank within the template
    pub order: i64,
}

/// A template together with its children, ordered by `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateWithTasks {
    pub template: Template,
    pub tasks: Vec<TemplateTask>,
}

/// Template header fields for creation and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: String,
}

impl NewTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            icon: default_icon(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyTemplateName);
        }
        Ok(())
    }
}

/// Template child fields for creation and replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplateTask {
    pub title: String,
    pub estimated_minutes: u32,
    pub order: i64,
}

impl NewTemplateTask {
    pub fn new(title: impl Into<String>, estimated_minutes: u32, order: i64) -> Self {
        Self {
            title: title.into(),
            estimated_minutes,
            order,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_minutes("estimated_minutes", self.estimated_minutes)
    }
}

fn default_icon() -> String {
    DEFAULT_TEMPLATE_ICON.to_string()
}

pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}

pub(crate) fn validate_minutes(field: &'static str, minutes: u32) -> Result<(), ValidationError> {
    if minutes == 0 {
        return Err(ValidationError::NonPositiveDuration { field, value: 0 });
    }
    Ok(())
}
