//! Template materialization and built-in templates.
//!
//! "Add to today" copies each child of a template into an independent
//! [`NewTask`]. No link back to the template is kept: editing or deleting the
//! template later has no effect on tasks already added.

use chrono::{DateTime, Utc};

use super::{NewTask, NewTemplate, NewTemplateTask, Task, TemplateWithTasks};

/// Build the new tasks for "add template to today".
///
/// Children keep their template order and are appended after the highest
/// `order` currently on the active list (`-1` when the list is empty), so a
/// list whose max order is 1 receives orders 2, 3, 4, ...
pub fn materialize_for_today(
    template: &TemplateWithTasks,
    active: &[Task],
    now: DateTime<Utc>,
) -> Vec<NewTask> {
    let max_order = active.iter().map(|t| t.order).max().unwrap_or(-1);

    let mut children: Vec<_> = template.tasks.iter().collect();
    children.sort_by_key(|c| c.order);

    children
        .into_iter()
        .enumerate()
        .map(|(index, child)| NewTask {
            title: child.title.clone(),
            estimated_minutes: child.estimated_minutes,
            order: max_order + index as i64 + 1,
            created_at: now,
        })
        .collect()
}

/// Templates seeded into an empty template table.
pub fn default_templates() -> Vec<(NewTemplate, Vec<NewTemplateTask>)> {
    vec![
        (
            NewTemplate::new("Morning Routine")
                .with_description("Start your day right")
                .with_icon("☀️"),
            children(&[("Meditation", 10), ("Exercise", 30), ("Healthy Breakfast", 15)]),
        ),
        (
            NewTemplate::new("Deep Work Session")
                .with_description("Pomodoro-style focus blocks")
                .with_icon("🎯"),
            children(&[
                ("Focus Block 1", 25),
                ("Short Break", 5),
                ("Focus Block 2", 25),
                ("Long Break", 15),
            ]),
        ),
        (
            NewTemplate::new("Evening Wind Down")
                .with_description("Relax and prepare for tomorrow")
                .with_icon("🌙"),
            children(&[("Review Today", 10), ("Plan Tomorrow", 10), ("Reading", 20)]),
        ),
    ]
}

fn children(entries: &[(&str, u32)]) -> Vec<NewTemplateTask> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (title, minutes))| NewTemplateTask::new(*title, *minutes, i as i64))
        .collect()
}
