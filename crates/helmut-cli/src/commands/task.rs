//! Task management commands for CLI.

use clap::Subcommand;
use helmut_core::{Config, CoreError, TaskId, TaskStore};

use super::{coordinator, open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the end of today's list
    Add {
        /// Task title
        title: String,
        /// Estimated minutes (default: tasks.default_estimate_minutes)
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// List tasks
    List {
        /// Show completed tasks instead of active ones
        #[arg(long)]
        completed: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: TaskId,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        id: TaskId,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: TaskId,
    },
    /// Delete every completed task
    ClearCompleted,
}

pub fn run(action: TaskAction) -> CliResult {
    let store = open_store()?;

    match action {
        TaskAction::Add { title, minutes } => {
            let minutes = match minutes {
                Some(m) => m,
                None => Config::load()?.tasks.default_estimate_minutes,
            };
            let task = coordinator(store)?.add_task(&title, minutes)?;
            print_json(&task)?;
        }
        TaskAction::List { completed } => {
            let tasks = if completed {
                store.completed_tasks().borrow().clone()
            } else {
                store.active_tasks_snapshot()
            };
            print_json(&tasks)?;
        }
        TaskAction::Get { id } => {
            let task = store
                .get_task(id)?
                .ok_or(CoreError::NotFound { entity: "task", id })?;
            print_json(&task)?;
        }
        TaskAction::Complete { id } => {
            let task = coordinator(store)?.complete_task(id)?;
            print_json(&task)?;
        }
        TaskAction::Delete { id } => {
            if !coordinator(store)?.delete_task(id)? {
                return Err(CoreError::NotFound { entity: "task", id }.into());
            }
            println!("Task deleted: {id}");
        }
        TaskAction::ClearCompleted => {
            let removed = coordinator(store)?.clear_completed()?;
            println!("Removed {removed} completed task(s)");
        }
    }
    Ok(())
}
