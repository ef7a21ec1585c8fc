use chrono::Local;
use helmut_core::{summarize, TaskStore};

use super::{open_store, print_json, CliResult};

pub fn run() -> CliResult {
    let store = open_store()?;
    let completed = store.completed_tasks().borrow().clone();
    let summary = summarize(&completed, Local::now().date_naive());
    print_json(&summary)
}
