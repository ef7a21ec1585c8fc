pub mod config;
pub mod history;
pub mod session;
pub mod task;
pub mod template;

use std::error::Error;
use std::sync::Arc;

use helmut_core::{Config, ConfigSettings, SessionCoordinator, SqliteStore, TimerEngine};
use serde::Serialize;

use crate::terminal::TerminalDispatcher;

pub type CliResult = Result<(), Box<dyn Error>>;

/// Open the store in the data directory, seeding the built-in templates
/// when enabled.
pub fn open_store() -> Result<Arc<SqliteStore>, Box<dyn Error>> {
    let store = SqliteStore::open()?;
    if Config::load()?.templates.seed_defaults {
        store.seed_default_templates()?;
    }
    Ok(Arc::new(store))
}

/// Coordinator wired to the terminal for alerts.
pub fn coordinator(store: Arc<SqliteStore>) -> Result<SessionCoordinator, Box<dyn Error>> {
    let settings = ConfigSettings::load()?;
    Ok(SessionCoordinator::new(
        TimerEngine::new(),
        store,
        Arc::new(settings),
        Arc::new(TerminalDispatcher),
    ))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
