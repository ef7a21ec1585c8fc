mod config;
pub mod database;
pub mod migrations;
mod settings;
mod store;
mod traits;

pub use config::{
    Config, LoggingConfig, NotificationsConfig, SoundChoice, TasksConfig, TemplatesConfig,
};
pub use database::Database;
pub use settings::{ConfigSettings, NotificationSettings, SettingsStore};
pub use store::SqliteStore;
pub use traits::{TaskStore, TemplateStore};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory, creating it if needed.
///
/// `HELMUT_DATA_DIR` overrides the location outright. Otherwise the
/// directory is `~/.config/helmut[-dev]/`, with `HELMUT_ENV=dev` selecting
/// the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("HELMUT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("HELMUT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("helmut-dev")
            } else {
                base_dir.join("helmut")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
