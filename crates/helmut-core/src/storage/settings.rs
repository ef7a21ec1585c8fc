//! Notification preferences with change subscription.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use super::config::{Config, SoundChoice};
use crate::error::ConfigError;

/// One consistent view of the notification preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub vibration: bool,
    pub sound: SoundChoice,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            vibration: true,
            sound: SoundChoice::SystemDefault,
        }
    }
}

/// Read/write access to notification preferences.
///
/// Setters persist before publishing; a failed write leaves both the stored
/// and the published value unchanged.
pub trait SettingsStore: Send + Sync {
    /// Snapshot of all notification preferences.
    fn notification_settings(&self) -> NotificationSettings;

    /// Current value immediately, then every change (last value wins).
    fn subscribe(&self) -> watch::Receiver<NotificationSettings>;

    fn set_notification_enabled(&self, enabled: bool) -> Result<(), ConfigError>;
    fn set_vibration_enabled(&self, enabled: bool) -> Result<(), ConfigError>;
    fn set_notification_sound(&self, sound: SoundChoice) -> Result<(), ConfigError>;

    fn notification_enabled(&self) -> bool {
        self.notification_settings().enabled
    }

    fn vibration_enabled(&self) -> bool {
        self.notification_settings().vibration
    }

    fn notification_sound(&self) -> SoundChoice {
        self.notification_settings().sound
    }
}

/// [`SettingsStore`] backed by the TOML [`Config`].
pub struct ConfigSettings {
    config: Mutex<Config>,
    path: Option<PathBuf>,
    tx: watch::Sender<NotificationSettings>,
}

impl ConfigSettings {
    /// Load from the default config location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Config::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::load_from(path)?;
        Ok(Self::with_config(config, Some(path.to_path_buf())))
    }

    /// Settings that live only in memory.
    pub fn in_memory(config: Config) -> Self {
        Self::with_config(config, None)
    }

    fn with_config(config: Config, path: Option<PathBuf>) -> Self {
        let tx = watch::Sender::new(settings_of(&config));
        Self {
            config: Mutex::new(config),
            path,
            tx,
        }
    }

    /// Copy of the full configuration.
    pub fn config(&self) -> Config {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, apply: impl FnOnce(&mut Config)) -> Result<(), ConfigError> {
        let mut config = self.lock();
        let mut next = config.clone();
        apply(&mut next);
        if let Some(path) = &self.path {
            next.save_to(path)?;
        }
        *config = next;
        let settings = settings_of(&config);

        // Published under the config lock so concurrent setters cannot
        // reorder what subscribers see.
        debug!(?settings, "Notification settings changed");
        self.tx.send_if_modified(|current| {
            if *current == settings {
                false
            } else {
                *current = settings;
                true
            }
        });
        Ok(())
    }
}

fn settings_of(config: &Config) -> NotificationSettings {
    NotificationSettings {
        enabled: config.notifications.enabled,
        vibration: config.notifications.vibration,
        sound: config.notifications.sound.clone(),
    }
}

impl SettingsStore for ConfigSettings {
    fn notification_settings(&self) -> NotificationSettings {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<NotificationSettings> {
        self.tx.subscribe()
    }

    fn set_notification_enabled(&self, enabled: bool) -> Result<(), ConfigError> {
        self.update(|c| c.notifications.enabled = enabled)
    }

    fn set_vibration_enabled(&self, enabled: bool) -> Result<(), ConfigError> {
        self.update(|c| c.notifications.vibration = enabled)
    }

    fn set_notification_sound(&self, sound: SoundChoice) -> Result<(), ConfigError> {
        self.update(|c| c.notifications.sound = sound)
    }
}
