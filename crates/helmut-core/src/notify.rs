//! Completion alerts.
//!
//! The session coordinator decides whether to alert and with which
//! parameters; a [`NotificationDispatcher`] only renders the alert.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::NotifyError;
use crate::storage::SoundChoice;

/// Vibration pattern in milliseconds: wait, buzz, pause, buzz.
pub const VIBRATION_PATTERN_MS: [u64; 4] = [0, 500, 250, 500];

/// Everything a dispatcher needs to render one completion alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionAlert {
    pub task_title: String,
    pub sound: SoundChoice,
    pub vibrate: bool,
    pub vibration_pattern_ms: Vec<u64>,
}

impl CompletionAlert {
    pub fn new(task_title: impl Into<String>, sound: SoundChoice, vibrate: bool) -> Self {
        Self {
            task_title: task_title.into(),
            sound,
            vibrate,
            vibration_pattern_ms: VIBRATION_PATTERN_MS.to_vec(),
        }
    }

    pub fn title(&self) -> &'static str {
        "Time's Up!"
    }

    pub fn body(&self) -> String {
        format!("{} is complete", self.task_title)
    }
}

/// Renders completion alerts.
///
/// Errors are reported to the caller, which logs and drops them.
pub trait NotificationDispatcher: Send + Sync {
    fn notify_timer_complete(&self, alert: &CompletionAlert) -> Result<(), NotifyError>;
}

/// Emits each alert as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn notify_timer_complete(&self, alert: &CompletionAlert) -> Result<(), NotifyError> {
        info!(
            title = alert.title(),
            body = %alert.body(),
            sound = %alert.sound,
            vibrate = alert.vibrate,
            "Timer complete"
        );
        Ok(())
    }
}

/// Drops every alert.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDispatcher;

impl NotificationDispatcher for NullDispatcher {
    fn notify_timer_complete(&self, _alert: &CompletionAlert) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_text() {
        let alert = CompletionAlert::new("Write report", SoundChoice::Alarm, true);
        assert_eq!(alert.title(), "Time's Up!");
        assert_eq!(alert.body(), "Write report is complete");
        assert_eq!(alert.vibration_pattern_ms, vec![0, 500, 250, 500]);
    }

    #[test]
    fn builtin_dispatchers_succeed() {
        let alert = CompletionAlert::new("Read", SoundChoice::SystemDefault, false);
        assert!(LogDispatcher.notify_timer_complete(&alert).is_ok());
        assert!(NullDispatcher.notify_timer_complete(&alert).is_ok());
    }
}
