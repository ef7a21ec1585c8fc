//! Completion alerts rendered on the terminal.

use std::io::Write;

use helmut_core::{CompletionAlert, NotificationDispatcher, NotifyError, SoundChoice};
use tracing::debug;

/// Rings the terminal bell and writes the alert to stderr.
///
/// Custom sounds and vibration have no terminal equivalent; both fall back
/// to the bell.
pub struct TerminalDispatcher;

impl NotificationDispatcher for TerminalDispatcher {
    fn notify_timer_complete(&self, alert: &CompletionAlert) -> Result<(), NotifyError> {
        if let SoundChoice::Custom(path) = &alert.sound {
            debug!(%path, "custom sound not playable on a terminal");
        }
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "\x07{} {}", alert.title(), alert.body())
            .and_then(|()| stderr.flush())
            .map_err(|e| NotifyError::Failed(e.to_string()))
    }
}
