//! Notifier - journal logging plus best-effort alerts
//!
//! Wraps a [`Journal`] and an optional [`IAlertChannel`]. Alert delivery is
//! fire-and-forget: failures are written to the journal as a warning and
//! otherwise dropped, never retried, never propagated.

use std::sync::Arc;

use pvmirror_core::ports::alert_channel::IAlertChannel;
use tracing::debug;

use crate::journal::Journal;

/// Logging and alerting front door shared by every component.
#[derive(Clone)]
pub struct Notifier {
    journal: Journal,
    channel: Option<Arc<dyn IAlertChannel>>,
}

impl Notifier {
    /// Creates a notifier; `channel = None` turns alerts into journal-only events.
    pub fn new(journal: Journal, channel: Option<Arc<dyn IAlertChannel>>) -> Self {
        Self { journal, channel }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn log_info(&self, message: impl AsRef<str>) {
        self.journal.info(message);
    }

    pub fn log_warn(&self, message: impl AsRef<str>) {
        self.journal.warn(message);
    }

    pub fn log_error(&self, message: impl AsRef<str>) {
        self.journal.error(message);
    }

    /// Sends `text` to the alert channel, swallowing any failure.
    pub async fn alert(&self, text: &str) {
        let Some(channel) = &self.channel else {
            debug!("No alert channel configured, alert kept in journal only");
            return;
        };

        if let Err(e) = channel.send(text).await {
            self.journal.warn(format!("Alert delivery failed: {e:#}"));
        }
    }

    /// Logs `message` at ERROR and sends it as an alert.
    pub async fn error_with_alert(&self, message: &str) {
        self.log_error(message);
        self.alert(message).await;
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("journal", &self.journal)
            .field("alerts_enabled", &self.channel.is_some())
            .finish()
    }
}
