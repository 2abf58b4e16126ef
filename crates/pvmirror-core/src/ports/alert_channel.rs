//! Alert channel port (driven/secondary port)
//!
//! Alerts are fire-and-forget free text. The caller logs and drops any
//! error returned here; delivery is never retried.

/// Port trait for sending an alert message to operators
#[async_trait::async_trait]
pub trait IAlertChannel: Send + Sync {
    /// Sends `text` to the channel
    async fn send(&self, text: &str) -> anyhow::Result<()>;
}
