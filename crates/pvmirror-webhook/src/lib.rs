//! pvmirror Webhook - Alert channel over HTTP
//!
//! Posts `{"text": "<message>"}` to a configured URL, the payload shape
//! understood by Slack-style incoming webhooks.
//!
//! ## Modules
//!
//! - [`client`] - The [`WebhookAlertChannel`] adapter for
//!   [`IAlertChannel`](pvmirror_core::ports::IAlertChannel)

pub mod client;

use thiserror::Error;

pub use client::WebhookAlertChannel;

/// Errors that can occur when posting an alert
#[derive(Debug, Error)]
pub enum AlertError {
    /// The configured webhook URL is unusable
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed
    #[error("Cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never got a response (DNS, connect, timeout)
    #[error("Webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("Webhook returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}
