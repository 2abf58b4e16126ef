//! Webhook alert client
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use pvmirror_core::ports::IAlertChannel;
//! use pvmirror_webhook::WebhookAlertChannel;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let channel = WebhookAlertChannel::new(
//!     "https://hooks.example.com/services/T000/B000",
//!     Duration::from_secs(10),
//! )?;
//! channel.send("backup of /data failed").await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use pvmirror_core::ports::alert_channel::IAlertChannel;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::AlertError;

/// Longest response body kept in an [`AlertError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Request body sent to the webhook
#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    text: &'a str,
}

/// Alert channel posting JSON to an incoming webhook
#[derive(Debug, Clone)]
pub struct WebhookAlertChannel {
    client: Client,
    url: url::Url,
}

impl WebhookAlertChannel {
    /// Creates a channel posting to `url`, giving up on a request after `timeout`
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AlertError> {
        let url = url::Url::parse(url).map_err(|e| AlertError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AlertError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pvmirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AlertError::Client)?;

        Ok(Self { client, url })
    }

    /// The endpoint alerts are posted to
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Posts a single alert, mapping every failure to [`AlertError`]
    pub async fn post(&self, text: &str) -> Result<(), AlertError> {
        debug!(url = %self.url, chars = text.len(), "Posting alert");

        let response = self
            .client
            .post(self.url.clone())
            .json(&AlertPayload { text })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(AlertError::Status { status, body })
    }
}

#[async_trait::async_trait]
impl IAlertChannel for WebhookAlertChannel {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        self.post(text).await.map_err(anyhow::Error::from)
    }
}
