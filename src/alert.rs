//! Chat webhook alerts

use async_trait::async_trait;
use serde::Serialize;

use crate::probe::errors::ProbeError;

#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), ProbeError>;
}

#[derive(Debug, Serialize)]
struct SlackPayload<'a> {
    channel: &'a str,
    mrkdwn: bool,
    text: &'a str,
}

/// Posts `{channel, mrkdwn, text}` to a Slack-compatible endpoint with a bearer token
pub struct SlackNotifier {
    client: reqwest::Client,
    url: String,
    channel: String,
    auth_token: String,
}

impl SlackNotifier {
    pub fn new(url: impl Into<String>, channel: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            channel: channel.into(),
            auth_token: auth_token.into(),
        }
    }
}

#[async_trait]
impl AlertNotifier for SlackNotifier {
    async fn send(&self, message: &str) -> Result<(), ProbeError> {
        let payload = SlackPayload {
            channel: &self.channel,
            mrkdwn: true,
            text: message,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.auth_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProbeError::AlertDelivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProbeError::AlertDelivery(format!(
                "webhook returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}

/// Used when no alert endpoint is configured; alerts only reach the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), ProbeError> {
        tracing::warn!(alert = %message, "Balance alert (no webhook configured)");
        Ok(())
    }
}
