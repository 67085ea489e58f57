//! Alert delivery to one channel.

use thiserror::Error;
use url::Url;

use super::Alert;
use crate::http::{HttpClient, HttpError, HttpRequest};
use crate::subscription::ChannelId;

/// Why a single delivery failed.
///
/// Failures are per channel: the dispatcher records them and moves on.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The bot lacks permission to post in the channel.
    #[error("Missing permission to post in channel")]
    Forbidden,

    /// The channel no longer exists.
    #[error("Channel no longer exists")]
    ChannelGone,

    /// Any other non-success status.
    #[error("Delivery rejected with HTTP {status}")]
    Status {
        /// Response status
        status: http::StatusCode,
        /// Response body, if it was text
        body: Option<String>,
    },

    /// The request never got a response.
    #[error("Delivery transport error: {0}")]
    Transport(#[from] HttpError),

    /// The message could not be built.
    #[error("Failed to build delivery request: {0}")]
    Build(String),
}

impl DeliveryError {
    /// Returns `true` if the channel is permanently gone.
    #[must_use]
    pub const fn is_channel_gone(&self) -> bool {
        matches!(self, Self::ChannelGone)
    }
}

/// Delivers a rendered alert to one channel.
///
/// Implementations never retry.
pub trait AlertSender: Send + Sync {
    /// Sends the alert to `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] describing why this channel did not get it.
    fn send(
        &self,
        channel: ChannelId,
        alert: &Alert,
    ) -> impl std::future::Future<Output = Result<(), DeliveryError>> + Send;
}

/// Discord REST implementation of [`AlertSender`].
///
/// Posts one embed per alert to `{api_base}/channels/{id}/messages`.
#[derive(Debug, Clone)]
pub struct DiscordSender<H> {
    client: H,
    api_base: Url,
    token: String,
}

impl<H: HttpClient> DiscordSender<H> {
    /// Creates a sender authenticating with the given bot token.
    #[must_use]
    pub fn new(client: H, api_base: Url, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base,
            token: token.into(),
        }
    }

    /// Returns the configured API base URL.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn messages_url(&self, channel: ChannelId) -> Result<Url, DeliveryError> {
        let base = self.api_base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/channels/{channel}/messages"))
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }

    fn build_request(
        &self,
        channel: ChannelId,
        alert: &Alert,
    ) -> Result<HttpRequest, DeliveryError> {
        let body = serde_json::json!({ "embeds": [alert.to_embed()] });

        HttpRequest::post(self.messages_url(channel)?)
            .with_authorization("Bot", &self.token)
            .map_err(|e| DeliveryError::Build(format!("invalid token: {e}")))?
            .with_json(&body)
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

impl<H: HttpClient> AlertSender for DiscordSender<H> {
    async fn send(&self, channel: ChannelId, alert: &Alert) -> Result<(), DeliveryError> {
        let request = self.build_request(channel, alert)?;
        let response = self.client.request(request).await?;

        match response.status {
            s if s.is_success() => Ok(()),
            http::StatusCode::FORBIDDEN => Err(DeliveryError::Forbidden),
            http::StatusCode::NOT_FOUND => Err(DeliveryError::ChannelGone),
            status => Err(DeliveryError::Status {
                status,
                body: response.body_text().map(ToString::to_string),
            }),
        }
    }
}

/// [`AlertSender`] that only logs, for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

impl AlertSender for LogSender {
    async fn send(&self, channel: ChannelId, alert: &Alert) -> Result<(), DeliveryError> {
        tracing::info!(
            "[dry-run] Alert for channel {channel}: {} | {}",
            alert.title,
            alert.description.replace('\n', " ")
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;
