//! Telegram Bot API notification channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::NotificationChannel;
use crate::config::TelegramConfig;
use crate::errors::ChannelError;

/// Outbound `sendMessage` request body.
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Application-level response envelope from the Bot API.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram notifier targeting a fixed chat.
pub struct TelegramChannel {
    api_url: String,
    bot_token: String,
    chat_id: String,
    http: reqwest::Client,
}

impl TelegramChannel {
    /// Create a new channel. `api_url` is the Bot API host
    /// (`https://api.telegram.org` in production).
    pub fn new(
        api_url: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        let channel = Self {
            api_url: api_url.into(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            http: reqwest::Client::new(),
        };
        info!(chat_id = %channel.chat_id, "initializing Telegram channel");
        channel
    }

    /// Create a channel from resolved configuration. `None` when the bot
    /// token env var was not set.
    pub fn from_config(config: &TelegramConfig) -> Option<Self> {
        config
            .bot_token
            .as_ref()
            .map(|token| Self::new(&config.api_url, token, &config.chat_id))
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        debug!(len = text.len(), "sending Telegram message");

        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(ChannelError::HttpError)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Telegram API returned error status");
            return Err(ChannelError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope = resp.json().await.map_err(ChannelError::HttpError)?;
        if !envelope.ok {
            let description = envelope
                .description
                .unwrap_or_else(|| "no description".into());
            warn!(description = %description, "Telegram API rejected the message");
            return Err(ChannelError::Rejected(description));
        }

        debug!("Telegram message sent successfully");
        Ok(())
    }

    async fn test_connection(&self) -> bool {
        let result = async {
            let resp = self.http.get(self.method_url("getMe")).send().await?;
            resp.json::<ApiEnvelope>().await
        }
        .await;

        match result {
            Ok(envelope) => envelope.ok,
            Err(e) => {
                warn!(error = %e, "Telegram connection test failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url_construction() {
        let channel = TelegramChannel::new("https://api.telegram.org", "123:abc", "-10042");
        assert_eq!(
            channel.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_from_config_requires_resolved_token() {
        let mut config = TelegramConfig {
            api_url: "https://api.telegram.org".into(),
            chat_id: "42".into(),
            bot_token_env: "TELEGRAM_BOT_TOKEN".into(),
            bot_token: None,
        };
        assert!(TelegramChannel::from_config(&config).is_none());

        config.bot_token = Some("123:abc".into());
        assert!(TelegramChannel::from_config(&config).is_some());
    }

    #[test]
    fn test_send_message_request_shape() {
        let body = SendMessageRequest {
            chat_id: "42",
            text: "hello",
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["chat_id"], "42");
        assert_eq!(json["parse_mode"], "HTML");
        assert_eq!(json["disable_web_page_preview"], true);
    }
}
