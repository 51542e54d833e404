//! Pricing-order forwarding to a Telegram chat.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::TelegramConfig;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Telegram forwarding is not configured")]
    NotConfigured,
    #[error("Telegram chat not found. Verify the chat id and make sure the bot has been added to the chat")]
    ChatNotFound,
    #[error("Telegram rejected the bot token. Verify the bot token")]
    BadToken,
    #[error("Bot is not allowed to post to the chat. Make sure it was not removed or muted")]
    Forbidden,
    #[error("Telegram API error: {0}")]
    Api(String),
    #[error("Telegram request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Forwards pricing orders to a Telegram chat via the Bot API.
///
/// Built from the optional config section; when the token or chat id is
/// missing every send returns [`TelegramError::NotConfigured`] and the
/// pricing route reports the feature as unavailable.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    settings: Option<(String, String)>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self::with_api_base(config, "https://api.telegram.org")
    }

    pub fn with_api_base(config: &TelegramConfig, api_base: &str) -> Self {
        let settings = match (&config.bot_token, &config.chat_id) {
            (Some(token), Some(chat)) => Some((token.clone(), chat.clone())),
            _ => None,
        };
        TelegramNotifier {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            settings,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_some()
    }

    /// Forward one pricing order to the configured chat.
    pub async fn send_order(
        &self,
        plan_name: &str,
        price: &str,
        details: &str,
    ) -> Result<(), TelegramError> {
        let (token, chat_id) = self.settings.as_ref().ok_or(TelegramError::NotConfigured)?;

        let text = format!(
            "\u{1F4B0} *New Order*\n\n*Plan:* {plan_name}\n*Price:* {price}\n\n{details}"
        );
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .map_err(|e| TelegramError::Transport(e.to_string()))?;

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| TelegramError::Transport(e.to_string()))?;
        if body.ok {
            return Ok(());
        }

        let description = body.description.unwrap_or_default();
        if description.contains("chat not found") {
            Err(TelegramError::ChatNotFound)
        } else if description.contains("Unauthorized") {
            Err(TelegramError::BadToken)
        } else if description.contains("Forbidden") {
            Err(TelegramError::Forbidden)
        } else {
            Err(TelegramError::Api(description))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(token: Option<&str>, chat: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            chat_id: chat.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn unconfigured_notifier_refuses_to_send() {
        let notifier = TelegramNotifier::new(&config(Some("t"), None));
        assert!(!notifier.is_configured());
        let result = notifier.send_order("Pro", "$29", "email: a@x.com").await;
        assert!(matches!(result, Err(TelegramError::NotConfigured)));
    }

    #[tokio::test]
    async fn order_is_posted_to_the_bot_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottok123/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "42", "parse_mode": "Markdown" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            TelegramNotifier::with_api_base(&config(Some("tok123"), Some("42")), &server.uri());
        notifier
            .send_order("Pro", "$29", "email: a@x.com")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn chat_not_found_maps_to_dedicated_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let notifier =
            TelegramNotifier::with_api_base(&config(Some("tok"), Some("42")), &server.uri());
        let result = notifier.send_order("Pro", "$29", "details").await;
        assert!(matches!(result, Err(TelegramError::ChatNotFound)));
    }

    #[tokio::test]
    async fn bad_token_maps_to_dedicated_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let notifier =
            TelegramNotifier::with_api_base(&config(Some("bad"), Some("42")), &server.uri());
        let result = notifier.send_order("Pro", "$29", "details").await;
        assert!(matches!(result, Err(TelegramError::BadToken)));
    }
}
