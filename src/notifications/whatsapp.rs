use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::WhatsAppConfig;
use crate::notifications::alert::truncate_to_limit;
use crate::notifications::channel::{
    ChannelKind, NotificationChannel, NotificationResult, REQUEST_TIMEOUT,
};
use crate::notifications::error::NotifyError;
use crate::notifications::phone::normalize_phone;

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v19.0";
const MESSAGE_LIMIT: usize = 4096;

/// WhatsApp Business Cloud API client. Sends free-text messages only; the
/// template flow is intentionally not supported.
pub struct WhatsAppClient {
    state: State,
}

enum State {
    Ready {
        client: reqwest::Client,
        endpoint: String,
        access_token: String,
    },
    Disabled(String),
}

impl WhatsAppClient {
    pub fn new(config: Option<&WhatsAppConfig>) -> Self {
        let Some(config) = config else {
            return Self {
                state: State::Disabled("whatsapp section missing".to_string()),
            };
        };
        if let Some(reason) = config.disabled_reason() {
            return Self {
                state: State::Disabled(reason),
            };
        }

        let client = match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
            Ok(client) => client,
            Err(err) => {
                return Self {
                    state: State::Disabled(format!("http client init failed: {err}")),
                };
            }
        };
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        let phone_number_id = config.phone_number_id.as_deref().unwrap_or_default();
        Self {
            state: State::Ready {
                client,
                endpoint: format!("{base}/{phone_number_id}/messages"),
                access_token: config.access_token.clone().unwrap_or_default(),
            },
        }
    }

    async fn dispatch(&self, recipient: &str, message: &str) -> Result<String, NotifyError> {
        let (client, endpoint, access_token) = match &self.state {
            State::Ready {
                client,
                endpoint,
                access_token,
            } => (client, endpoint, access_token),
            State::Disabled(reason) => {
                return Err(NotifyError::not_enabled("whatsapp", reason));
            }
        };

        let to = normalize_phone(recipient)?;
        let body = truncate_to_limit(message, MESSAGE_LIMIT);
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body },
        });

        let response = client
            .post(endpoint)
            .bearer_auth(access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| NotifyError::from_reqwest(err, REQUEST_TIMEOUT))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| NotifyError::from_reqwest(err, REQUEST_TIMEOUT))?;

        if status.is_success() {
            let id = parse_message_id(&text).unwrap_or_default();
            tracing::debug!(
                event = "notification_sent",
                channel = "whatsapp",
                to = %to,
                message_id = %id,
                "whatsapp message accepted"
            );
            return Ok(id);
        }

        Err(NotifyError::Transport {
            status: status.as_u16(),
            message: parse_error_message(&text)
                .unwrap_or_else(|| format!("unexpected response: {text}")),
        })
    }
}

#[async_trait]
impl NotificationChannel for WhatsAppClient {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Whatsapp
    }

    fn message_limit(&self) -> usize {
        MESSAGE_LIMIT
    }

    async fn send(&self, recipient: &str, message: &str) -> NotificationResult {
        self.dispatch(recipient, message).await.into()
    }
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<i64>,
}

fn parse_message_id(body: &str) -> Option<String> {
    let parsed: SendResponse = serde_json::from_str(body).ok()?;
    parsed.messages.into_iter().next().map(|message| message.id)
}

fn parse_error_message(body: &str) -> Option<String> {
    let parsed: ErrorResponse = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let message = error.message?;
    match error.code {
        Some(code) => Some(format!("{message} (code {code})")),
        None => Some(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_id_from_success_body() {
        let body = r#"{"messaging_product":"whatsapp","messages":[{"id":"wamid.ABC"}]}"#;
        assert_eq!(parse_message_id(body).as_deref(), Some("wamid.ABC"));
    }

    #[test]
    fn parses_provider_error_body() {
        let body = r#"{"error":{"message":"Invalid OAuth access token","code":190}}"#;
        assert_eq!(
            parse_error_message(body).as_deref(),
            Some("Invalid OAuth access token (code 190)")
        );
    }

    #[tokio::test]
    async fn disabled_client_rejects_without_network() {
        let client = WhatsAppClient::new(None);
        let result = client.send("+1234567890", "hi").await;
        assert!(!result.success);
        assert!(result.error_text().unwrap().contains("not enabled"));
    }
}
