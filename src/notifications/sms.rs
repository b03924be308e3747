use async_trait::async_trait;
use chrono::{Timelike, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::config::SmsConfig;
use crate::notifications::alert::truncate_to_limit;
use crate::notifications::channel::{
    ChannelKind, NotificationChannel, NotificationResult, REQUEST_TIMEOUT,
};
use crate::notifications::error::NotifyError;
use crate::notifications::phone::normalize_phone;

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";
// Single-segment concatenated SMS ceiling enforced by the provider.
const MESSAGE_LIMIT: usize = 1600;

/// Hour-of-day window during which non-forced sends are suppressed.
/// `start == end` means the window is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: u32,
    pub end: u32,
}

impl QuietHours {
    pub fn suppresses(&self, hour: u32) -> bool {
        if self.start == self.end {
            return false;
        }
        if self.start < self.end {
            (self.start..self.end).contains(&hour)
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

pub struct SmsClient {
    state: State,
    quiet_hours: Option<QuietHours>,
    timezone: Tz,
}

enum State {
    Ready {
        client: reqwest::Client,
        endpoint: String,
        account_sid: String,
        auth_token: String,
        from_number: String,
    },
    Disabled(String),
}

impl SmsClient {
    pub fn new(config: Option<&SmsConfig>) -> Self {
        let Some(config) = config else {
            return Self {
                state: State::Disabled("sms section missing".to_string()),
                quiet_hours: None,
                timezone: Tz::UTC,
            };
        };

        let quiet_hours = match (config.quiet_start_hour, config.quiet_end_hour) {
            (Some(start), Some(end)) if start < 24 && end < 24 => {
                Some(QuietHours { start, end })
            }
            (Some(_), Some(_)) => {
                tracing::warn!(
                    event = "config_invalid",
                    channel = "sms",
                    "quiet hours out of 0-23 range, ignoring"
                );
                None
            }
            _ => None,
        };
        let timezone = config
            .timezone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC);

        if let Some(reason) = config.disabled_reason() {
            return Self {
                state: State::Disabled(reason),
                quiet_hours,
                timezone,
            };
        }

        let client = match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
            Ok(client) => client,
            Err(err) => {
                return Self {
                    state: State::Disabled(format!("http client init failed: {err}")),
                    quiet_hours,
                    timezone,
                };
            }
        };
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        let account_sid = config.account_sid.clone().unwrap_or_default();
        Self {
            state: State::Ready {
                endpoint: format!("{base}/2010-04-01/Accounts/{account_sid}/Messages.json"),
                client,
                account_sid,
                auth_token: config.auth_token.clone().unwrap_or_default(),
                from_number: config.from_number.clone().unwrap_or_default(),
            },
            quiet_hours,
            timezone,
        }
    }

    /// Whether a critical alert may go out right now. Forced sends always
    /// pass; otherwise the configured quiet-hours window wins.
    pub fn should_send_critical_sms(&self, force: bool) -> bool {
        let hour = Utc::now().with_timezone(&self.timezone).hour();
        self.should_send_at(hour, force)
    }

    pub fn should_send_at(&self, hour: u32, force: bool) -> bool {
        if force {
            return true;
        }
        match self.quiet_hours {
            Some(window) => !window.suppresses(hour),
            None => true,
        }
    }

    /// Sends with an explicit force flag. The trait `send` is the non-forced
    /// form and respects quiet hours.
    pub async fn send_with_force(
        &self,
        recipient: &str,
        message: &str,
        force: bool,
    ) -> NotificationResult {
        if !self.should_send_critical_sms(force) {
            let window = self.quiet_hours.unwrap_or(QuietHours { start: 0, end: 0 });
            tracing::info!(
                event = "notification_suppressed",
                channel = "sms",
                quiet_start = window.start,
                quiet_end = window.end,
                "sms suppressed by quiet hours"
            );
            return NotificationResult::rejected(NotifyError::Configuration(format!(
                "sms suppressed by quiet hours ({}-{})",
                window.start, window.end
            )));
        }
        self.dispatch(recipient, message).await.into()
    }

    async fn dispatch(&self, recipient: &str, message: &str) -> Result<String, NotifyError> {
        let (client, endpoint, account_sid, auth_token, from_number) = match &self.state {
            State::Ready {
                client,
                endpoint,
                account_sid,
                auth_token,
                from_number,
            } => (client, endpoint, account_sid, auth_token, from_number),
            State::Disabled(reason) => {
                return Err(NotifyError::not_enabled("sms", reason));
            }
        };

        let to = normalize_phone(recipient)?;
        let body = truncate_to_limit(message, MESSAGE_LIMIT);
        let params = [
            ("To", to.as_str()),
            ("From", from_number.as_str()),
            ("Body", body.as_str()),
        ];

        let response = client
            .post(endpoint)
            .basic_auth(account_sid, Some(auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|err| NotifyError::from_reqwest(err, REQUEST_TIMEOUT))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| NotifyError::from_reqwest(err, REQUEST_TIMEOUT))?;

        if status.is_success() {
            let sid = parse_message_sid(&text).unwrap_or_default();
            tracing::debug!(
                event = "notification_sent",
                channel = "sms",
                to = %to,
                message_id = %sid,
                "sms accepted by provider"
            );
            return Ok(sid);
        }

        Err(NotifyError::Transport {
            status: status.as_u16(),
            message: parse_error_message(&text)
                .unwrap_or_else(|| format!("unexpected response: {text}")),
        })
    }
}

#[async_trait]
impl NotificationChannel for SmsClient {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn message_limit(&self) -> usize {
        MESSAGE_LIMIT
    }

    async fn send(&self, recipient: &str, message: &str) -> NotificationResult {
        self.send_with_force(recipient, message, false).await
    }
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: Option<String>,
    code: Option<i64>,
}

fn parse_message_sid(body: &str) -> Option<String> {
    serde_json::from_str::<MessageResponse>(body).ok()?.sid
}

fn parse_error_message(body: &str) -> Option<String> {
    let parsed: ErrorResponse = serde_json::from_str(body).ok()?;
    let message = parsed.message?;
    match parsed.code {
        Some(code) => Some(format!("{message} (code {code})")),
        None => Some(message),
    }
}
