use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::notifications::alert::{self, AlertSummary};
use crate::notifications::error::NotifyError;

/// Timeout applied to every outbound transport call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Whatsapp,
    Email,
    Sms,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Whatsapp => "whatsapp",
            ChannelKind::Email => "email",
            ChannelKind::Sms => "sms",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one send attempt. Failures are carried as data; `send` never
/// returns `Err` and never panics past the channel boundary.
#[derive(Debug, Clone)]
pub struct NotificationResult {
    pub success: bool,
    pub id: Option<String>,
    pub error: Option<NotifyError>,
}

impl NotificationResult {
    pub fn delivered(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
            error: None,
        }
    }

    pub fn rejected(error: NotifyError) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(error),
        }
    }

    pub fn error_text(&self) -> Option<String> {
        self.error.as_ref().map(|err| err.to_string())
    }
}

impl From<Result<String, NotifyError>> for NotificationResult {
    fn from(result: Result<String, NotifyError>) -> Self {
        match result {
            Ok(id) => NotificationResult::delivered(id),
            Err(err) => NotificationResult::rejected(err),
        }
    }
}

/// One external transport. Implementations are stateless per call: each
/// `send` issues a single timeout-bounded network request and reports the
/// outcome synchronously.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Documented per-transport message length cap, in characters.
    fn message_limit(&self) -> usize;

    async fn send(&self, recipient: &str, message: &str) -> NotificationResult;

    /// Renders a zone status summary for this channel, capped to its limit.
    fn format_alert(&self, entity_name: &str, summary: &AlertSummary) -> String {
        alert::format_alert(entity_name, summary, self.message_limit())
    }
}
