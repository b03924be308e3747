use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::notifications::alert::truncate_to_limit;
use crate::notifications::channel::{
    ChannelKind, NotificationChannel, NotificationResult, REQUEST_TIMEOUT,
};
use crate::notifications::error::NotifyError;

const DEFAULT_SUBJECT: &str = "Zone monitoring alert";
const MESSAGE_LIMIT: usize = 100_000;

/// Per-recipient outcome of a bulk send. One bad address never fails the
/// batch; callers inspect the report to tell complete from partial delivery.
#[derive(Debug, Clone)]
pub struct RecipientOutcome {
    pub recipient: String,
    pub result: NotificationResult,
}

#[derive(Debug, Clone, Default)]
pub struct BulkSendReport {
    pub outcomes: Vec<RecipientOutcome>,
}

impl BulkSendReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }

    pub fn all_ok(&self) -> bool {
        self.failed() == 0
    }

    pub fn is_partial(&self) -> bool {
        self.delivered() > 0 && self.failed() > 0
    }
}

/// SMTP channel. One transport per client, STARTTLS, individual sends per
/// recipient for isolated failure tracking.
pub struct EmailClient {
    state: State,
    subject: String,
}

enum State {
    Ready {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    Disabled(String),
}

impl EmailClient {
    pub fn new(config: Option<&EmailConfig>) -> Self {
        let Some(config) = config else {
            return Self {
                state: State::Disabled("email section missing".to_string()),
                subject: DEFAULT_SUBJECT.to_string(),
            };
        };
        let subject = config
            .subject
            .clone()
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        if let Some(reason) = config.disabled_reason() {
            return Self {
                state: State::Disabled(reason),
                subject,
            };
        }

        let from = match config
            .from_address
            .as_deref()
            .unwrap_or_default()
            .parse::<Mailbox>()
        {
            Ok(from) => from,
            Err(err) => {
                return Self {
                    state: State::Disabled(format!("invalid from_address: {err}")),
                    subject,
                };
            }
        };

        let host = config.smtp_host.as_deref().unwrap_or_default();
        let builder = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
            Ok(builder) => builder,
            Err(err) => {
                return Self {
                    state: State::Disabled(format!("smtp transport init failed: {err}")),
                    subject,
                };
            }
        };
        let credentials = Credentials::new(
            config.username.clone().unwrap_or_default(),
            config.password.clone().unwrap_or_default(),
        );
        let mut builder = builder
            .credentials(credentials)
            .timeout(Some(REQUEST_TIMEOUT));
        if let Some(port) = config.smtp_port {
            builder = builder.port(port);
        }

        Self {
            state: State::Ready {
                transport: builder.build(),
                from,
            },
            subject,
        }
    }

    /// Sends the same body to each recipient individually, collecting
    /// per-recipient outcomes.
    pub async fn send_bulk(&self, recipients: &[String], message: &str) -> BulkSendReport {
        let mut report = BulkSendReport::default();
        for recipient in recipients {
            let result = self.send(recipient, message).await;
            report.outcomes.push(RecipientOutcome {
                recipient: recipient.clone(),
                result,
            });
        }
        if report.is_partial() {
            tracing::warn!(
                event = "notification_partial",
                channel = "email",
                delivered = report.delivered(),
                failed = report.failed(),
                "bulk email delivered partially"
            );
        }
        report
    }

    async fn dispatch(&self, recipient: &str, message: &str) -> Result<String, NotifyError> {
        let (transport, from) = match &self.state {
            State::Ready { transport, from } => (transport, from),
            State::Disabled(reason) => {
                return Err(NotifyError::not_enabled("email", reason));
            }
        };

        let to = recipient
            .trim()
            .parse::<Mailbox>()
            .map_err(|err| NotifyError::InvalidRecipient(format!("{recipient}: {err}")))?;
        let body = truncate_to_limit(message, MESSAGE_LIMIT);
        let email = Message::builder()
            .from(from.clone())
            .to(to.clone())
            .subject(self.subject.clone())
            .body(body)
            .map_err(|err| NotifyError::Configuration(format!("cannot build message: {err}")))?;

        match transport.send(email).await {
            Ok(response) => {
                let code = response.code().to_string();
                tracing::debug!(
                    event = "notification_sent",
                    channel = "email",
                    to = %to,
                    smtp_code = %code,
                    "email accepted by relay"
                );
                Ok(code)
            }
            Err(err) => Err(map_smtp_error(&err)),
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailClient {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn message_limit(&self) -> usize {
        MESSAGE_LIMIT
    }

    async fn send(&self, recipient: &str, message: &str) -> NotificationResult {
        self.dispatch(recipient, message).await.into()
    }
}

fn map_smtp_error(err: &lettre::transport::smtp::Error) -> NotifyError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        return NotifyError::Timeout(REQUEST_TIMEOUT);
    }
    NotifyError::Transport {
        status: 0,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;

    fn live_config() -> EmailConfig {
        EmailConfig {
            smtp_host: Some("smtp.example.com".to_string()),
            username: Some("monitor".to_string()),
            password: Some("secret".to_string()),
            from_address: Some("Zone Monitor <monitor@example.com>".to_string()),
            ..EmailConfig::default()
        }
    }

    #[tokio::test]
    async fn disabled_client_rejects_without_network() {
        let client = EmailClient::new(None);
        let result = client.send("ops@example.com", "hi").await;
        assert!(!result.success);
        assert!(result.error_text().unwrap().contains("not enabled"));
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected_before_transport() {
        let client = EmailClient::new(Some(&live_config()));
        let result = client.send("not-an-address", "hi").await;
        assert!(!result.success);
        assert!(
            matches!(result.error, Some(NotifyError::InvalidRecipient(_))),
            "{:?}",
            result.error
        );
    }

    #[tokio::test]
    async fn bulk_report_isolates_bad_addresses() {
        let client = EmailClient::new(None);
        let report = client
            .send_bulk(
                &["a@example.com".to_string(), "b@example.com".to_string()],
                "hi",
            )
            .await;
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failed(), 2);
        assert!(!report.is_partial());
    }

    #[test]
    fn bulk_report_counts() {
        let report = BulkSendReport {
            outcomes: vec![
                RecipientOutcome {
                    recipient: "a@example.com".to_string(),
                    result: NotificationResult::delivered("250"),
                },
                RecipientOutcome {
                    recipient: "b".to_string(),
                    result: NotificationResult::rejected(NotifyError::InvalidRecipient(
                        "b".to_string(),
                    )),
                },
            ],
        };
        assert_eq!(report.delivered(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.is_partial());
        assert!(!report.all_ok());
    }
}
