use std::time::Duration;

/// Failure taxonomy for a single notification attempt. Every variant is a
/// value handed back to the caller; channel clients never propagate transport
/// faults past the `send` boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    #[error("{0}")]
    Configuration(String),
    #[error("provider rejected request (status {status}): {message}")]
    Transport { status: u16, message: String },
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
}

impl NotifyError {
    pub fn not_enabled(channel: &str, reason: &str) -> Self {
        NotifyError::Configuration(format!("{channel} channel is not enabled: {reason}"))
    }

    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return NotifyError::Timeout(timeout);
        }
        let status = err.status().map(|code| code.as_u16()).unwrap_or(0);
        NotifyError::Transport {
            status,
            message: err.to_string(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, NotifyError::Configuration(_))
    }
}
