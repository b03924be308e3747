use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Root configuration, read once at startup and passed by reference to every
/// client constructor. Nothing in the crate mutates it afterwards.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub whatsapp: Option<WhatsAppConfig>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub sms: Option<SmsConfig>,
    #[serde(default)]
    pub zones: Option<ZonesConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WhatsAppConfig {
    pub enabled: Option<bool>,
    pub access_token: Option<String>,
    pub phone_number_id: Option<String>,
    /// Graph API root; overridable so tests can point at a local stub.
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EmailConfig {
    pub enabled: Option<bool>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SmsConfig {
    pub enabled: Option<bool>,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub base_url: Option<String>,
    /// Quiet hours suppress non-forced sends; the window may wrap midnight.
    pub quiet_start_hour: Option<u32>,
    pub quiet_end_hour: Option<u32>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ZonesConfig {
    pub endpoint: Option<String>,
    /// Pre-encoded base64 token, inserted verbatim into the Basic auth header.
    pub api_token: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl WhatsAppConfig {
    pub fn disabled_reason(&self) -> Option<String> {
        if self.enabled == Some(false) {
            return Some("disabled in configuration".to_string());
        }
        if self.access_token.as_deref().unwrap_or("").is_empty() {
            return Some("missing access_token".to_string());
        }
        if self.phone_number_id.as_deref().unwrap_or("").is_empty() {
            return Some("missing phone_number_id".to_string());
        }
        None
    }
}

impl EmailConfig {
    pub fn disabled_reason(&self) -> Option<String> {
        if self.enabled == Some(false) {
            return Some("disabled in configuration".to_string());
        }
        if self.smtp_host.as_deref().unwrap_or("").is_empty() {
            return Some("missing smtp_host".to_string());
        }
        if self.username.as_deref().unwrap_or("").is_empty() {
            return Some("missing username".to_string());
        }
        if self.password.as_deref().unwrap_or("").is_empty() {
            return Some("missing password".to_string());
        }
        if self.from_address.as_deref().unwrap_or("").is_empty() {
            return Some("missing from_address".to_string());
        }
        None
    }
}

impl SmsConfig {
    pub fn disabled_reason(&self) -> Option<String> {
        if self.enabled == Some(false) {
            return Some("disabled in configuration".to_string());
        }
        if self.account_sid.as_deref().unwrap_or("").is_empty() {
            return Some("missing account_sid".to_string());
        }
        if self.auth_token.as_deref().unwrap_or("").is_empty() {
            return Some("missing auth_token".to_string());
        }
        if self.from_number.as_deref().unwrap_or("").is_empty() {
            return Some("missing from_number".to_string());
        }
        None
    }
}

impl ZonesConfig {
    pub fn disabled_reason(&self) -> Option<String> {
        if self.endpoint.as_deref().unwrap_or("").is_empty() {
            return Some("missing endpoint".to_string());
        }
        if self.api_token.as_deref().unwrap_or("").is_empty() {
            return Some("missing api_token".to_string());
        }
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// `~/.config/zonewatch/config.toml`, or the bare filename when no home
    /// directory is resolvable.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("zonewatch").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|logging| logging.level.as_deref())
            .unwrap_or("info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_channel_sections() {
        let config: Config = toml::from_str(
            r#"
            [whatsapp]
            access_token = "token"
            phone_number_id = "12345"

            [sms]
            enabled = false
            account_sid = "AC123"
            auth_token = "secret"
            from_number = "+15005550006"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert!(config.whatsapp.as_ref().unwrap().disabled_reason().is_none());
        assert_eq!(
            config.sms.as_ref().unwrap().disabled_reason().as_deref(),
            Some("disabled in configuration")
        );
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn enabled_flag_does_not_override_missing_credentials() {
        let config: WhatsAppConfig = toml::from_str("enabled = true").unwrap();
        assert_eq!(
            config.disabled_reason().as_deref(),
            Some("missing access_token")
        );
    }

    #[test]
    fn empty_config_reports_default_level() {
        let config = Config::default();
        assert_eq!(config.log_level(), "info");
        assert!(config.whatsapp.is_none());
    }
}
