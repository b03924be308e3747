mod common;

use std::sync::Arc;

use zonewatch::config::{Config, SmsConfig, WhatsAppConfig};
use zonewatch::notifications::alert::AlertSummary;
use zonewatch::notifications::channel::{ChannelKind, NotificationChannel};
use zonewatch::notifications::email::EmailClient;
use zonewatch::notifications::error::NotifyError;
use zonewatch::notifications::sms::SmsClient;
use zonewatch::notifications::whatsapp::WhatsAppClient;

fn disabled_config() -> Config {
    toml::from_str(
        r#"
        [whatsapp]
        enabled = false
        access_token = "token"
        phone_number_id = "12345"

        [email]
        enabled = false
        smtp_host = "smtp.example.com"
        username = "monitor"
        password = "secret"
        from_address = "monitor@example.com"

        [sms]
        enabled = false
        account_sid = "AC123"
        auth_token = "secret"
        from_number = "+15005550006"
        "#,
    )
    .expect("valid test config")
}

#[tokio::test]
async fn every_disabled_channel_reports_configuration_error() {
    let config = disabled_config();
    let channels: Vec<Box<dyn NotificationChannel>> = vec![
        Box::new(WhatsAppClient::new(config.whatsapp.as_ref())),
        Box::new(EmailClient::new(config.email.as_ref())),
        Box::new(SmsClient::new(config.sms.as_ref())),
    ];
    for channel in channels {
        let recipient = match channel.kind() {
            ChannelKind::Email => "ops@example.com",
            _ => "+1234567890",
        };
        let result = channel.send(recipient, "hi").await;
        assert!(!result.success, "{} should refuse", channel.kind());
        let error = result.error.expect("error value");
        assert!(error.is_configuration(), "{error:?}");
        assert!(error.to_string().contains("not enabled"), "{error}");
    }
}

#[tokio::test]
async fn missing_credentials_disable_a_channel_with_a_named_reason() {
    let config = WhatsAppConfig {
        enabled: Some(true),
        access_token: Some("token".to_string()),
        ..WhatsAppConfig::default()
    };
    let client = WhatsAppClient::new(Some(&config));
    let result = client.send("+1234567890", "hi").await;
    assert!(!result.success);
    assert!(
        result.error_text().unwrap().contains("missing phone_number_id"),
        "{:?}",
        result.error_text()
    );
}

#[tokio::test]
async fn whatsapp_send_round_trip_against_stub() {
    let base_url = common::spawn_stub(Arc::new(|body: &str| {
        assert!(body.contains("\"messaging_product\":\"whatsapp\""));
        assert!(body.contains("\"to\":\"+14155550100\""));
        (
            200,
            r#"{"messaging_product":"whatsapp","messages":[{"id":"wamid.STUB"}]}"#.to_string(),
        )
    }))
    .await;
    let config = WhatsAppConfig {
        access_token: Some("token".to_string()),
        phone_number_id: Some("12345".to_string()),
        base_url: Some(base_url),
        ..WhatsAppConfig::default()
    };
    let client = WhatsAppClient::new(Some(&config));
    // 10-digit input exercises the +1 normalization before transport.
    let result = client.send("4155550100", "zone check").await;
    assert!(result.success, "{:?}", result.error_text());
    assert_eq!(result.id.as_deref(), Some("wamid.STUB"));
}

#[tokio::test]
async fn whatsapp_transport_error_carries_provider_message() {
    let base_url = common::spawn_stub(Arc::new(|_: &str| {
        (
            401,
            r#"{"error":{"message":"Invalid OAuth access token","code":190}}"#.to_string(),
        )
    }))
    .await;
    let config = WhatsAppConfig {
        access_token: Some("bad".to_string()),
        phone_number_id: Some("12345".to_string()),
        base_url: Some(base_url),
        ..WhatsAppConfig::default()
    };
    let client = WhatsAppClient::new(Some(&config));
    let result = client.send("+14155550100", "zone check").await;
    assert!(!result.success);
    match result.error {
        Some(NotifyError::Transport { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("Invalid OAuth access token"));
            assert!(message.contains("190"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn sms_send_round_trip_against_stub() {
    let base_url = common::spawn_stub(Arc::new(|body: &str| {
        assert!(body.contains("To=%2B14155550100"));
        assert!(body.contains("From=%2B15005550006"));
        (201, r#"{"sid":"SM123","status":"queued"}"#.to_string())
    }))
    .await;
    let config = SmsConfig {
        account_sid: Some("AC123".to_string()),
        auth_token: Some("secret".to_string()),
        from_number: Some("+15005550006".to_string()),
        base_url: Some(base_url),
        ..SmsConfig::default()
    };
    let client = SmsClient::new(Some(&config));
    let result = client.send("4155550100", "zone check").await;
    assert!(result.success, "{:?}", result.error_text());
    assert_eq!(result.id.as_deref(), Some("SM123"));
}

#[tokio::test]
async fn sms_quiet_hours_suppress_without_force() {
    // Pin the window to the current UTC hour so the gate trips no matter
    // when the test runs. No stub server: a suppressed send never reaches
    // the network.
    use chrono::Timelike;
    let hour = chrono::Utc::now().hour();
    let config = SmsConfig {
        account_sid: Some("AC123".to_string()),
        auth_token: Some("secret".to_string()),
        from_number: Some("+15005550006".to_string()),
        quiet_start_hour: Some(hour),
        quiet_end_hour: Some((hour + 1) % 24),
        ..SmsConfig::default()
    };
    let client = SmsClient::new(Some(&config));
    assert!(!client.should_send_critical_sms(false));
    assert!(client.should_send_critical_sms(true));

    let result = client.send("+14155550100", "hi").await;
    assert!(!result.success);
    assert!(result.error_text().unwrap().contains("quiet hours"));
}

#[test]
fn alert_formatting_respects_channel_limits() {
    let summary = AlertSummary {
        offline: 4,
        expired: 2,
        unpaired: 7,
    };
    let sms = SmsClient::new(None);
    let text = sms.format_alert("Acme Coffee Downtown", &summary);
    assert!(text.chars().count() <= sms.message_limit());
    assert!(text.contains("4 zones offline"));
    assert!(text.contains("2 subscriptions expired"));
    assert!(text.contains("7 devices unpaired"));
}
