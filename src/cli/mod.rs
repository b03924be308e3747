use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::config::Config;
use crate::notifications::alert::AlertSummary;
use crate::notifications::channel::{ChannelKind, NotificationChannel, NotificationResult};
use crate::notifications::email::EmailClient;
use crate::notifications::sms::SmsClient;
use crate::notifications::whatsapp::WhatsAppClient;
use crate::zones::client::ZoneApiClient;
use crate::zones::snapshot;

const USAGE: &str = "\
zonewatch - music zone monitoring diagnostics

USAGE:
    zonewatch [--config <path>] <command>

COMMANDS:
    send <channel> <recipient> <message...>    send a test message (channel: whatsapp|email|sms)
    alert <channel> <recipient> <entity> <offline> <expired> <unpaired>
                                               send a formatted status alert
    discover                                   enumerate zones visible to the configured account
    diff <previous-file>                       discover and diff against a newline-separated id list
    config                                     show per-channel enablement
";

#[derive(Debug)]
pub enum Command {
    Send {
        channel: ChannelKind,
        recipient: String,
        message: String,
        force: bool,
    },
    Alert {
        channel: ChannelKind,
        recipient: String,
        entity: String,
        summary: AlertSummary,
    },
    Discover,
    Diff {
        previous_file: PathBuf,
    },
    ShowConfig,
}

#[derive(Debug)]
pub struct Cli {
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

pub fn parse(args: &[String]) -> Result<Cli> {
    let mut config_path = None;
    let mut force = false;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().context("--config requires a path")?;
                config_path = Some(PathBuf::from(value));
            }
            "--force" => force = true,
            "--help" | "-h" => bail!("{USAGE}"),
            _ => rest.push(arg.clone()),
        }
    }

    let Some(command) = rest.first() else {
        bail!("{USAGE}");
    };
    let command = match command.as_str() {
        "send" => {
            let [_, channel, recipient, message @ ..] = rest.as_slice() else {
                bail!("usage: zonewatch send <channel> <recipient> <message...>");
            };
            if message.is_empty() {
                bail!("usage: zonewatch send <channel> <recipient> <message...>");
            }
            Command::Send {
                channel: parse_channel(channel)?,
                recipient: recipient.clone(),
                message: message.join(" "),
                force,
            }
        }
        "alert" => {
            let [_, channel, recipient, entity, offline, expired, unpaired] = rest.as_slice()
            else {
                bail!(
                    "usage: zonewatch alert <channel> <recipient> <entity> <offline> <expired> <unpaired>"
                );
            };
            Command::Alert {
                channel: parse_channel(channel)?,
                recipient: recipient.clone(),
                entity: entity.clone(),
                summary: AlertSummary {
                    offline: parse_count(offline)?,
                    expired: parse_count(expired)?,
                    unpaired: parse_count(unpaired)?,
                },
            }
        }
        "discover" => Command::Discover,
        "diff" => {
            let [_, previous_file] = rest.as_slice() else {
                bail!("usage: zonewatch diff <previous-file>");
            };
            Command::Diff {
                previous_file: PathBuf::from(previous_file),
            }
        }
        "config" => Command::ShowConfig,
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    };

    Ok(Cli {
        config_path,
        command,
    })
}

fn parse_channel(name: &str) -> Result<ChannelKind> {
    match name {
        "whatsapp" => Ok(ChannelKind::Whatsapp),
        "email" => Ok(ChannelKind::Email),
        "sms" => Ok(ChannelKind::Sms),
        other => bail!("unknown channel '{other}' (expected whatsapp, email or sms)"),
    }
}

fn parse_count(value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .with_context(|| format!("expected a count, got '{value}'"))
}

fn build_channel(kind: ChannelKind, config: &Config) -> Box<dyn NotificationChannel> {
    match kind {
        ChannelKind::Whatsapp => Box::new(WhatsAppClient::new(config.whatsapp.as_ref())),
        ChannelKind::Email => Box::new(EmailClient::new(config.email.as_ref())),
        ChannelKind::Sms => Box::new(SmsClient::new(config.sms.as_ref())),
    }
}

pub async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Send {
            channel,
            recipient,
            message,
            force,
        } => {
            let result = if channel == ChannelKind::Sms {
                SmsClient::new(config.sms.as_ref())
                    .send_with_force(&recipient, &message, force)
                    .await
            } else {
                build_channel(channel, config).send(&recipient, &message).await
            };
            report_result(channel, &recipient, &result);
            if !result.success {
                bail!("send failed");
            }
            Ok(())
        }
        Command::Alert {
            channel,
            recipient,
            entity,
            summary,
        } => {
            let client = build_channel(channel, config);
            let message = client.format_alert(&entity, &summary);
            let result = client.send(&recipient, &message).await;
            report_result(channel, &recipient, &result);
            if !result.success {
                bail!("alert failed");
            }
            Ok(())
        }
        Command::Discover => {
            let client = ZoneApiClient::new(config.zones.as_ref())?;
            let discovery = client.discover_all().await;
            for zone in &discovery.zones {
                println!("{zone}");
            }
            print_failures(&discovery.failures);
            Ok(())
        }
        Command::Diff { previous_file } => {
            let raw = std::fs::read_to_string(&previous_file)
                .with_context(|| format!("cannot read {}", previous_file.display()))?;
            let previous: BTreeSet<String> = raw
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            let client = ZoneApiClient::new(config.zones.as_ref())?;
            let discovery = client.discover_all().await;
            let diff = snapshot::diff(&previous, &discovery.zones);
            for zone in &diff.added {
                println!("+ {zone}");
            }
            for zone in &diff.removed {
                println!("- {zone}");
            }
            if diff.is_empty() {
                println!("no changes ({} zones)", discovery.zones.len());
            }
            print_failures(&discovery.failures);
            Ok(())
        }
        Command::ShowConfig => {
            print_channel_state("whatsapp", config.whatsapp.as_ref().map(|c| c.disabled_reason()));
            print_channel_state("email", config.email.as_ref().map(|c| c.disabled_reason()));
            print_channel_state("sms", config.sms.as_ref().map(|c| c.disabled_reason()));
            print_channel_state("zones", config.zones.as_ref().map(|c| c.disabled_reason()));
            Ok(())
        }
    }
}

fn print_channel_state(name: &str, state: Option<Option<String>>) {
    match state {
        None => println!("{name}: not configured"),
        Some(None) => println!("{name}: enabled"),
        Some(Some(reason)) => println!("{name}: disabled ({reason})"),
    }
}

fn report_result(channel: ChannelKind, recipient: &str, result: &NotificationResult) {
    if result.success {
        println!(
            "{channel}: delivered to {recipient} (id: {})",
            result.id.as_deref().unwrap_or("-")
        );
    } else {
        println!(
            "{channel}: failed for {recipient}: {}",
            result.error_text().unwrap_or_else(|| "unknown error".to_string())
        );
    }
}

fn print_failures(failures: &[crate::zones::client::AccountFailure]) {
    for failure in failures {
        match &failure.account_id {
            Some(account_id) => eprintln!("warning: account {account_id} skipped: {}", failure.message),
            None => eprintln!("error: discovery failed: {}", failure.message),
        }
    }
}
