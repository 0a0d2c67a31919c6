use std::time::Duration;

use anyhow::{bail, Result};
use tracing::warn;

const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const ENV_WEBHOOK_URL: &str = "N8N_WEBHOOK_URL";
const ENV_BOT_TOKEN_TVO: &str = "TELEGRAM_BOT_TOKEN_TVO";
const ENV_WEBHOOK_URL_TVO: &str = "N8N_WEBHOOK_URL_TVO";
const ENV_WEBHOOK_TIMEOUT_SECS: &str = "WEBHOOK_TIMEOUT_SECS";
const ENV_COMMAND_HONOR_REPLY: &str = "COMMAND_HONOR_REPLY";

const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;
const MIN_WEBHOOK_TIMEOUT_SECS: u64 = 1;

/// One bot credential bound to one webhook target.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    pub bot_token: String,
    pub webhook_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Sessions in start order, primary first.
    pub sessions: Vec<SessionConfig>,
    pub webhook_timeout: Duration,
    /// When set, command handlers honor the webhook `reply` field instead
    /// of always answering with the fixed welcome text.
    pub honor_command_reply: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Missing or
    /// half-configured credentials abort here, before any session exists.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let bot_token = require(&lookup, ENV_BOT_TOKEN)?;
        let webhook_url = require(&lookup, ENV_WEBHOOK_URL)?;
        let mut sessions = vec![SessionConfig {
            name: "Primary Bot".to_string(),
            bot_token,
            webhook_url,
        }];

        match (lookup(ENV_BOT_TOKEN_TVO), lookup(ENV_WEBHOOK_URL_TVO)) {
            (Some(bot_token), Some(webhook_url)) => sessions.push(SessionConfig {
                name: "TVO Bot".to_string(),
                bot_token,
                webhook_url,
            }),
            (None, None) => {}
            _ => bail!("{ENV_BOT_TOKEN_TVO} and {ENV_WEBHOOK_URL_TVO} must be set together"),
        }

        let webhook_timeout = webhook_timeout(&lookup);

        let honor_command_reply = lookup(ENV_COMMAND_HONOR_REPLY)
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Config {
            sessions,
            webhook_timeout,
            honor_command_reply,
        })
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match lookup(key) {
        Some(value) => Ok(value),
        None => bail!("{key} not found in environment variables"),
    }
}

fn webhook_timeout(lookup: &impl Fn(&str) -> Option<String>) -> Duration {
    let default = Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS);

    match lookup(ENV_WEBHOOK_TIMEOUT_SECS) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs >= MIN_WEBHOOK_TIMEOUT_SECS => Duration::from_secs(secs),
            Ok(secs) => {
                warn!(
                    "{ENV_WEBHOOK_TIMEOUT_SECS}={secs} is below minimum ({MIN_WEBHOOK_TIMEOUT_SECS}), using default"
                );
                default
            }
            Err(_) => {
                warn!("{ENV_WEBHOOK_TIMEOUT_SECS}={raw:?} is not a valid integer, using default");
                default
            }
        },
        None => default,
    }
}
