//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Which transport the bot listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Telegram,
    Cli,
}

/// Bot configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token. Unused when running on the CLI channel.
    pub bot_token: Option<SecretString>,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Path to the personal-data policy document sent before the consent prompt.
    pub policy_document: PathBuf,
    /// Transport to run.
    pub channel: ChannelKind,
}

impl BotConfig {
    /// Build a config from `BAKEBOT_*` environment variables.
    ///
    /// `BAKEBOT_TG_TOKEN` is required unless `BAKEBOT_CHANNEL=cli`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let channel = match std::env::var("BAKEBOT_CHANNEL").as_deref() {
            Ok("cli") => ChannelKind::Cli,
            Ok("telegram") | Err(_) => ChannelKind::Telegram,
            Ok(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "BAKEBOT_CHANNEL".into(),
                    message: format!("unknown channel \"{other}\" (expected telegram or cli)"),
                });
            }
        };

        let bot_token = match std::env::var("BAKEBOT_TG_TOKEN") {
            Ok(token) => Some(SecretString::from(token)),
            Err(_) if channel == ChannelKind::Cli => None,
            Err(_) => return Err(ConfigError::MissingEnvVar("BAKEBOT_TG_TOKEN".into())),
        };

        let db_path = std::env::var("BAKEBOT_DB_PATH")
            .unwrap_or_else(|_| "./data/bakebot.db".to_string())
            .into();

        let policy_document = std::env::var("BAKEBOT_POLICY_DOC")
            .unwrap_or_else(|_| "./files/personal_data_policy.pdf".to_string())
            .into();

        Ok(Self {
            bot_token,
            db_path,
            policy_document,
            channel,
        })
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            db_path: "./data/bakebot.db".into(),
            policy_document: "./files/personal_data_policy.pdf".into(),
            channel: ChannelKind::Cli,
        }
    }
}
