//! Configuration loading and validation.
//!
//! All settings come from the environment. `Config::from_env` is called once
//! at startup; a missing required key fails the process before the gateway
//! connection is attempted.

use crate::error::{ConfigError, Result};
use serenity::model::id::{ChannelId, GuildId};
use std::path::PathBuf;

/// Rooivalk configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token.
    pub discord_token: String,

    /// The single guild this bot serves. Events from other guilds are ignored.
    pub guild_id: GuildId,

    /// Channel for the startup greeting and scheduled announcements.
    pub startup_channel_id: Option<ChannelId>,

    /// Channel whose messages use the learn persona.
    pub learn_channel_id: Option<ChannelId>,

    /// Emoji name that triggers reaction-based reprocessing.
    pub trigger_emoji: String,

    /// Path to the canned-response catalogue file (TOML, hot-reloaded).
    pub responses_path: PathBuf,

    /// LLM backend settings.
    pub llm: LlmConfig,

    /// Scheduled-greeting settings.
    pub greeting: GreetingConfig,
}

/// LLM backend configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key for the OpenAI-compatible backend.
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,

    /// Model used for the default persona.
    pub model: String,

    /// Model used for the learn persona.
    pub learn_model: String,
}

/// Scheduled-greeting configuration.
#[derive(Debug, Clone)]
pub struct GreetingConfig {
    /// Cron expression for the morning greeting (seconds-resolution field set).
    pub schedule: String,

    /// IANA timezone the schedule is evaluated in.
    pub timezone: String,

    /// Coordinates for the weather summary, if any.
    pub coordinates: Option<(f64, f64)>,
}

fn required(key: &'static str) -> std::result::Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingKey(key))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_channel_id(key: &'static str) -> std::result::Result<Option<ChannelId>, ConfigError> {
    match optional(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(|id| Some(ChannelId::new(id)))
            .map_err(|e| ConfigError::InvalidValue {
                key,
                reason: e.to_string(),
            }),
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let discord_token = required("DISCORD_TOKEN")?;

        let guild_id = required("ROOIVALK_GUILD_ID")?
            .parse::<u64>()
            .map(GuildId::new)
            .map_err(|e| ConfigError::InvalidValue {
                key: "ROOIVALK_GUILD_ID",
                reason: e.to_string(),
            })?;

        let startup_channel_id = parse_channel_id("ROOIVALK_STARTUP_CHANNEL_ID")?;
        let learn_channel_id = parse_channel_id("ROOIVALK_LEARN_CHANNEL_ID")?;

        let trigger_emoji =
            optional("ROOIVALK_TRIGGER_EMOJI").unwrap_or_else(|| "rooivalk".into());

        let responses_path = optional("ROOIVALK_RESPONSES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("responses.toml"));

        let model = optional("ROOIVALK_MODEL").unwrap_or_else(|| "gpt-4o".into());
        let llm = LlmConfig {
            api_key: required("OPENAI_API_KEY")?,
            base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".into()),
            learn_model: optional("ROOIVALK_LEARN_MODEL").unwrap_or_else(|| model.clone()),
            model,
        };

        let coordinates = match (
            optional("ROOIVALK_WEATHER_LAT"),
            optional("ROOIVALK_WEATHER_LON"),
        ) {
            (Some(lat), Some(lon)) => {
                let lat = lat.parse::<f64>().map_err(|e| ConfigError::InvalidValue {
                    key: "ROOIVALK_WEATHER_LAT",
                    reason: e.to_string(),
                })?;
                let lon = lon.parse::<f64>().map_err(|e| ConfigError::InvalidValue {
                    key: "ROOIVALK_WEATHER_LON",
                    reason: e.to_string(),
                })?;
                Some((lat, lon))
            }
            _ => None,
        };

        let greeting = GreetingConfig {
            schedule: optional("ROOIVALK_GREETING_CRON").unwrap_or_else(|| "0 0 7 * * *".into()),
            timezone: optional("ROOIVALK_TIMEZONE").unwrap_or_else(|| "UTC".into()),
            coordinates,
        };

        Ok(Self {
            discord_token,
            guild_id,
            startup_channel_id,
            learn_channel_id,
            trigger_emoji,
            responses_path,
            llm,
            greeting,
        })
    }
}
