//! Application settings, Telegram and MongoDB configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::DEFAULT_GOLD_PER_PILLAGE;

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Bot token issued by `@BotFather`.
    pub bot_token: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("session.db")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String, bot_token: String) -> Self {
        Self {
            api_id,
            api_hash,
            bot_token,
            session_path: default_session_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID`, `TG_API_HASH` and `BOT_TOKEN` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let bot_token =
            std::env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingEnvVar("BOT_TOKEN"))?;

        let session_path = std::env::var("TG_SESSION_PATH")
            .map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
            session_path,
        })
    }
}

/// MongoDB connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,

    /// Database holding the `users` collection.
    pub database: String,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Database to authenticate against, when credentials are given.
    pub auth_source: Option<String>,
}

impl MongoConfig {
    /// Creates configuration from environment variables.
    ///
    /// Expects `MONGO_URI` and `MONGO_DATABASE`; `MONGO_USERNAME`,
    /// `MONGO_PASSWORD` and `MONGO_AUTH_SOURCE` are optional.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let uri = std::env::var("MONGO_URI").map_err(|_| ConfigError::MissingEnvVar("MONGO_URI"))?;
        let database = std::env::var("MONGO_DATABASE")
            .map_err(|_| ConfigError::MissingEnvVar("MONGO_DATABASE"))?;

        if database.trim().is_empty() {
            return Err(ConfigError::EmptyValue("MONGO_DATABASE"));
        }

        Ok(Self {
            uri,
            database,
            username: non_empty_var("MONGO_USERNAME"),
            password: non_empty_var("MONGO_PASSWORD"),
            auth_source: non_empty_var("MONGO_AUTH_SOURCE"),
        })
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Username of the channel users must join during initiation.
    pub channel_id: Option<String>,

    /// URL attached to the invite button on the referrals screen.
    pub invite_url: Option<String>,

    /// Prefix for personal referral links, e.g. `https://t.me/my_bot?start=`.
    #[serde(default = "default_referral_base_url")]
    pub referral_base_url: String,

    /// Directory holding the webp images sent with replies.
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Base gold amount given to new users per claim.
    #[serde(default = "default_gold_per_pillage")]
    pub gold_per_pillage: u64,
}

fn default_referral_base_url() -> String {
    "https://t.me/".to_owned()
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("webp_images")
}

const fn default_gold_per_pillage() -> u64 {
    DEFAULT_GOLD_PER_PILLAGE
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            channel_id: None,
            invite_url: None,
            referral_base_url: default_referral_base_url(),
            images_dir: default_images_dir(),
            gold_per_pillage: default_gold_per_pillage(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            channel_id: non_empty_var("CHANNEL_ID")
                .map(|c| c.trim_start_matches('@').to_owned()),
            invite_url: non_empty_var("INVITE_URL"),
            referral_base_url: non_empty_var("REFERRAL_BASE_URL")
                .unwrap_or_else(default_referral_base_url),
            images_dir: std::env::var("IMAGES_DIR")
                .map_or_else(|_| default_images_dir(), PathBuf::from),
            gold_per_pillage: std::env::var("GOLD_PER_PILLAGE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_gold_per_pillage),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Environment variable {0} must not be empty")]
    EmptyValue(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,
}
