//! Configuration module for the pillage bot.
//!
//! Handles loading of Telegram credentials, MongoDB connection settings
//! and gameplay settings from the environment.

mod settings;

pub use settings::{BotSettings, ConfigError, MongoConfig, TelegramConfig};

/// Gold credited per claim to newly created users unless overridden.
pub const DEFAULT_GOLD_PER_PILLAGE: u64 = 100;
