//! Pillage Bot - Main Entry Point
//!
//! A Telegram bot where raiders claim gold every few hours, recruit friends
//! and complete quests for bonus rewards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

use pillage_bot::commands::{ChannelGate, ConversationHandler, OpenGate};
use pillage_bot::config::{BotSettings, MongoConfig, TelegramConfig};
use pillage_bot::game::GameService;
use pillage_bot::store::{InMemoryUserStore, MongoUserStore, UserStore};
use pillage_bot::telegram::{ChannelMembership, Dispatcher, TelegramBot};

/// Telegram bot with time-gated gold claims, referrals and quests.
#[derive(Parser, Debug)]
#[command(name = "pillage_bot")]
#[command(about = "Run the pillage Telegram bot")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Also write warnings and errors to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Keep users in memory instead of MongoDB. State is lost on exit.
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;
    let settings = BotSettings::from_env_with_defaults();

    let store: Arc<dyn UserStore> = if args.memory_store {
        warn!("Using in-memory store, users will be lost on exit");
        Arc::new(InMemoryUserStore::new())
    } else {
        let mongo_config = MongoConfig::from_env()
            .context("Failed to load MongoDB configuration from environment")?;
        Arc::new(
            MongoUserStore::connect(&mongo_config)
                .await
                .context("Failed to connect to MongoDB")?,
        )
    };

    let game = Arc::new(GameService::new(store, settings.gold_per_pillage));

    let (bot, updates) = TelegramBot::connect(&tg_config)
        .await
        .context("Failed to connect to Telegram")?;
    let bot = Arc::new(bot);

    let membership = settings
        .channel_id
        .as_deref()
        .map(|channel| Arc::new(ChannelMembership::new(Arc::clone(&bot), channel)));
    let gate: Arc<dyn ChannelGate> = match &membership {
        Some(membership) => Arc::clone(membership) as Arc<dyn ChannelGate>,
        None => {
            warn!("CHANNEL_ID is not set, initiation and channel quests pass without a check");
            Arc::new(OpenGate)
        }
    };

    info!(
        "Starting pillage bot (images: {}, gold per pillage: {})",
        settings.images_dir.display(),
        settings.gold_per_pillage
    );

    let handler = Arc::new(ConversationHandler::new(game, settings, gate));
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&bot), handler, membership));

    info!("Bot is running. Use Ctrl+C to stop.");

    tokio::select! {
        () = dispatcher.run(updates) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    bot.disconnect();
    Ok(())
}

/// Initializes the logging subsystem.
///
/// The returned guard flushes the log file on drop and must be kept alive.
fn init_logging(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = tracing_subscriber::fmt::layer().with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(LevelFilter::WARN);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    Ok(guard)
}
