//! Maintenance tool for the shared quest configuration.
//!
//! Edits the common record the bot reads its quest links and campaign
//! launch times from.

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pillage_bot::config::MongoConfig;
use pillage_bot::store::{CommonRecord, CommonUpdate, MongoUserStore, QuestKind, UserStore};

/// Pillage bot quest administration.
#[derive(Parser, Debug)]
#[command(name = "pillage_admin")]
#[command(about = "Manage quest links and campaigns of the pillage bot")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current quest configuration.
    Show,

    /// Set the post the daily quest points to.
    SetTweetLink { url: String },

    /// Set the link of a quest (daily_quest, subscribe_tg_channel, start_another_bot).
    SetLink {
        #[arg(value_parser = parse_quest)]
        quest: QuestKind,
        url: String,
    },

    /// Relaunch a campaign quest so users who completed it can do it again.
    Relaunch {
        #[arg(value_parser = parse_campaign)]
        quest: QuestKind,
    },
}

fn parse_quest(name: &str) -> Result<QuestKind, String> {
    QuestKind::from_name(name).ok_or_else(|| {
        let known: Vec<_> = QuestKind::OFFERED.iter().map(|q| q.name()).collect();
        format!("unknown quest '{name}', expected one of: {}", known.join(", "))
    })
}

fn parse_campaign(name: &str) -> Result<QuestKind, String> {
    match parse_quest(name)? {
        QuestKind::Daily => Err("the daily quest resets on its own and cannot be relaunched".to_owned()),
        quest => Ok(quest),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    match run(args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    let config = MongoConfig::from_env().context("Failed to load MongoDB configuration")?;
    let store = MongoUserStore::connect(&config)
        .await
        .context("Failed to connect to MongoDB")?;

    let update = match command {
        Command::Show => {
            let common = store.get_common().await?.unwrap_or_default();
            print_common(&common);
            return Ok(());
        }
        Command::SetTweetLink { url } => CommonUpdate {
            last_twitter_post_link: Some(url),
            ..CommonUpdate::default()
        },
        Command::SetLink { quest, url } => link_update(quest, url),
        Command::Relaunch { quest } => CommonUpdate {
            relaunch: Some((quest, Utc::now())),
            ..CommonUpdate::default()
        },
    };

    let common = store
        .upsert_common(&update)
        .await
        .context("Failed to update the common record")?;
    println!("✓ Common record updated\n");
    print_common(&common);
    Ok(())
}

fn link_update(quest: QuestKind, url: String) -> CommonUpdate {
    let mut update = CommonUpdate::default();
    match quest {
        QuestKind::Daily => update.last_twitter_post_link = Some(url),
        QuestKind::SubscribeTgChannel => update.channel_link = Some(url),
        QuestKind::StartAnotherBot | QuestKind::Unknown => update.another_bot_link = Some(url),
    }
    update
}

fn print_common(common: &CommonRecord) {
    for quest in QuestKind::OFFERED {
        println!(
            "{:<22} link: {}",
            quest.name(),
            common.quest_link(quest).unwrap_or("(not set)")
        );
    }

    println!("\nCampaigns:");
    if common.quest_types.is_empty() {
        println!("  (none launched)");
    }
    for entry in &common.quest_types {
        let launched = entry
            .update_time
            .map_or_else(|| "never".to_owned(), |at| at.to_rfc3339());
        println!("  {:<20} launched: {}", entry.kind.name(), launched);
    }
}
