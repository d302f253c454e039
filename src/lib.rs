//! Pillage Bot Library
//!
//! A Telegram bot where users claim gold on a cooldown, recruit friends
//! through referral links and complete quests for bonus rewards.
//!
//! This crate provides:
//! - Reward, referral and quest rules (`game`)
//! - User persistence in MongoDB or memory (`store`)
//! - Localized texts (`i18n`)
//! - Conversation handling (`commands`) and the Telegram transport (`telegram`)

pub mod commands;
pub mod config;
pub mod game;
pub mod i18n;
pub mod store;
pub mod telegram;
