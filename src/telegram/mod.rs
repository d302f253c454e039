//! Telegram transport.
//!
//! Bot session over `MTProto`, the update loop feeding the conversation
//! handler, and channel membership checks.

mod client;
mod dispatcher;
mod gate;

pub use client::{TelegramBot, TelegramError};
pub use dispatcher::Dispatcher;
pub use gate::ChannelMembership;
pub use grammers_client::UpdateStream;
