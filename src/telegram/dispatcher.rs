//! Update loop: one task per incoming update.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use grammers_client::UpdateStream;
use grammers_client::types::Peer;
use grammers_client::update::{CallbackQuery, Message, Update};
use tracing::{debug, error, info, warn};

use super::{ChannelMembership, TelegramBot, TelegramError};
use crate::commands::{ConversationHandler, Sender};

/// Routes updates from the bot session to the conversation handler.
pub struct Dispatcher {
    bot: Arc<TelegramBot>,
    handler: Arc<ConversationHandler>,
    membership: Option<Arc<ChannelMembership>>,
}

impl Dispatcher {
    /// Creates a dispatcher. `membership` is fed the access hashes of users
    /// seen in updates so it can address them later.
    #[must_use]
    pub fn new(
        bot: Arc<TelegramBot>,
        handler: Arc<ConversationHandler>,
        membership: Option<Arc<ChannelMembership>>,
    ) -> Self {
        Self {
            bot,
            handler,
            membership,
        }
    }

    /// Receives updates until the task is cancelled. Each update is handled
    /// in its own task; a failing update is logged and does not stop the
    /// loop. Stream errors are retried with a growing delay.
    pub async fn run(self: Arc<Self>, mut updates: UpdateStream) {
        info!("Listening for updates");
        let mut failures = 0_u32;
        loop {
            let update = match updates.next().await {
                Ok(update) => update,
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = retry_delay(failures);
                    error!(
                        "Update stream error ({} in a row), retrying in {}s: {}",
                        failures,
                        delay.as_secs(),
                        TelegramError::from(e)
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };
            if failures > 0 {
                info!("Update stream recovered after {} failures", failures);
                failures = 0;
            }

            let this = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = this.handle_update(update).await {
                    error!("Failed to process update: {:#}", e);
                }
            });
        }
    }

    async fn handle_update(&self, update: Update) -> anyhow::Result<()> {
        match update {
            Update::NewMessage(message) if !message.outgoing() => self.on_message(message).await,
            Update::CallbackQuery(query) => self.on_callback(query).await,
            _ => Ok(()),
        }
    }

    async fn on_message(&self, message: Message) -> anyhow::Result<()> {
        let Some(peer) = message.sender() else {
            return Ok(());
        };
        let Some(sender) = self.identify(&peer) else {
            return Ok(());
        };
        let text = message.text();
        if text.is_empty() {
            return Ok(());
        }

        let Some(response) = self.handler.handle_message(&sender, text, Utc::now()).await else {
            debug!("Ignoring message from user {}", sender.id);
            return Ok(());
        };
        self.bot
            .deliver(&message, &response)
            .await
            .with_context(|| format!("Failed to reply to user {}", sender.id))
    }

    async fn on_callback(&self, query: CallbackQuery) -> anyhow::Result<()> {
        let sender = self.identify(query.sender());
        let data: Cow<'_, str> = String::from_utf8_lossy(query.data());

        let response = match &sender {
            Some(sender) => self.handler.handle_callback(sender, &data, Utc::now()).await,
            None => None,
        };

        if let Err(e) = query.answer().send().await {
            warn!("Could not answer callback query: {}", e);
        }

        let (Some(sender), Some(response)) = (sender, response) else {
            return Ok(());
        };
        let origin = query
            .load_message()
            .await
            .with_context(|| format!("Failed to load callback message of user {}", sender.id))?;
        self.bot
            .deliver(&origin, &response)
            .await
            .with_context(|| format!("Failed to answer callback '{}' of user {}", data, sender.id))
    }

    /// Builds the sender of an update. Only users are served.
    fn identify(&self, peer: &Peer) -> Option<Sender> {
        let Peer::User(user) = peer else {
            return None;
        };
        let raw = &user.raw;
        if let Some(membership) = &self.membership {
            membership.remember_user(raw.id, raw.access_hash);
        }
        Some(Sender::new(raw.id, raw.lang_code.clone()))
    }
}

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Delay before reading the update stream again after `failures`
/// consecutive errors: 1s, doubling up to a minute.
fn retry_delay(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(6);
    Duration::from_secs(1 << exponent).min(MAX_RETRY_DELAY)
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handler", &self.handler)
            .field("checks_membership", &self.membership.is_some())
            .finish_non_exhaustive()
    }
}
