//! Telegram bot session and reply delivery.

use std::sync::Arc;

use grammers_client::update::Message;
use grammers_client::{
    Client, InputMessage, InvocationError, SenderPool, UpdateStream, UpdatesConfiguration, button,
    reply_markup, sender,
};
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::commands::{InlineButton, Keyboard, Reply, Response};
use crate::config::TelegramConfig;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Bot sign in failed: {0}")]
    SignInFailed(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Failed to upload {path}: {source}")]
    Upload {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Channel @{0} could not be resolved")]
    ChannelNotFound(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        let err_str = err.to_string();

        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];
    let lowered = err_msg.to_lowercase();

    for pattern in patterns {
        if let Some(idx) = lowered.find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = lowered[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Bot session over `MTProto`.
pub struct TelegramBot {
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram, signs in with the bot token if the session is
    /// not yet authorized, and opens the update stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened, the connection
    /// fails or the token is rejected.
    pub async fn connect(config: &TelegramConfig) -> Result<(Self, UpdateStream), TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        if is_authorized {
            info!("Reusing authorized bot session");
        } else {
            info!("Signing in with bot token...");
            client
                .bot_sign_in(&config.bot_token, &config.api_hash)
                .await
                .map_err(|e| TelegramError::SignInFailed(e.to_string()))?;
            info!("Bot signed in");
        }

        let stream = client.stream_updates(
            updates,
            UpdatesConfiguration {
                catch_up: false,
                ..Default::default()
            },
        );

        Ok((
            Self {
                client,
                handle: handle.thin,
                _pool_task: pool_task,
            },
            stream,
        ))
    }

    /// Sends every reply of `response` into the chat of `origin`, then
    /// deletes `origin` if requested.
    ///
    /// # Errors
    ///
    /// Returns an error if uploading or sending fails. Replies sent before
    /// the failure stay sent.
    pub async fn deliver(&self, origin: &Message, response: &Response) -> Result<(), TelegramError> {
        for reply in &response.replies {
            let input = self.build_message(reply).await?;
            origin.respond(input).await?;
        }

        if response.delete_origin {
            debug!("Deleting message {}", origin.id());
            if let Err(e) = origin.delete().await {
                warn!("Could not delete message {}: {}", origin.id(), e);
            }
        }
        Ok(())
    }

    async fn build_message(&self, reply: &Reply) -> Result<InputMessage, TelegramError> {
        let mut input = InputMessage::html(&reply.text);

        if let Some(path) = &reply.image {
            let uploaded =
                self.client
                    .upload_file(path)
                    .await
                    .map_err(|source| TelegramError::Upload {
                        path: path.display().to_string(),
                        source,
                    })?;
            input = input.photo(uploaded);
        }

        match &reply.keyboard {
            Some(Keyboard::Inline(rows)) => {
                let rows = rows
                    .iter()
                    .map(|row| row.iter().map(inline_button).collect())
                    .collect();
                input = input.reply_markup(&reply_markup::inline(rows));
            }
            Some(Keyboard::Reply(rows)) => {
                let rows = rows
                    .iter()
                    .map(|row| row.iter().map(|label| button::text(label)).collect())
                    .collect();
                input = input.reply_markup(&reply_markup::keyboard(rows).fit_size());
            }
            None => {}
        }

        Ok(input)
    }

    /// Invokes a raw API function.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn invoke<R: tl::RemoteCall>(&self, request: &R) -> Result<R::Return, TelegramError> {
        self.client.invoke(request).await.map_err(|e| {
            let err: TelegramError = e.into();
            if let TelegramError::FloodWait(seconds) = &err {
                warn!("Flood wait triggered: {} seconds", seconds);
            }
            err
        })
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

fn inline_button(btn: &InlineButton) -> button::Inline {
    match btn {
        InlineButton::Callback { text, data } => button::inline(text, data.as_bytes()),
        InlineButton::Url { text, url } => button::url(text, url),
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}
