//! Conversation handling.
//!
//! Turns `/start`, reply-keyboard presses and inline callbacks into game
//! operations and transport-neutral replies.

mod handler;
mod reply;
mod types;

pub use handler::{ChannelGate, ConversationHandler, HandlerError, OpenGate};
pub use reply::{Image, InlineButton, Keyboard, Reply, Response};
pub use types::{CallbackAction, LANGUAGE_CALLBACK_PREFIX, Sender, UserAction};
