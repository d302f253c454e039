//! Transport-neutral replies produced by the conversation handler.

use std::path::{Path, PathBuf};

use crate::i18n::{ButtonKey, Language};

/// Images shipped with the bot, stored as `<name>.webp` in the images directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Image {
    Welcome,
    Main,
    Pillage,
    ClaimSuccessful,
    ClaimUnsuccessful,
    Balance,
    Squad,
    Quests,
    Language,
}

impl Image {
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Welcome => "welcome.webp",
            Self::Main => "main.webp",
            Self::Pillage => "pillage.webp",
            Self::ClaimSuccessful => "claim_successful.webp",
            Self::ClaimUnsuccessful => "claim_unsuccessful.webp",
            Self::Balance => "balance.webp",
            Self::Squad => "squad.webp",
            Self::Quests => "quests.webp",
            Self::Language => "language.webp",
        }
    }

    #[must_use]
    pub fn path_in(self, images_dir: &Path) -> PathBuf {
        images_dir.join(self.file_name())
    }
}

/// A button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineButton {
    Callback { text: String, data: String },
    Url { text: String, url: String },
}

/// Keyboard attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons under the message, one inner vector per row.
    Inline(Vec<Vec<InlineButton>>),

    /// Persistent reply keyboard; pressing a button sends its label as text.
    Reply(Vec<Vec<String>>),
}

impl Keyboard {
    /// The main menu keyboard in the given language.
    #[must_use]
    pub fn main_menu(language: Language) -> Self {
        let label = |key| language.button(key).to_owned();
        Self::Reply(vec![
            vec![label(ButtonKey::Pillage), label(ButtonKey::Referrals)],
            vec![label(ButtonKey::Balance), label(ButtonKey::Quests)],
            vec![label(ButtonKey::Language)],
        ])
    }

    /// An inline keyboard with one button per row.
    #[must_use]
    pub fn inline_column(buttons: Vec<InlineButton>) -> Self {
        Self::Inline(buttons.into_iter().map(|button| vec![button]).collect())
    }
}

/// One outgoing message. Text is HTML formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,

    /// Photo sent with `text` as its caption.
    pub image: Option<PathBuf>,

    pub keyboard: Option<Keyboard>,
}

impl Reply {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, path: PathBuf) -> Self {
        self.image = Some(path);
        self
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Everything the transport should do in answer to one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub replies: Vec<Reply>,

    /// Delete the message whose inline button triggered the update.
    pub delete_origin: bool,
}

impl Response {
    #[must_use]
    pub fn reply(reply: Reply) -> Self {
        Self {
            replies: vec![reply],
            delete_origin: false,
        }
    }

    #[must_use]
    pub fn replacing_origin(reply: Reply) -> Self {
        Self {
            replies: vec![reply],
            delete_origin: true,
        }
    }
}
