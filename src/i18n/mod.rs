//! Localization of bot messages and button labels.
//!
//! Every text the bot shows is addressed by a typed key. The English table is
//! exhaustive, so any key missing from another locale falls back to English
//! without a runtime lookup failure.

mod messages;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use messages::{ButtonKey, MessageKey};

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    /// All supported languages, in the order they are offered to users.
    pub const ALL: [Self; 2] = [Self::En, Self::Ru];

    /// Locale code stored in user records and used as callback data.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
        }
    }

    /// Native name shown on the language picker.
    #[must_use]
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ru => "Русский",
        }
    }

    /// Looks up a supported language by its locale code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }

    /// Picks the initial language for a new user from the Telegram client
    /// language. Only Russian clients get a non-default language.
    #[must_use]
    pub fn for_new_user(client_language: Option<&str>) -> Self {
        match client_language {
            Some("ru") => Self::Ru,
            _ => Self::En,
        }
    }

    /// Returns the message text for this language with `{name}` placeholders
    /// substituted from `args`.
    #[must_use]
    pub fn message(self, key: MessageKey, args: &[(&str, String)]) -> String {
        let template = messages::message_template(self, key)
            .unwrap_or_else(|| messages::message_template_en(key));
        render(template, args)
    }

    /// Returns the label of a button in this language.
    #[must_use]
    pub fn button(self, key: ButtonKey) -> &'static str {
        messages::button_label(self, key).unwrap_or_else(|| messages::button_label_en(key))
    }

    /// Finds which reply-keyboard button a free-text message matches.
    #[must_use]
    pub fn match_button(self, text: &str) -> Option<ButtonKey> {
        let text = text.trim();
        ButtonKey::MAIN_MENU
            .into_iter()
            .find(|&key| self.button(key) == text)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Substitutes `{name}` placeholders. Unknown placeholders are left as is.
fn render(template: &str, args: &[(&str, String)]) -> String {
    let mut out = template.to_owned();
    for (name, value) in args {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}
