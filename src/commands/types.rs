//! Incoming user actions and their wire forms.

use std::fmt;

use crate::game::referral::parse_start;
use crate::i18n::{ButtonKey, Language};
use crate::store::{QuestKind, UserId};

/// Prefix of language picker callback data, followed by the locale code.
pub const LANGUAGE_CALLBACK_PREFIX: &str = "lang_";

/// The author of an incoming message or callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,

    /// Language reported by the Telegram client, if any.
    pub language_code: Option<String>,
}

impl Sender {
    #[must_use]
    pub fn new(id: UserId, language_code: Option<String>) -> Self {
        Self { id, language_code }
    }
}

/// Actions triggered by a text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// `/start`, optionally with a referral code deep-link argument.
    Start { referral: Option<String> },

    /// A press on the persistent reply keyboard.
    Menu(ButtonKey),
}

impl UserAction {
    /// Parses a text message. Button labels are matched in the user's
    /// current language.
    ///
    /// Returns `None` if the text is neither `/start` nor a menu label.
    #[must_use]
    pub fn parse(text: &str, language: Language) -> Option<Self> {
        if let Some(referral) = parse_start(text) {
            return Some(Self::Start {
                referral: referral.map(str::to_owned),
            });
        }
        language.match_button(text).map(Self::Menu)
    }
}

/// Actions triggered by an inline button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Confirms channel membership after onboarding.
    Initiation,

    ClaimGold,

    /// Opens the card of a quest.
    OpenQuest(QuestKind),

    /// Verifies a quest after the user acted on it.
    CheckQuest(QuestKind),

    /// Picks a language by locale code. The code is validated later so that
    /// unsupported codes produce a localized error.
    SetLanguage(String),
}

impl CallbackAction {
    /// Parses callback data sent by an inline button.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            "initiation" => Self::Initiation,
            "claim_gold" => Self::ClaimGold,
            "daily_quest_button" => Self::OpenQuest(QuestKind::Daily),
            "subscribe_tg_channel_button" => Self::OpenQuest(QuestKind::SubscribeTgChannel),
            "start_another_bot_button" => Self::OpenQuest(QuestKind::StartAnotherBot),
            "check_daily_quest" => Self::CheckQuest(QuestKind::Daily),
            "check_subscribe_tg_channel_quest" => Self::CheckQuest(QuestKind::SubscribeTgChannel),
            "check_another_bot_quest" => Self::CheckQuest(QuestKind::StartAnotherBot),
            other => {
                let code = other.strip_prefix(LANGUAGE_CALLBACK_PREFIX)?;
                if code.is_empty() {
                    return None;
                }
                Self::SetLanguage(code.to_owned())
            }
        };
        Some(action)
    }

    /// Callback data carried by the button that triggers this action.
    #[must_use]
    pub fn data(&self) -> String {
        match self {
            Self::Initiation => "initiation".to_owned(),
            Self::ClaimGold => "claim_gold".to_owned(),
            Self::OpenQuest(kind) => format!("{}_button", open_tag(*kind)),
            Self::CheckQuest(QuestKind::Daily) => "check_daily_quest".to_owned(),
            Self::CheckQuest(QuestKind::SubscribeTgChannel) => {
                "check_subscribe_tg_channel_quest".to_owned()
            }
            Self::CheckQuest(_) => "check_another_bot_quest".to_owned(),
            Self::SetLanguage(code) => format!("{LANGUAGE_CALLBACK_PREFIX}{code}"),
        }
    }
}

const fn open_tag(kind: QuestKind) -> &'static str {
    match kind {
        QuestKind::Daily => "daily_quest",
        QuestKind::SubscribeTgChannel => "subscribe_tg_channel",
        QuestKind::StartAnotherBot | QuestKind::Unknown => "start_another_bot",
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        assert_eq!(
            UserAction::parse("/start", Language::En),
            Some(UserAction::Start { referral: None })
        );
        assert_eq!(
            UserAction::parse("/start 5f1c", Language::Ru),
            Some(UserAction::Start {
                referral: Some("5f1c".to_owned())
            })
        );
    }

    #[test]
    fn test_parse_menu_in_user_language() {
        let label = Language::Ru.button(ButtonKey::Balance);
        assert_eq!(
            UserAction::parse(label, Language::Ru),
            Some(UserAction::Menu(ButtonKey::Balance))
        );
        assert_eq!(UserAction::parse(label, Language::En), None);
        assert_eq!(UserAction::parse("what's up", Language::En), None);
    }

    #[test]
    fn test_parse_callbacks() {
        assert_eq!(
            CallbackAction::parse("initiation"),
            Some(CallbackAction::Initiation)
        );
        assert_eq!(
            CallbackAction::parse("claim_gold"),
            Some(CallbackAction::ClaimGold)
        );
        assert_eq!(
            CallbackAction::parse("check_another_bot_quest"),
            Some(CallbackAction::CheckQuest(QuestKind::StartAnotherBot))
        );
        assert_eq!(
            CallbackAction::parse("lang_ru"),
            Some(CallbackAction::SetLanguage("ru".to_owned()))
        );
        assert_eq!(CallbackAction::parse("lang_"), None);
        assert_eq!(CallbackAction::parse("link_to_twitter"), None);
    }

    #[test]
    fn test_callback_data_parses_back() {
        let actions = [
            CallbackAction::Initiation,
            CallbackAction::ClaimGold,
            CallbackAction::OpenQuest(QuestKind::Daily),
            CallbackAction::OpenQuest(QuestKind::SubscribeTgChannel),
            CallbackAction::OpenQuest(QuestKind::StartAnotherBot),
            CallbackAction::CheckQuest(QuestKind::Daily),
            CallbackAction::CheckQuest(QuestKind::SubscribeTgChannel),
            CallbackAction::CheckQuest(QuestKind::StartAnotherBot),
            CallbackAction::SetLanguage("en".to_owned()),
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.data()), Some(action.clone()));
        }
    }

    #[test]
    fn test_callback_data_fits_telegram_limit() {
        let data = CallbackAction::CheckQuest(QuestKind::SubscribeTgChannel).data();
        assert!(data.len() <= 64);
    }
}
