//! Message keys and locale tables.

use super::Language;

/// Keys of every message the bot can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    NewUser,
    Welcome,
    InitiationFailed,
    PillageInfo,
    /// Args: `reward`, `reward_time`.
    PillageSuccess,
    /// Args: `reward_time`.
    PillageFailure,
    /// Args: `user_balance`.
    CurrentBalance,
    /// Args: `base_url`, `referral_code`, `amount_of_referrals`.
    ReferralsInfo,
    QuestsList,
    QuestsListEmpty,
    DailyQuest,
    SubscribeChannelQuest,
    StartAnotherBotQuest,
    DailyQuestCompleted,
    DailyQuestFailed,
    QuestCompleted,
    QuestCheckFailed,
    QuestUnavailable,
    LanguageChoose,
    LanguageSwitched,
    InvalidLanguage,
    ImageMissing,
    GenericError,
}

/// Keys of button labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKey {
    Pillage,
    Referrals,
    Balance,
    Quests,
    Language,
    Initiation,
    Claim,
    Invite,
    DailyQuest,
    SubscribeChannelQuest,
    StartAnotherBotQuest,
    LinkDailyQuest,
    LinkSubscribeQuest,
    LinkBotQuest,
    CheckQuest,
}

impl ButtonKey {
    /// Buttons of the persistent reply keyboard, matched against free text.
    pub const MAIN_MENU: [Self; 5] = [
        Self::Pillage,
        Self::Referrals,
        Self::Balance,
        Self::Quests,
        Self::Language,
    ];
}

pub(super) fn message_template(lang: Language, key: MessageKey) -> Option<&'static str> {
    match lang {
        Language::En => Some(message_template_en(key)),
        Language::Ru => message_template_ru(key),
    }
}

pub(super) fn button_label(lang: Language, key: ButtonKey) -> Option<&'static str> {
    match lang {
        Language::En => Some(button_label_en(key)),
        Language::Ru => button_label_ru(key),
    }
}

pub(super) const fn message_template_en(key: MessageKey) -> &'static str {
    match key {
        MessageKey::NewUser => {
            "<b>Welcome, stranger!</b>\n\nThe raiders' hall is open to you. \
             Join our channel, then press the button below to complete your initiation."
        }
        MessageKey::Welcome => {
            "<b>Welcome to the hall, raider!</b>\n\nPillage every few hours, \
             bring friends along and complete quests to grow your hoard."
        }
        MessageKey::InitiationFailed => {
            "You are not in our channel yet. Join it and press the button again."
        }
        MessageKey::PillageInfo => {
            "<b>Pillage</b>\n\nEvery 4 hours you may raid for gold. \
             Press the button below to collect your loot."
        }
        MessageKey::PillageSuccess => {
            "Raid successful! You brought home {reward} gold.\nNext raid in {reward_time}."
        }
        MessageKey::PillageFailure => {
            "Your raiders are still resting. Next raid in {reward_time}."
        }
        MessageKey::CurrentBalance => "Your hoard: {user_balance} gold.",
        MessageKey::ReferralsInfo => {
            "<b>Your squad</b>\n\nInvite friends with your link:\n\
             <code>{base_url}{referral_code}</code>\n\nRecruits so far: {amount_of_referrals}"
        }
        MessageKey::QuestsList => "Available quests:",
        MessageKey::QuestsListEmpty => "No quests right now. Come back later!",
        MessageKey::DailyQuest => {
            "<b>Daily quest</b>\n\nVisit our latest post, then press \"Check\"."
        }
        MessageKey::SubscribeChannelQuest => {
            "<b>Channel quest</b>\n\nSubscribe to our channel, then press \"Check\"."
        }
        MessageKey::StartAnotherBotQuest => {
            "<b>Ally quest</b>\n\nStart our companion bot, then press \"Check\"."
        }
        MessageKey::DailyQuestCompleted => "Daily quest completed! Well fought.",
        MessageKey::DailyQuestFailed => "Open the quest link first, then press \"Check\".",
        MessageKey::QuestCompleted => "Quest completed!",
        MessageKey::QuestCheckFailed => "We could not confirm the quest yet. Try again.",
        MessageKey::QuestUnavailable => "This quest is not available right now.",
        MessageKey::LanguageChoose => "Choose your language:",
        MessageKey::LanguageSwitched => "Language changed.",
        MessageKey::InvalidLanguage => "Invalid language code.",
        MessageKey::ImageMissing => "Error: Image not found.",
        MessageKey::GenericError => "An error occurred processing your request.",
    }
}

const fn message_template_ru(key: MessageKey) -> Option<&'static str> {
    Some(match key {
        MessageKey::NewUser => {
            "<b>Приветствуем, странник!</b>\n\nЗал налётчиков открыт для тебя. \
             Вступи в наш канал и нажми кнопку ниже, чтобы пройти посвящение."
        }
        MessageKey::Welcome => {
            "<b>Добро пожаловать в зал, налётчик!</b>\n\nГрабь каждые несколько часов, \
             приводи друзей и выполняй задания, чтобы приумножить добычу."
        }
        MessageKey::InitiationFailed => {
            "Ты ещё не в нашем канале. Вступи в него и нажми кнопку снова."
        }
        MessageKey::PillageInfo => {
            "<b>Набег</b>\n\nРаз в 4 часа можно отправиться за золотом. \
             Нажми кнопку ниже, чтобы забрать добычу."
        }
        MessageKey::PillageSuccess => {
            "Набег удался! Ты принёс {reward} золота.\nСледующий набег через {reward_time}."
        }
        MessageKey::PillageFailure => "Твои воины ещё отдыхают. Следующий набег через {reward_time}.",
        MessageKey::CurrentBalance => "Твоя казна: {user_balance} золота.",
        MessageKey::ReferralsInfo => {
            "<b>Твой отряд</b>\n\nПриглашай друзей по ссылке:\n\
             <code>{base_url}{referral_code}</code>\n\nНовобранцев: {amount_of_referrals}"
        }
        MessageKey::QuestsList => "Доступные задания:",
        MessageKey::QuestsListEmpty => "Сейчас заданий нет. Загляни позже!",
        MessageKey::DailyQuest => {
            "<b>Ежедневное задание</b>\n\nОткрой наш свежий пост и нажми «Проверить»."
        }
        MessageKey::SubscribeChannelQuest => {
            "<b>Задание канала</b>\n\nПодпишись на наш канал и нажми «Проверить»."
        }
        MessageKey::StartAnotherBotQuest => {
            "<b>Задание союзника</b>\n\nЗапусти нашего бота-компаньона и нажми «Проверить»."
        }
        MessageKey::DailyQuestCompleted => "Ежедневное задание выполнено! Славная битва.",
        MessageKey::DailyQuestFailed => "Сначала открой ссылку задания, затем нажми «Проверить».",
        MessageKey::QuestCompleted => "Задание выполнено!",
        MessageKey::QuestCheckFailed => "Пока не удалось подтвердить задание. Попробуй ещё раз.",
        MessageKey::QuestUnavailable => "Это задание сейчас недоступно.",
        MessageKey::LanguageChoose => "Выбери язык:",
        MessageKey::LanguageSwitched => "Язык изменён.",
        MessageKey::InvalidLanguage => "Неверный код языка.",
        MessageKey::ImageMissing | MessageKey::GenericError => return None,
    })
}

pub(super) const fn button_label_en(key: ButtonKey) -> &'static str {
    match key {
        ButtonKey::Pillage => "⚔️ Pillage",
        ButtonKey::Referrals => "👥 Squad",
        ButtonKey::Balance => "💰 Balance",
        ButtonKey::Quests => "📜 Quests",
        ButtonKey::Language => "🌐 Language",
        ButtonKey::Initiation => "Complete initiation",
        ButtonKey::Claim => "Claim gold",
        ButtonKey::Invite => "Invite friends",
        ButtonKey::DailyQuest => "Daily quest",
        ButtonKey::SubscribeChannelQuest => "Subscribe to the channel",
        ButtonKey::StartAnotherBotQuest => "Start the companion bot",
        ButtonKey::LinkDailyQuest => "Open post",
        ButtonKey::LinkSubscribeQuest => "Open channel",
        ButtonKey::LinkBotQuest => "Open bot",
        ButtonKey::CheckQuest => "Check",
    }
}

const fn button_label_ru(key: ButtonKey) -> Option<&'static str> {
    Some(match key {
        ButtonKey::Pillage => "⚔️ Набег",
        ButtonKey::Referrals => "👥 Отряд",
        ButtonKey::Balance => "💰 Казна",
        ButtonKey::Quests => "📜 Задания",
        ButtonKey::Language => "🌐 Язык",
        ButtonKey::Initiation => "Пройти посвящение",
        ButtonKey::Claim => "Забрать золото",
        ButtonKey::Invite => "Пригласить друзей",
        ButtonKey::DailyQuest => "Ежедневное задание",
        ButtonKey::SubscribeChannelQuest => "Подписаться на канал",
        ButtonKey::StartAnotherBotQuest => "Запустить бота-компаньона",
        ButtonKey::LinkDailyQuest => "Открыть пост",
        ButtonKey::LinkSubscribeQuest => "Открыть канал",
        ButtonKey::LinkBotQuest => "Открыть бота",
        ButtonKey::CheckQuest => "Проверить",
    })
}
