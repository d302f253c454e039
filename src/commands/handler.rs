//! Conversation handler: maps user actions to game operations and replies.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::reply::{Image, InlineButton, Keyboard, Reply, Response};
use super::types::{CallbackAction, Sender, UserAction};
use crate::config::BotSettings;
use crate::game::{ClaimOutcome, GameError, GameService, QuestCheck, StartOutcome, format_hms};
use crate::i18n::{ButtonKey, Language, MessageKey};
use crate::store::{QuestKind, UserId};

/// Checks whether a user belongs to the bot's channel.
#[async_trait]
pub trait ChannelGate: Send + Sync {
    /// Returns `true` for members, administrators and the creator.
    async fn is_member(&self, user: UserId) -> anyhow::Result<bool>;
}

/// Gate used when no channel is configured: everyone passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

#[async_trait]
impl ChannelGate for OpenGate {
    async fn is_member(&self, _user: UserId) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Errors that abort handling of a single update.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("Channel membership check failed: {0:#}")]
    Gate(anyhow::Error),
}

/// Handles incoming messages and callbacks for all users.
pub struct ConversationHandler {
    game: Arc<GameService>,
    settings: BotSettings,
    gate: Arc<dyn ChannelGate>,
}

impl ConversationHandler {
    #[must_use]
    pub fn new(game: Arc<GameService>, settings: BotSettings, gate: Arc<dyn ChannelGate>) -> Self {
        Self {
            game,
            settings,
            gate,
        }
    }

    /// Handles a text message.
    ///
    /// Returns `None` if the text is not something the bot reacts to.
    pub async fn handle_message(
        &self,
        sender: &Sender,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<Response> {
        let language = self.language_or_default(sender.id).await;
        let action = UserAction::parse(text, language)?;
        debug!("User {} action: {:?}", sender.id, action);

        let result = match action {
            UserAction::Start { referral } => self.start(sender, referral.as_deref(), now).await,
            UserAction::Menu(key) => self.menu(sender, key, language, now).await,
        };
        Some(self.finish(sender, language, result, now).await)
    }

    /// Handles an inline button press.
    ///
    /// Returns `None` for callback data the bot does not know.
    pub async fn handle_callback(
        &self,
        sender: &Sender,
        data: &str,
        now: DateTime<Utc>,
    ) -> Option<Response> {
        let Some(action) = CallbackAction::parse(data) else {
            debug!("User {} sent unknown callback data '{}'", sender.id, data);
            return None;
        };
        debug!("User {} callback: {}", sender.id, action);

        let language = self.language_or_default(sender.id).await;
        let result = self.callback(sender, action, language, now).await;
        Some(self.finish(sender, language, result, now).await)
    }

    async fn language_or_default(&self, id: UserId) -> Language {
        match self.game.language_of(id).await {
            Ok(language) => language,
            Err(e) => {
                warn!("Could not load language of user {}: {}", id, e);
                Language::default()
            }
        }
    }

    /// Turns a failed interaction into a reply. Users without a record are
    /// onboarded instead.
    async fn finish(
        &self,
        sender: &Sender,
        language: Language,
        result: Result<Response, HandlerError>,
        now: DateTime<Utc>,
    ) -> Response {
        let err = match result {
            Ok(response) => return response,
            Err(HandlerError::Game(GameError::UserNotFound(id))) if id == sender.id => {
                info!("User {} has no record yet, starting onboarding", id);
                match self.start(sender, None, now).await {
                    Ok(response) => return response,
                    Err(e) => e,
                }
            }
            Err(e) => e,
        };

        error!("Failed to handle update from user {}: {}", sender.id, err);
        Response::reply(Reply::text(
            language.message(MessageKey::GenericError, &[]),
        ))
    }

    async fn start(
        &self,
        sender: &Sender,
        referral: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Response, HandlerError> {
        let outcome = self
            .game
            .start(sender.id, sender.language_code.as_deref(), referral, now)
            .await?;

        let reply = match outcome {
            StartOutcome::Created { user, .. } => {
                let language = user.user_language;
                let keyboard = Keyboard::inline_column(vec![callback_button(
                    language,
                    ButtonKey::Initiation,
                    &CallbackAction::Initiation,
                )]);
                self.photo(
                    language,
                    Image::Welcome,
                    language.message(MessageKey::NewUser, &[]),
                    Some(keyboard),
                )
                .await
            }
            StartOutcome::Returning(user) => self.main_screen(user.user_language).await,
        };
        Ok(Response::reply(reply))
    }

    async fn menu(
        &self,
        sender: &Sender,
        key: ButtonKey,
        language: Language,
        now: DateTime<Utc>,
    ) -> Result<Response, HandlerError> {
        let reply = match key {
            ButtonKey::Pillage => {
                self.game.user(sender.id).await?;
                let keyboard = Keyboard::inline_column(vec![callback_button(
                    language,
                    ButtonKey::Claim,
                    &CallbackAction::ClaimGold,
                )]);
                self.photo(
                    language,
                    Image::Pillage,
                    language.message(MessageKey::PillageInfo, &[]),
                    Some(keyboard),
                )
                .await
            }
            ButtonKey::Referrals => self.squad(sender.id, language).await?,
            ButtonKey::Balance => {
                let balance = self.game.balance(sender.id).await?;
                let text = language.message(
                    MessageKey::CurrentBalance,
                    &[("user_balance", balance.to_string())],
                );
                self.photo(language, Image::Balance, text, None).await
            }
            ButtonKey::Quests => self.quest_list(sender.id, language, now).await?,
            ButtonKey::Language => {
                self.game.user(sender.id).await?;
                let buttons = Language::ALL
                    .into_iter()
                    .map(|lang| InlineButton::Callback {
                        text: lang.native_name().to_owned(),
                        data: CallbackAction::SetLanguage(lang.code().to_owned()).data(),
                    })
                    .collect();
                self.photo(
                    language,
                    Image::Language,
                    language.message(MessageKey::LanguageChoose, &[]),
                    Some(Keyboard::inline_column(buttons)),
                )
                .await
            }
            other => {
                debug!("Button {:?} is not part of the main menu", other);
                return Ok(Response::default());
            }
        };
        Ok(Response::reply(reply))
    }

    async fn squad(&self, id: UserId, language: Language) -> Result<Reply, HandlerError> {
        let user = self.game.user(id).await?;
        let text = language.message(
            MessageKey::ReferralsInfo,
            &[
                ("base_url", self.settings.referral_base_url.clone()),
                ("referral_code", user.referral_code.clone()),
                ("amount_of_referrals", user.amount_of_referrals.to_string()),
            ],
        );
        let keyboard = self.settings.invite_url.as_ref().map(|url| {
            Keyboard::inline_column(vec![InlineButton::Url {
                text: language.button(ButtonKey::Invite).to_owned(),
                url: url.clone(),
            }])
        });
        Ok(self.photo(language, Image::Squad, text, keyboard).await)
    }

    async fn quest_list(
        &self,
        id: UserId,
        language: Language,
        now: DateTime<Utc>,
    ) -> Result<Reply, HandlerError> {
        let active = self.game.active_quests(id, now).await?;
        if active.is_empty() {
            let text = language.message(MessageKey::QuestsListEmpty, &[]);
            return Ok(self.photo(language, Image::Quests, text, None).await);
        }

        let buttons = active
            .into_iter()
            .map(|kind| {
                callback_button(language, quest_button(kind), &CallbackAction::OpenQuest(kind))
            })
            .collect();
        let text = language.message(MessageKey::QuestsList, &[]);
        Ok(self
            .photo(language, Image::Quests, text, Some(Keyboard::inline_column(buttons)))
            .await)
    }

    async fn callback(
        &self,
        sender: &Sender,
        action: CallbackAction,
        language: Language,
        now: DateTime<Utc>,
    ) -> Result<Response, HandlerError> {
        match action {
            CallbackAction::Initiation => {
                self.game.user(sender.id).await?;
                if self.is_member(sender.id).await? {
                    info!("User {} completed initiation", sender.id);
                    Ok(Response::replacing_origin(self.main_screen(language).await))
                } else {
                    Ok(Response::reply(Reply::text(
                        language.message(MessageKey::InitiationFailed, &[]),
                    )))
                }
            }
            CallbackAction::ClaimGold => {
                let reply = match self.game.claim(sender.id, now).await? {
                    ClaimOutcome::Claimed {
                        amount,
                        next_claim_in,
                        ..
                    } => {
                        let text = language.message(
                            MessageKey::PillageSuccess,
                            &[
                                ("reward", amount.to_string()),
                                ("reward_time", format_hms(next_claim_in)),
                            ],
                        );
                        self.photo(language, Image::ClaimSuccessful, text, None).await
                    }
                    ClaimOutcome::CoolingDown { remaining } => {
                        let text = language.message(
                            MessageKey::PillageFailure,
                            &[("reward_time", format_hms(remaining))],
                        );
                        self.photo(language, Image::ClaimUnsuccessful, text, None).await
                    }
                };
                Ok(Response::replacing_origin(reply))
            }
            CallbackAction::OpenQuest(kind) => self.open_quest(sender.id, kind, language, now).await,
            CallbackAction::CheckQuest(kind) => {
                self.check_quest(sender.id, kind, language, now).await
            }
            CallbackAction::SetLanguage(code) => {
                match self.game.set_language(sender.id, &code).await {
                    Ok(new_language) => Ok(Response::replacing_origin(
                        Reply::text(new_language.message(MessageKey::LanguageSwitched, &[]))
                            .with_keyboard(Keyboard::main_menu(new_language)),
                    )),
                    Err(GameError::InvalidLanguage(code)) => {
                        warn!("User {} picked unsupported language '{}'", sender.id, code);
                        Ok(Response::reply(Reply::text(
                            language.message(MessageKey::InvalidLanguage, &[]),
                        )))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn open_quest(
        &self,
        id: UserId,
        kind: QuestKind,
        language: Language,
        now: DateTime<Utc>,
    ) -> Result<Response, HandlerError> {
        let unavailable = || {
            Response::reply(Reply::text(
                language.message(MessageKey::QuestUnavailable, &[]),
            ))
        };

        if !self.game.active_quests(id, now).await?.contains(&kind) {
            return Ok(unavailable());
        }
        let common = self.game.common().await?;
        let link = match kind {
            QuestKind::SubscribeTgChannel => common
                .quest_link(kind)
                .or(self.settings.invite_url.as_deref()),
            _ => common.quest_link(kind),
        };
        let Some(link) = link else {
            warn!("Quest {} has no link configured", kind.name());
            return Ok(unavailable());
        };

        let (message, link_button) = match kind {
            QuestKind::Daily => (MessageKey::DailyQuest, ButtonKey::LinkDailyQuest),
            QuestKind::SubscribeTgChannel => {
                (MessageKey::SubscribeChannelQuest, ButtonKey::LinkSubscribeQuest)
            }
            QuestKind::StartAnotherBot | QuestKind::Unknown => {
                (MessageKey::StartAnotherBotQuest, ButtonKey::LinkBotQuest)
            }
        };
        let keyboard = Keyboard::Inline(vec![vec![
            InlineButton::Url {
                text: language.button(link_button).to_owned(),
                url: link.to_owned(),
            },
            callback_button(language, ButtonKey::CheckQuest, &CallbackAction::CheckQuest(kind)),
        ]]);

        if kind == QuestKind::Daily {
            self.game.record_link_click(id, now).await?;
        }

        let reply = self
            .photo(language, Image::Quests, language.message(message, &[]), Some(keyboard))
            .await;
        Ok(Response::replacing_origin(reply))
    }

    async fn check_quest(
        &self,
        id: UserId,
        kind: QuestKind,
        language: Language,
        now: DateTime<Utc>,
    ) -> Result<Response, HandlerError> {
        let check = match kind {
            QuestKind::Daily => self.game.mark_quest_completed(id, now).await?,
            QuestKind::SubscribeTgChannel => {
                self.game.user(id).await?;
                if !self.is_member(id).await? {
                    return Ok(Response::reply(Reply::text(
                        language.message(MessageKey::QuestCheckFailed, &[]),
                    )));
                }
                self.game.complete_campaign_quest(id, kind, now).await?
            }
            QuestKind::StartAnotherBot | QuestKind::Unknown => {
                self.game.complete_campaign_quest(id, kind, now).await?
            }
        };

        let text = |key| Reply::text(language.message(key, &[]));
        Ok(match (check, kind) {
            (QuestCheck::Completed, QuestKind::Daily) => {
                Response::replacing_origin(text(MessageKey::DailyQuestCompleted))
            }
            (QuestCheck::Completed, _) => Response::replacing_origin(text(MessageKey::QuestCompleted)),
            (QuestCheck::PrerequisiteMissing, _) => {
                Response::reply(text(MessageKey::DailyQuestFailed))
            }
            (QuestCheck::Unavailable, _) => Response::reply(text(MessageKey::QuestUnavailable)),
        })
    }

    async fn is_member(&self, id: UserId) -> Result<bool, HandlerError> {
        self.gate.is_member(id).await.map_err(HandlerError::Gate)
    }

    async fn main_screen(&self, language: Language) -> Reply {
        self.photo(
            language,
            Image::Main,
            language.message(MessageKey::Welcome, &[]),
            Some(Keyboard::main_menu(language)),
        )
        .await
    }

    /// Builds a photo reply. A missing image file degrades to a text-only
    /// error notice.
    async fn photo(
        &self,
        language: Language,
        image: Image,
        text: String,
        keyboard: Option<Keyboard>,
    ) -> Reply {
        let path = image.path_in(&self.settings.images_dir);
        let present = tokio::fs::metadata(&path)
            .await
            .is_ok_and(|meta| meta.is_file());
        if !present {
            warn!("Image not found: {}", path.display());
            return Reply::text(language.message(MessageKey::ImageMissing, &[]));
        }

        let reply = Reply::text(text).with_image(path);
        match keyboard {
            Some(keyboard) => reply.with_keyboard(keyboard),
            None => reply,
        }
    }
}

fn callback_button(language: Language, key: ButtonKey, action: &CallbackAction) -> InlineButton {
    InlineButton::Callback {
        text: language.button(key).to_owned(),
        data: action.data(),
    }
}

const fn quest_button(kind: QuestKind) -> ButtonKey {
    match kind {
        QuestKind::Daily => ButtonKey::DailyQuest,
        QuestKind::SubscribeTgChannel => ButtonKey::SubscribeChannelQuest,
        QuestKind::StartAnotherBot | QuestKind::Unknown => ButtonKey::StartAnotherBotQuest,
    }
}

impl std::fmt::Debug for ConversationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationHandler")
            .field("game", &self.game)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::store::{CommonUpdate, InMemoryUserStore, UserStore};

    struct SwitchGate(AtomicBool);

    #[async_trait]
    impl ChannelGate for SwitchGate {
        async fn is_member(&self, _user: UserId) -> anyhow::Result<bool> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    struct Fixture {
        store: Arc<InMemoryUserStore>,
        gate: Arc<SwitchGate>,
        handler: ConversationHandler,
        images_dir: PathBuf,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.images_dir);
        }
    }

    fn fixture(with_images: bool) -> Fixture {
        let images_dir =
            std::env::temp_dir().join(format!("pillage_bot_images_{}", uuid::Uuid::new_v4()));
        if with_images {
            std::fs::create_dir_all(&images_dir).unwrap();
            for image in [
                Image::Welcome,
                Image::Main,
                Image::Pillage,
                Image::ClaimSuccessful,
                Image::ClaimUnsuccessful,
                Image::Balance,
                Image::Squad,
                Image::Quests,
                Image::Language,
            ] {
                std::fs::write(image.path_in(&images_dir), b"RIFF").unwrap();
            }
        }

        let store = Arc::new(InMemoryUserStore::new());
        let game = Arc::new(GameService::new(
            Arc::clone(&store) as Arc<dyn UserStore>,
            100,
        ));
        let settings = BotSettings {
            invite_url: Some("https://t.me/+invite".to_owned()),
            referral_base_url: "https://t.me/pillage_bot?start=".to_owned(),
            images_dir: images_dir.clone(),
            ..BotSettings::default()
        };
        let gate = Arc::new(SwitchGate(AtomicBool::new(true)));
        let handler = ConversationHandler::new(
            game,
            settings,
            Arc::clone(&gate) as Arc<dyn ChannelGate>,
        );
        Fixture {
            store,
            gate,
            handler,
            images_dir,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 18, 0, 0).unwrap()
    }

    fn sender(id: UserId) -> Sender {
        Sender::new(id, Some("en".to_owned()))
    }

    fn only_reply(response: &Response) -> &Reply {
        assert_eq!(response.replies.len(), 1);
        &response.replies[0]
    }

    #[tokio::test]
    async fn test_start_new_user_shows_initiation() {
        let fx = fixture(true);
        let response = fx
            .handler
            .handle_message(&sender(1), "/start", now())
            .await
            .unwrap();

        let reply = only_reply(&response);
        assert_eq!(reply.text, Language::En.message(MessageKey::NewUser, &[]));
        assert_eq!(reply.image, Some(Image::Welcome.path_in(&fx.images_dir)));
        assert_eq!(
            reply.keyboard,
            Some(Keyboard::Inline(vec![vec![InlineButton::Callback {
                text: Language::En.button(ButtonKey::Initiation).to_owned(),
                data: "initiation".to_owned(),
            }]]))
        );
        assert!(fx.store.exists(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_start_returning_user_shows_main_menu() {
        let fx = fixture(true);
        let ru = Sender::new(2, Some("ru".to_owned()));
        fx.handler.handle_message(&ru, "/start", now()).await;

        let response = fx.handler.handle_message(&ru, "/start", now()).await.unwrap();
        let reply = only_reply(&response);
        assert_eq!(reply.text, Language::Ru.message(MessageKey::Welcome, &[]));
        assert_eq!(reply.keyboard, Some(Keyboard::main_menu(Language::Ru)));
    }

    #[tokio::test]
    async fn test_referral_link_credits_referrer() {
        let fx = fixture(true);
        fx.handler.handle_message(&sender(3), "/start", now()).await;
        let code = fx.store.get(3).await.unwrap().unwrap().referral_code;

        fx.handler
            .handle_message(&sender(4), &format!("/start {code}"), now())
            .await
            .unwrap();

        let referrer = fx.store.get(3).await.unwrap().unwrap();
        assert_eq!(referrer.amount_of_referrals, 1);
        assert_eq!(referrer.balance, 500);
    }

    #[tokio::test]
    async fn test_initiation_gate() {
        let fx = fixture(true);
        fx.handler.handle_message(&sender(5), "/start", now()).await;

        fx.gate.0.store(false, Ordering::SeqCst);
        let response = fx
            .handler
            .handle_callback(&sender(5), "initiation", now())
            .await
            .unwrap();
        assert!(!response.delete_origin);
        assert_eq!(
            only_reply(&response).text,
            Language::En.message(MessageKey::InitiationFailed, &[])
        );

        fx.gate.0.store(true, Ordering::SeqCst);
        let response = fx
            .handler
            .handle_callback(&sender(5), "initiation", now())
            .await
            .unwrap();
        assert!(response.delete_origin);
        assert_eq!(
            only_reply(&response).keyboard,
            Some(Keyboard::main_menu(Language::En))
        );
    }

    #[tokio::test]
    async fn test_claim_flow() {
        let fx = fixture(true);
        fx.handler.handle_message(&sender(6), "/start", now()).await;

        let response = fx
            .handler
            .handle_callback(&sender(6), "claim_gold", now())
            .await
            .unwrap();
        assert!(response.delete_origin);
        let reply = only_reply(&response);
        assert_eq!(reply.image, Some(Image::ClaimSuccessful.path_in(&fx.images_dir)));
        assert!(reply.text.contains("100"));
        assert!(reply.text.contains("04:00:00"));

        let response = fx
            .handler
            .handle_callback(&sender(6), "claim_gold", now() + TimeDelta::hours(3))
            .await
            .unwrap();
        let reply = only_reply(&response);
        assert_eq!(reply.image, Some(Image::ClaimUnsuccessful.path_in(&fx.images_dir)));
        assert!(reply.text.contains("01:00:00"));
        assert_eq!(fx.store.get(6).await.unwrap().unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_missing_image_keeps_state_change() {
        let fx = fixture(false);
        fx.handler.handle_message(&sender(7), "/start", now()).await;

        let response = fx
            .handler
            .handle_callback(&sender(7), "claim_gold", now())
            .await
            .unwrap();
        let reply = only_reply(&response);
        assert_eq!(reply.text, Language::En.message(MessageKey::ImageMissing, &[]));
        assert!(reply.image.is_none());
        assert_eq!(fx.store.get(7).await.unwrap().unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_balance_and_squad_menu() {
        let fx = fixture(true);
        fx.handler.handle_message(&sender(8), "/start", now()).await;

        let balance_label = Language::En.button(ButtonKey::Balance);
        let response = fx
            .handler
            .handle_message(&sender(8), balance_label, now())
            .await
            .unwrap();
        assert_eq!(
            only_reply(&response).text,
            Language::En.message(MessageKey::CurrentBalance, &[("user_balance", "0".to_owned())])
        );

        let squad_label = Language::En.button(ButtonKey::Referrals);
        let response = fx
            .handler
            .handle_message(&sender(8), squad_label, now())
            .await
            .unwrap();
        let code = fx.store.get(8).await.unwrap().unwrap().referral_code;
        let reply = only_reply(&response);
        assert!(reply.text.contains(&format!("https://t.me/pillage_bot?start={code}")));
        assert!(matches!(
            &reply.keyboard,
            Some(Keyboard::Inline(rows)) if matches!(&rows[0][0], InlineButton::Url { url, .. } if url == "https://t.me/+invite")
        ));
    }

    #[tokio::test]
    async fn test_unrelated_text_is_ignored() {
        let fx = fixture(true);
        fx.handler.handle_message(&sender(9), "/start", now()).await;
        assert!(
            fx.handler
                .handle_message(&sender(9), "ahoy", now())
                .await
                .is_none()
        );
        assert!(
            fx.handler
                .handle_callback(&sender(9), "link_to_twitter", now())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_menu_from_unknown_user_onboards() {
        let fx = fixture(true);
        let label = Language::En.button(ButtonKey::Balance);
        let response = fx
            .handler
            .handle_message(&sender(10), label, now())
            .await
            .unwrap();
        assert_eq!(
            only_reply(&response).text,
            Language::En.message(MessageKey::NewUser, &[])
        );
        assert!(fx.store.exists(10).await.unwrap());
    }

    #[tokio::test]
    async fn test_language_switch() {
        let fx = fixture(true);
        fx.handler.handle_message(&sender(11), "/start", now()).await;

        let response = fx
            .handler
            .handle_callback(&sender(11), "lang_xx", now())
            .await
            .unwrap();
        assert_eq!(
            only_reply(&response).text,
            Language::En.message(MessageKey::InvalidLanguage, &[])
        );

        let response = fx
            .handler
            .handle_callback(&sender(11), "lang_ru", now())
            .await
            .unwrap();
        assert!(response.delete_origin);
        assert_eq!(
            only_reply(&response).text,
            Language::Ru.message(MessageKey::LanguageSwitched, &[])
        );
        assert_eq!(
            fx.store.get(11).await.unwrap().unwrap().user_language,
            Language::Ru
        );
    }

    #[tokio::test]
    async fn test_daily_quest_flow() {
        let fx = fixture(true);
        fx.handler.handle_message(&sender(12), "/start", now()).await;
        fx.store
            .upsert_common(&CommonUpdate {
                last_twitter_post_link: Some("https://x.com/raiders/status/1".to_owned()),
                ..CommonUpdate::default()
            })
            .await
            .unwrap();

        let response = fx
            .handler
            .handle_callback(&sender(12), "check_daily_quest", now())
            .await
            .unwrap();
        assert_eq!(
            only_reply(&response).text,
            Language::En.message(MessageKey::DailyQuestFailed, &[])
        );

        let quests_label = Language::En.button(ButtonKey::Quests);
        let response = fx
            .handler
            .handle_message(&sender(12), quests_label, now())
            .await
            .unwrap();
        assert_eq!(
            only_reply(&response).keyboard,
            Some(Keyboard::inline_column(vec![InlineButton::Callback {
                text: Language::En.button(ButtonKey::DailyQuest).to_owned(),
                data: "daily_quest_button".to_owned(),
            }]))
        );

        let response = fx
            .handler
            .handle_callback(&sender(12), "daily_quest_button", now())
            .await
            .unwrap();
        assert!(matches!(
            &only_reply(&response).keyboard,
            Some(Keyboard::Inline(rows)) if rows[0].len() == 2
        ));

        let response = fx
            .handler
            .handle_callback(&sender(12), "check_daily_quest", now())
            .await
            .unwrap();
        assert!(response.delete_origin);
        assert_eq!(
            only_reply(&response).text,
            Language::En.message(MessageKey::DailyQuestCompleted, &[])
        );

        let response = fx
            .handler
            .handle_message(&sender(12), quests_label, now())
            .await
            .unwrap();
        assert_eq!(
            only_reply(&response).text,
            Language::En.message(MessageKey::QuestsListEmpty, &[])
        );
    }

    #[tokio::test]
    async fn test_channel_quest_requires_membership() {
        let fx = fixture(true);
        fx.handler.handle_message(&sender(13), "/start", now()).await;
        fx.store
            .upsert_common(&CommonUpdate {
                relaunch: Some((QuestKind::SubscribeTgChannel, now() - TimeDelta::hours(1))),
                ..CommonUpdate::default()
            })
            .await
            .unwrap();

        fx.gate.0.store(false, Ordering::SeqCst);
        let response = fx
            .handler
            .handle_callback(&sender(13), "check_subscribe_tg_channel_quest", now())
            .await
            .unwrap();
        assert_eq!(
            only_reply(&response).text,
            Language::En.message(MessageKey::QuestCheckFailed, &[])
        );

        fx.gate.0.store(true, Ordering::SeqCst);
        let response = fx
            .handler
            .handle_callback(&sender(13), "check_subscribe_tg_channel_quest", now())
            .await
            .unwrap();
        assert_eq!(
            only_reply(&response).text,
            Language::En.message(MessageKey::QuestCompleted, &[])
        );
        assert_eq!(
            fx.store
                .get(13)
                .await
                .unwrap()
                .unwrap()
                .subscribe_channel_quest_time,
            Some(now())
        );
    }
}
