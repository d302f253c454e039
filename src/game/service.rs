//! Game operations bound to a user store.
//!
//! Every read-then-write sequence for one user runs under that user's async
//! mutex, so concurrent updates from the same user are applied one at a time.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use super::quests::{active_quests, daily_prerequisite_met};
use super::referral::{ReferralTier, referral_tier};
use super::reward::{ClaimDecision, evaluate_claim, remaining_time};
use crate::i18n::Language;
use crate::store::{
    CommonRecord, QuestKind, StoreError, UserId, UserRecord, UserStore, UserUpdate,
};

/// Errors returned by game operations.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Invalid language selection: {0}")]
    InvalidLanguage(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed {
        amount: u64,
        doubled: bool,
        balance: u64,
        next_claim_in: TimeDelta,
    },
    CoolingDown {
        remaining: TimeDelta,
    },
}

/// Result of resolving a referral code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrerLookup {
    Found(UserId),
    NotFound,
}

/// What happened to the referral attached to a first `/start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralOutcome {
    Credited { referrer: UserId, amount: u64 },
    UnknownCode,
}

/// Result of a `/start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Created {
        user: UserRecord,
        referral: Option<ReferralOutcome>,
    },
    Returning(UserRecord),
}

/// Result of checking a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestCheck {
    Completed,
    /// The quest link was never opened.
    PrerequisiteMissing,
    /// The quest is not currently offered to the user.
    Unavailable,
}

type UserLocks = DashMap<UserId, Arc<Mutex<()>>>;

/// Holds a user's mutex and drops the map entry once nobody else uses it.
struct UserGuard<'a> {
    locks: &'a UserLocks,
    id: UserId,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        // References left when idle: the map entry and this guard.
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 2);
    }
}

/// Game state operations over a [`UserStore`].
pub struct GameService {
    store: Arc<dyn UserStore>,
    locks: UserLocks,
    gold_per_pillage: u64,
}

impl GameService {
    /// Creates a service crediting `gold_per_pillage` per claim to new users.
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, gold_per_pillage: u64) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            gold_per_pillage,
        }
    }

    async fn lock_user(&self, id: UserId) -> UserGuard<'_> {
        let lock = Arc::clone(self.locks.entry(id).or_default().value());
        UserGuard {
            locks: &self.locks,
            id,
            _guard: lock.lock_owned().await,
        }
    }

    async fn require_user(&self, id: UserId) -> Result<UserRecord, GameError> {
        self.store
            .get(id)
            .await?
            .ok_or(GameError::UserNotFound(id))
    }

    /// Returns the stored record of a user.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UserNotFound`] for unknown users.
    pub async fn user(&self, id: UserId) -> Result<UserRecord, GameError> {
        self.require_user(id).await
    }

    /// Language of a user, defaulting to the base locale for unknown users.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn language_of(&self, id: UserId) -> Result<Language, GameError> {
        Ok(self
            .store
            .get(id)
            .await?
            .map(|user| user.user_language)
            .unwrap_or_default())
    }

    /// Handles `/start`: creates the user on first contact and settles the
    /// attached referral, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn start(
        &self,
        id: UserId,
        client_language: Option<&str>,
        referral_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StartOutcome, GameError> {
        let user = {
            let _guard = self.lock_user(id).await;
            if let Some(existing) = self.store.get(id).await? {
                return Ok(StartOutcome::Returning(existing));
            }

            let user = UserRecord::new(
                id,
                Language::for_new_user(client_language),
                self.gold_per_pillage,
            );
            if !self.store.create(&user).await? {
                return Ok(StartOutcome::Returning(self.require_user(id).await?));
            }
            info!("Created user {} (language: {})", id, user.user_language);
            user
        };

        let referral = match referral_code {
            Some(code) => Some(self.settle_referral(id, code, now).await?),
            None => None,
        };

        Ok(StartOutcome::Created { user, referral })
    }

    async fn settle_referral(
        &self,
        new_user: UserId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ReferralOutcome, GameError> {
        let ReferrerLookup::Found(referrer) = self.resolve_referrer(code).await? else {
            warn!(
                "User {} started with unknown referral code '{}', skipping referral",
                new_user, code
            );
            return Ok(ReferralOutcome::UnknownCode);
        };

        if !self.register_referral(referrer).await? {
            return Ok(ReferralOutcome::UnknownCode);
        }

        match self.grant_referral_reward(referrer, now).await? {
            Some(amount) => {
                info!(
                    "User {} joined via user {}, referrer credited {} gold",
                    new_user, referrer, amount
                );
                Ok(ReferralOutcome::Credited { referrer, amount })
            }
            None => Ok(ReferralOutcome::UnknownCode),
        }
    }

    /// Resolves a referral code to the user owning it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn resolve_referrer(&self, code: &str) -> Result<ReferrerLookup, GameError> {
        Ok(match self.store.find_by_referral_code(code).await? {
            Some(id) => ReferrerLookup::Found(id),
            None => ReferrerLookup::NotFound,
        })
    }

    /// Adds one recruit to the referrer's count. Returns `false` and leaves
    /// the store untouched if the referrer does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn register_referral(&self, referrer: UserId) -> Result<bool, GameError> {
        let _guard = self.lock_user(referrer).await;
        let registered = self.store.increment_referral_count(referrer).await?;
        if !registered {
            error!("Referrer {} not found, referral not registered", referrer);
        }
        Ok(registered)
    }

    /// Credits the referral reward. Each call credits once; callers must
    /// invoke it once per referral event. Returns the credited amount, or
    /// `None` if the referrer does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn grant_referral_reward(
        &self,
        referrer: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<u64>, GameError> {
        let _guard = self.lock_user(referrer).await;
        let Some(user) = self.store.get(referrer).await? else {
            error!("Referrer {} not found, no referral reward granted", referrer);
            return Ok(None);
        };

        let tier = referral_tier(now, user.last_time_daily_quest_completed);
        if tier == ReferralTier::NoActivity {
            info!(
                "User {} has no previous quest completion, granting base referral reward",
                referrer
            );
        }

        let credited = self.store.increment_balance(referrer, tier.amount()).await?;
        Ok(credited.map(|_| tier.amount()))
    }

    /// Attempts a gold claim at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UserNotFound`] for unknown users or a store error.
    pub async fn claim(&self, id: UserId, now: DateTime<Utc>) -> Result<ClaimOutcome, GameError> {
        let _guard = self.lock_user(id).await;
        let user = self.require_user(id).await?;

        match evaluate_claim(
            now,
            user.last_time_pillage_claimed,
            user.last_time_daily_quest_completed,
            user.gold_per_pillage,
        ) {
            ClaimDecision::Granted { amount, doubled } => {
                let balance = self
                    .store
                    .record_claim(id, amount, now)
                    .await?
                    .ok_or(GameError::UserNotFound(id))?;

                info!(
                    "User {} claimed {} gold (doubled: {}), new balance: {}",
                    id, amount, doubled, balance
                );
                Ok(ClaimOutcome::Claimed {
                    amount,
                    doubled,
                    balance,
                    next_claim_in: remaining_time(now, Some(now)),
                })
            }
            ClaimDecision::Cooldown { remaining } => {
                debug!("User {} claim refused, {}s remaining", id, remaining.num_seconds());
                Ok(ClaimOutcome::CoolingDown { remaining })
            }
        }
    }

    /// Current balance of a user.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UserNotFound`] for unknown users or a store error.
    pub async fn balance(&self, id: UserId) -> Result<u64, GameError> {
        Ok(self.require_user(id).await?.balance)
    }

    /// Switches the interface language.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidLanguage`] for unsupported codes, leaving
    /// the stored preference unchanged.
    pub async fn set_language(&self, id: UserId, code: &str) -> Result<Language, GameError> {
        let language =
            Language::from_code(code).ok_or_else(|| GameError::InvalidLanguage(code.to_owned()))?;

        let _guard = self.lock_user(id).await;
        let update = UserUpdate {
            user_language: Some(language),
            ..UserUpdate::default()
        };
        if !self.store.update(id, &update).await? {
            return Err(GameError::UserNotFound(id));
        }
        info!("User {} switched language to {}", id, language);
        Ok(language)
    }

    /// Records that the daily quest link was handed to the user.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UserNotFound`] for unknown users or a store error.
    pub async fn record_link_click(&self, id: UserId, now: DateTime<Utc>) -> Result<(), GameError> {
        let _guard = self.lock_user(id).await;
        let user = self.require_user(id).await?;
        if user.last_time_twitter_link_clicked.is_some_and(|at| at > now) {
            return Ok(());
        }
        let update = UserUpdate {
            last_time_twitter_link_clicked: Some(now),
            ..UserUpdate::default()
        };
        self.store.update(id, &update).await?;
        Ok(())
    }

    /// Marks the daily quest completed, provided its link was opened first.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UserNotFound`] for unknown users or a store error.
    pub async fn mark_quest_completed(
        &self,
        id: UserId,
        now: DateTime<Utc>,
    ) -> Result<QuestCheck, GameError> {
        let _guard = self.lock_user(id).await;
        let user = self.require_user(id).await?;
        if !daily_prerequisite_met(&user) {
            return Ok(QuestCheck::PrerequisiteMissing);
        }
        self.store_completion(&user, QuestKind::Daily, now).await?;
        info!("User {} completed the daily quest", id);
        Ok(QuestCheck::Completed)
    }

    /// Marks a campaign quest completed. The caller verifies the external
    /// action beforehand.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UserNotFound`] for unknown users or a store error.
    pub async fn complete_campaign_quest(
        &self,
        id: UserId,
        quest: QuestKind,
        now: DateTime<Utc>,
    ) -> Result<QuestCheck, GameError> {
        if quest == QuestKind::Daily {
            return self.mark_quest_completed(id, now).await;
        }

        let common = self.store.get_common().await?;
        let _guard = self.lock_user(id).await;
        let user = self.require_user(id).await?;
        if !active_quests(now, &user, common.as_ref()).contains(&quest) {
            return Ok(QuestCheck::Unavailable);
        }
        self.store_completion(&user, quest, now).await?;
        info!("User {} completed quest {}", id, quest.name());
        Ok(QuestCheck::Completed)
    }

    async fn store_completion(
        &self,
        user: &UserRecord,
        quest: QuestKind,
        now: DateTime<Utc>,
    ) -> Result<(), GameError> {
        if user.quest_completed_at(quest).is_some_and(|at| at > now) {
            return Ok(());
        }
        self.store
            .update(user.id, &UserUpdate::quest_completed(quest, now))
            .await?;
        Ok(())
    }

    /// Quests currently offered to the user.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UserNotFound`] for unknown users or a store error.
    pub async fn active_quests(
        &self,
        id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<QuestKind>, GameError> {
        let user = self.require_user(id).await?;
        let common = self.store.get_common().await?;
        Ok(active_quests(now, &user, common.as_ref()))
    }

    /// The common record, or an empty one if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn common(&self) -> Result<CommonRecord, GameError> {
        Ok(self.store.get_common().await?.unwrap_or_default())
    }
}

impl std::fmt::Debug for GameService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameService")
            .field("gold_per_pillage", &self.gold_per_pillage)
            .field("locked_users", &self.locks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::store::{CommonUpdate, InMemoryUserStore};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
    }

    fn service() -> (Arc<InMemoryUserStore>, GameService) {
        let store = Arc::new(InMemoryUserStore::new());
        let service = GameService::new(Arc::clone(&store) as Arc<dyn UserStore>, 100);
        (store, service)
    }

    async fn new_user(service: &GameService, id: UserId) -> UserRecord {
        match service.start(id, None, None, t0()).await.unwrap() {
            StartOutcome::Created { user, .. } => user,
            StartOutcome::Returning(_) => panic!("user {id} already existed"),
        }
    }

    #[tokio::test]
    async fn test_start_without_referral() {
        let (store, service) = service();
        let outcome = service.start(1, Some("ru"), None, t0()).await.unwrap();

        let StartOutcome::Created { user, referral } = outcome else {
            panic!("expected a new user");
        };
        assert_eq!(user.balance, 0);
        assert_eq!(user.user_language, Language::Ru);
        assert!(referral.is_none());
        assert_eq!(store.len().await, 1);

        assert!(matches!(
            service.start(1, Some("en"), None, t0()).await.unwrap(),
            StartOutcome::Returning(_)
        ));
    }

    #[tokio::test]
    async fn test_start_with_referral_credits_referrer() {
        let (_store, service) = service();
        let referrer = new_user(&service, 10).await;

        let outcome = service
            .start(11, None, Some(&referrer.referral_code), t0())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            StartOutcome::Created {
                referral: Some(ReferralOutcome::Credited {
                    referrer: 10,
                    amount: 500
                }),
                ..
            }
        ));
        let referrer = service.user(10).await.unwrap();
        assert_eq!(referrer.amount_of_referrals, 1);
        assert_eq!(referrer.balance, 500);
    }

    #[tokio::test]
    async fn test_start_with_unknown_referral_still_onboards() {
        let (store, service) = service();
        let outcome = service.start(2, None, Some("bogus"), t0()).await.unwrap();
        assert!(matches!(
            outcome,
            StartOutcome::Created {
                referral: Some(ReferralOutcome::UnknownCode),
                ..
            }
        ));
        assert!(store.exists(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_referral() {
        let (store, service) = service();
        new_user(&service, 3).await;

        assert!(service.register_referral(3).await.unwrap());
        assert_eq!(service.user(3).await.unwrap().amount_of_referrals, 1);

        let before = store.get(3).await.unwrap();
        assert!(!service.register_referral(404).await.unwrap());
        assert_eq!(store.get(3).await.unwrap(), before);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_grant_referral_reward_tiers() {
        let (store, service) = service();
        new_user(&service, 4).await;

        assert_eq!(service.grant_referral_reward(4, t0()).await.unwrap(), Some(500));

        store
            .update(4, &UserUpdate::quest_completed(QuestKind::Daily, t0()))
            .await
            .unwrap();
        assert_eq!(
            service
                .grant_referral_reward(4, t0() + TimeDelta::hours(23))
                .await
                .unwrap(),
            Some(500)
        );
        assert_eq!(
            service
                .grant_referral_reward(4, t0() + TimeDelta::hours(25))
                .await
                .unwrap(),
            Some(1000)
        );
        assert_eq!(service.balance(4).await.unwrap(), 2000);
        assert_eq!(service.grant_referral_reward(404, t0()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_claim_cooldown_scenario() {
        let (_store, service) = service();
        new_user(&service, 5).await;

        let first = service.claim(5, t0()).await.unwrap();
        assert!(matches!(
            first,
            ClaimOutcome::Claimed {
                amount: 100,
                balance: 100,
                doubled: false,
                ..
            }
        ));

        let second = service.claim(5, t0() + TimeDelta::hours(3)).await.unwrap();
        let ClaimOutcome::CoolingDown { remaining } = second else {
            panic!("claim inside the cooldown must fail");
        };
        assert_eq!(crate::game::format_hms(remaining), "01:00:00");
        assert_eq!(service.balance(5).await.unwrap(), 100);

        let third = service.claim(5, t0() + TimeDelta::hours(4)).await.unwrap();
        assert!(matches!(third, ClaimOutcome::Claimed { balance: 200, .. }));
    }

    #[tokio::test]
    async fn test_claim_doubles_with_settled_quest() {
        let (store, service) = service();
        new_user(&service, 6).await;
        store
            .update(6, &UserUpdate::quest_completed(QuestKind::Daily, t0()))
            .await
            .unwrap();

        let outcome = service.claim(6, t0() + TimeDelta::hours(30)).await.unwrap();
        assert!(matches!(
            outcome,
            ClaimOutcome::Claimed {
                amount: 200,
                doubled: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_claims_credit_once() {
        let (_store, service) = service();
        let service = Arc::new(service);
        new_user(&service, 7).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.claim(7, t0()).await.unwrap() })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), ClaimOutcome::Claimed { .. }) {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
        assert_eq!(service.balance(7).await.unwrap(), 100);
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn test_failed_credit_keeps_claim_available() {
        let (store, service) = service();
        new_user(&service, 13).await;
        store.increment_balance(13, u64::MAX - 50).await.unwrap();

        assert!(matches!(
            service.claim(13, t0()).await,
            Err(GameError::Store(StoreError::Overflow {
                user_id: 13,
                amount: 100
            }))
        ));

        let user = service.user(13).await.unwrap();
        assert_eq!(user.balance, u64::MAX - 50);
        assert!(user.last_time_pillage_claimed.is_none());
        assert!(matches!(
            service.claim(13, t0() + TimeDelta::minutes(1)).await,
            Err(GameError::Store(StoreError::Overflow { .. }))
        ));
    }

    #[tokio::test]
    async fn test_idle_user_locks_are_released() {
        let (_store, service) = service();
        new_user(&service, 14).await;
        service.claim(14, t0()).await.unwrap();
        service.record_link_click(14, t0()).await.unwrap();
        assert!(service.locks.is_empty());

        let held = service.lock_user(14).await;
        assert_eq!(service.locks.len(), 1);
        drop(held);
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn test_claim_unknown_user() {
        let (_store, service) = service();
        assert!(matches!(
            service.claim(99, t0()).await,
            Err(GameError::UserNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_set_language() {
        let (_store, service) = service();
        new_user(&service, 8).await;

        assert!(matches!(
            service.set_language(8, "xx").await,
            Err(GameError::InvalidLanguage(code)) if code == "xx"
        ));
        assert_eq!(service.language_of(8).await.unwrap(), Language::En);

        assert_eq!(service.set_language(8, "ru").await.unwrap(), Language::Ru);
        assert_eq!(service.language_of(8).await.unwrap(), Language::Ru);
    }

    #[tokio::test]
    async fn test_daily_quest_requires_link_click() {
        let (_store, service) = service();
        new_user(&service, 9).await;

        assert_eq!(
            service.mark_quest_completed(9, t0()).await.unwrap(),
            QuestCheck::PrerequisiteMissing
        );
        assert!(service.user(9).await.unwrap().last_time_daily_quest_completed.is_none());

        service.record_link_click(9, t0()).await.unwrap();
        let later = t0() + TimeDelta::minutes(1);
        assert_eq!(
            service.mark_quest_completed(9, later).await.unwrap(),
            QuestCheck::Completed
        );
        assert_eq!(
            service.user(9).await.unwrap().last_time_daily_quest_completed,
            Some(later)
        );
        assert!(service.active_quests(9, later).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_campaign_quest_completion_and_relaunch() {
        let (store, service) = service();
        new_user(&service, 12).await;

        assert_eq!(
            service
                .complete_campaign_quest(12, QuestKind::StartAnotherBot, t0())
                .await
                .unwrap(),
            QuestCheck::Unavailable
        );

        store
            .upsert_common(&CommonUpdate {
                relaunch: Some((QuestKind::StartAnotherBot, t0())),
                ..CommonUpdate::default()
            })
            .await
            .unwrap();

        let later = t0() + TimeDelta::hours(1);
        assert_eq!(
            service
                .complete_campaign_quest(12, QuestKind::StartAnotherBot, later)
                .await
                .unwrap(),
            QuestCheck::Completed
        );
        assert!(!service
            .active_quests(12, later)
            .await
            .unwrap()
            .contains(&QuestKind::StartAnotherBot));

        store
            .upsert_common(&CommonUpdate {
                relaunch: Some((QuestKind::StartAnotherBot, later + TimeDelta::hours(1))),
                ..CommonUpdate::default()
            })
            .await
            .unwrap();
        assert!(service
            .active_quests(12, later + TimeDelta::hours(2))
            .await
            .unwrap()
            .contains(&QuestKind::StartAnotherBot));
    }
}
