//! In-memory user store, used by tests and `--memory-store` runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{CommonRecord, CommonUpdate, StoreError, UserId, UserRecord, UserStore, UserUpdate};

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    common: RwLock<Option<CommonRecord>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored user records.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn exists(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.users.read().await.contains_key(&id))
    }

    async fn create(&self, record: &UserRecord) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&record.id) {
            return Ok(false);
        }
        users.insert(record.id, record.clone());
        Ok(true)
    }

    async fn get(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update(&self, id: UserId, update: &UserUpdate) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        update.apply(user);
        Ok(true)
    }

    async fn increment_referral_count(&self, id: UserId) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        user.amount_of_referrals += 1;
        Ok(true)
    }

    async fn increment_balance(
        &self,
        id: UserId,
        amount: u64,
    ) -> Result<Option<u64>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        user.balance = user
            .balance
            .checked_add(amount)
            .ok_or(StoreError::Overflow {
                user_id: id,
                amount,
            })?;
        Ok(Some(user.balance))
    }

    async fn record_claim(
        &self,
        id: UserId,
        amount: u64,
        claimed_at: DateTime<Utc>,
    ) -> Result<Option<u64>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        user.balance = user
            .balance
            .checked_add(amount)
            .ok_or(StoreError::Overflow {
                user_id: id,
                amount,
            })?;
        user.last_time_pillage_claimed = Some(claimed_at);
        Ok(Some(user.balance))
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.referral_code == code)
            .map(|user| user.id))
    }

    async fn get_common(&self) -> Result<Option<CommonRecord>, StoreError> {
        Ok(self.common.read().await.clone())
    }

    async fn upsert_common(&self, update: &CommonUpdate) -> Result<CommonRecord, StoreError> {
        let mut common = self.common.write().await;
        let record = common.get_or_insert_with(CommonRecord::default);
        update.apply(record);
        Ok(record.clone())
    }
}
