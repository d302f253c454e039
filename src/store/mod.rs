//! Persistent user store.
//!
//! One document per chat participant plus a singleton common record, kept
//! in MongoDB in production and in memory for tests and dry runs.

mod memory;
mod mongo;
mod records;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::InMemoryUserStore;
pub use mongo::{MongoUserStore, USERS_COLLECTION};
pub use records::{
    COMMON_RECORD_ID, CommonRecord, CommonUpdate, QuestKind, QuestTypeEntry, UserRecord,
    UserUpdate,
};

/// Telegram chat/user identifier.
pub type UserId = i64;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("Amount {amount} does not fit the balance of user {user_id}")]
    Overflow { user_id: UserId, amount: u64 },
}

/// Storage operations the game needs.
///
/// Counter changes go through `increment_*` so that backends can apply them
/// atomically instead of read-modify-write.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Checks whether a user record exists.
    async fn exists(&self, id: UserId) -> Result<bool, StoreError>;

    /// Inserts a new record. Returns `false` if a record with that id exists.
    async fn create(&self, record: &UserRecord) -> Result<bool, StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Applies a partial update. Returns `false` if the user does not exist.
    async fn update(&self, id: UserId, update: &UserUpdate) -> Result<bool, StoreError>;

    /// Adds one to the referral counter. Returns `false` if the user does not exist.
    async fn increment_referral_count(&self, id: UserId) -> Result<bool, StoreError>;

    /// Credits `amount` gold and returns the new balance, or `None` if the
    /// user does not exist.
    async fn increment_balance(&self, id: UserId, amount: u64)
    -> Result<Option<u64>, StoreError>;

    /// Credits a claim: adds `amount` gold and stamps `claimed_at` as the
    /// last claim in one write. Returns the new balance, or `None` if the
    /// user does not exist. A failed credit leaves the record untouched.
    async fn record_claim(
        &self,
        id: UserId,
        amount: u64,
        claimed_at: DateTime<Utc>,
    ) -> Result<Option<u64>, StoreError>;

    /// Finds the owner of a referral code.
    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserId>, StoreError>;

    async fn get_common(&self) -> Result<Option<CommonRecord>, StoreError>;

    /// Applies a partial update to the common record, creating it if needed.
    async fn upsert_common(&self, update: &CommonUpdate) -> Result<CommonRecord, StoreError>;
}
