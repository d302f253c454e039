//! MongoDB-backed user store.

use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::options::{ClientOptions, Credential, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info};

use super::{
    COMMON_RECORD_ID, CommonRecord, CommonUpdate, StoreError, UserId, UserRecord, UserStore,
    UserUpdate,
};
use crate::config::MongoConfig;

/// Collection holding user records and the common record.
pub const USERS_COLLECTION: &str = "users";

const DUPLICATE_KEY: i32 = 11000;

/// User store persisting records in a MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoUserStore {
    users: Collection<UserRecord>,
    common: Collection<CommonRecord>,
}

impl MongoUserStore {
    /// Connects to MongoDB using the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is invalid or index creation fails.
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        info!("Connecting to MongoDB database '{}'...", config.database);

        let mut options = ClientOptions::parse(&config.uri).await?;
        if let Some(username) = &config.username {
            options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(config.password.clone())
                    .source(config.auth_source.clone())
                    .build(),
            );
        }

        let client = Client::with_options(options)?;
        Self::new(client.database(&config.database)).await
    }

    /// Opens the users collection and makes sure referral codes are unique.
    ///
    /// # Errors
    ///
    /// Returns an error if index creation fails.
    pub async fn new(db: Database) -> Result<Self, StoreError> {
        let users = db.collection::<UserRecord>(USERS_COLLECTION);
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "referral_code": 1 })
                    .options(IndexOptions::builder().unique(true).sparse(true).build())
                    .build(),
            )
            .await?;
        let common = users.clone_with_type::<CommonRecord>();

        Ok(Self { users, common })
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn exists(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.users.count_documents(doc! { "_id": id }).limit(1).await? > 0)
    }

    async fn create(&self, record: &UserRecord) -> Result<bool, StoreError> {
        match self.users.insert_one(record).await {
            Ok(_) => Ok(true),
            Err(err) => {
                if let ErrorKind::Write(WriteFailure::WriteError(WriteError {
                    code: DUPLICATE_KEY,
                    ..
                })) = &*err.kind
                {
                    debug!("User {} already exists", record.id);
                    return Ok(false);
                }
                Err(err.into())
            }
        }
    }

    async fn get(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn update(&self, id: UserId, update: &UserUpdate) -> Result<bool, StoreError> {
        if update.is_empty() {
            return self.exists(id).await;
        }
        let set = bson::to_document(update)?;
        let result = self
            .users
            .update_one(doc! { "_id": id }, doc! { "$set": set })
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn increment_referral_count(&self, id: UserId) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(
                doc! { "_id": id },
                doc! { "$inc": { "amount_of_referrals": 1_i64 } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn increment_balance(
        &self,
        id: UserId,
        amount: u64,
    ) -> Result<Option<u64>, StoreError> {
        let delta = i64::try_from(amount).map_err(|_| StoreError::Overflow {
            user_id: id,
            amount,
        })?;
        let updated = self
            .users
            .find_one_and_update(doc! { "_id": id }, doc! { "$inc": { "balance": delta } })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(|user| user.balance))
    }

    async fn record_claim(
        &self,
        id: UserId,
        amount: u64,
        claimed_at: DateTime<Utc>,
    ) -> Result<Option<u64>, StoreError> {
        let delta = i64::try_from(amount).map_err(|_| StoreError::Overflow {
            user_id: id,
            amount,
        })?;
        let updated = self
            .users
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$inc": { "balance": delta },
                    "$set": { "last_time_pillage_claimed": bson::DateTime::from_chrono(claimed_at) },
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(|user| user.balance))
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self
            .users
            .find_one(doc! { "referral_code": code })
            .await?
            .map(|user| user.id))
    }

    async fn get_common(&self) -> Result<Option<CommonRecord>, StoreError> {
        Ok(self.common.find_one(doc! { "_id": COMMON_RECORD_ID }).await?)
    }

    async fn upsert_common(&self, update: &CommonUpdate) -> Result<CommonRecord, StoreError> {
        let mut common = self.get_common().await?.unwrap_or_default();
        update.apply(&mut common);
        self.common
            .replace_one(doc! { "_id": COMMON_RECORD_ID }, &common)
            .upsert(true)
            .await?;
        Ok(common)
    }
}
