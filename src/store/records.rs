//! Documents kept in the `users` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::i18n::Language;

/// Identifier of the singleton common record inside the users collection.
pub const COMMON_RECORD_ID: i64 = 0;

/// Bonus quests offered by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    /// Daily quest: open the latest post, then check.
    #[serde(rename = "daily_quest")]
    Daily,
    SubscribeTgChannel,
    StartAnotherBot,
    /// Campaign types written by newer tooling that this build does not know.
    #[serde(other)]
    Unknown,
}

impl QuestKind {
    /// Quests a user can be offered.
    pub const OFFERED: [Self; 3] = [Self::Daily, Self::SubscribeTgChannel, Self::StartAnotherBot];

    /// Parses the name used by the admin tool and the common record.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "daily_quest" | "daily" => Some(Self::Daily),
            "subscribe_tg_channel" | "channel" => Some(Self::SubscribeTgChannel),
            "start_another_bot" | "bot" => Some(Self::StartAnotherBot),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Daily => "daily_quest",
            Self::SubscribeTgChannel => "subscribe_tg_channel",
            Self::StartAnotherBot => "start_another_bot",
            Self::Unknown => "unknown",
        }
    }
}

/// Stores `Option<DateTime<Utc>>` as a native BSON datetime.
mod bson_datetime {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(bson::DateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(bson::DateTime::to_chrono))
    }
}

/// Per-user game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: UserId,

    #[serde(default)]
    pub balance: u64,

    /// Code other users pass to `/start` to join as this user's recruits.
    pub referral_code: String,

    #[serde(default)]
    pub amount_of_referrals: u64,

    /// Base gold per successful claim.
    #[serde(default)]
    pub gold_per_pillage: u64,

    #[serde(default, with = "bson_datetime")]
    pub last_time_pillage_claimed: Option<DateTime<Utc>>,

    #[serde(default, with = "bson_datetime")]
    pub last_time_daily_quest_completed: Option<DateTime<Utc>>,

    /// Set when the daily quest link was handed out; required to complete it.
    #[serde(default, with = "bson_datetime")]
    pub last_time_twitter_link_clicked: Option<DateTime<Utc>>,

    #[serde(default, with = "bson_datetime")]
    pub subscribe_channel_quest_time: Option<DateTime<Utc>>,

    #[serde(default, with = "bson_datetime")]
    pub start_another_bot_quest_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub user_language: Language,
}

impl UserRecord {
    /// Creates a fresh record with a random referral code.
    #[must_use]
    pub fn new(id: UserId, language: Language, gold_per_pillage: u64) -> Self {
        Self {
            id,
            balance: 0,
            referral_code: uuid::Uuid::new_v4().to_string(),
            amount_of_referrals: 0,
            gold_per_pillage,
            last_time_pillage_claimed: None,
            last_time_daily_quest_completed: None,
            last_time_twitter_link_clicked: None,
            subscribe_channel_quest_time: None,
            start_another_bot_quest_time: None,
            user_language: language,
        }
    }

    /// Last completion of the given quest, if any.
    #[must_use]
    pub const fn quest_completed_at(&self, quest: QuestKind) -> Option<DateTime<Utc>> {
        match quest {
            QuestKind::Daily => self.last_time_daily_quest_completed,
            QuestKind::SubscribeTgChannel => self.subscribe_channel_quest_time,
            QuestKind::StartAnotherBot => self.start_another_bot_quest_time,
            QuestKind::Unknown => None,
        }
    }
}

/// Partial update of a user record. `None` fields are left untouched.
///
/// Counters are not part of it: they only change through the store's
/// atomic increment operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "bson_datetime::serialize"
    )]
    pub last_time_pillage_claimed: Option<DateTime<Utc>>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "bson_datetime::serialize"
    )]
    pub last_time_daily_quest_completed: Option<DateTime<Utc>>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "bson_datetime::serialize"
    )]
    pub last_time_twitter_link_clicked: Option<DateTime<Utc>>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "bson_datetime::serialize"
    )]
    pub subscribe_channel_quest_time: Option<DateTime<Utc>>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "bson_datetime::serialize"
    )]
    pub start_another_bot_quest_time: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_language: Option<Language>,
}

impl UserUpdate {
    /// Update that only sets the completion time of `quest`.
    #[must_use]
    pub fn quest_completed(quest: QuestKind, at: DateTime<Utc>) -> Self {
        let mut update = Self::default();
        match quest {
            QuestKind::Daily => update.last_time_daily_quest_completed = Some(at),
            QuestKind::SubscribeTgChannel => update.subscribe_channel_quest_time = Some(at),
            QuestKind::StartAnotherBot => update.start_another_bot_quest_time = Some(at),
            QuestKind::Unknown => {}
        }
        update
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the set fields to an in-memory record.
    pub fn apply(&self, record: &mut UserRecord) {
        if let Some(at) = self.last_time_pillage_claimed {
            record.last_time_pillage_claimed = Some(at);
        }
        if let Some(at) = self.last_time_daily_quest_completed {
            record.last_time_daily_quest_completed = Some(at);
        }
        if let Some(at) = self.last_time_twitter_link_clicked {
            record.last_time_twitter_link_clicked = Some(at);
        }
        if let Some(at) = self.subscribe_channel_quest_time {
            record.subscribe_channel_quest_time = Some(at);
        }
        if let Some(at) = self.start_another_bot_quest_time {
            record.start_another_bot_quest_time = Some(at);
        }
        if let Some(language) = self.user_language {
            record.user_language = language;
        }
    }
}

/// Launch metadata of a campaign quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestTypeEntry {
    #[serde(rename = "type")]
    pub kind: QuestKind,

    /// Last (re)launch of the campaign. Completions older than this no
    /// longer count.
    #[serde(default, with = "bson_datetime")]
    pub update_time: Option<DateTime<Utc>>,
}

/// Shared configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonRecord {
    #[serde(rename = "_id")]
    pub id: i64,

    /// Post the daily quest points to.
    #[serde(default)]
    pub last_twitter_post_link: Option<String>,

    #[serde(default)]
    pub channel_link: Option<String>,

    #[serde(default)]
    pub another_bot_link: Option<String>,

    #[serde(default)]
    pub quest_types: Vec<QuestTypeEntry>,
}

impl Default for CommonRecord {
    fn default() -> Self {
        Self {
            id: COMMON_RECORD_ID,
            last_twitter_post_link: None,
            channel_link: None,
            another_bot_link: None,
            quest_types: Vec::new(),
        }
    }
}

impl CommonRecord {
    /// Link handed out on the card of `quest`.
    #[must_use]
    pub fn quest_link(&self, quest: QuestKind) -> Option<&str> {
        match quest {
            QuestKind::Daily => self.last_twitter_post_link.as_deref(),
            QuestKind::SubscribeTgChannel => self.channel_link.as_deref(),
            QuestKind::StartAnotherBot => self.another_bot_link.as_deref(),
            QuestKind::Unknown => None,
        }
    }
}

/// Partial update of the common record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonUpdate {
    pub last_twitter_post_link: Option<String>,
    pub channel_link: Option<String>,
    pub another_bot_link: Option<String>,

    /// Marks a campaign quest as (re)launched at the given time.
    pub relaunch: Option<(QuestKind, DateTime<Utc>)>,
}

impl CommonUpdate {
    /// Applies the set fields to the common record.
    pub fn apply(&self, record: &mut CommonRecord) {
        if let Some(link) = &self.last_twitter_post_link {
            record.last_twitter_post_link = Some(link.clone());
        }
        if let Some(link) = &self.channel_link {
            record.channel_link = Some(link.clone());
        }
        if let Some(link) = &self.another_bot_link {
            record.another_bot_link = Some(link.clone());
        }
        if let Some((kind, at)) = self.relaunch {
            match record.quest_types.iter_mut().find(|q| q.kind == kind) {
                Some(entry) => entry.update_time = Some(at),
                None => record.quest_types.push(QuestTypeEntry {
                    kind,
                    update_time: Some(at),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = UserRecord::new(42, Language::Ru, 100);
        assert_eq!(user.balance, 0);
        assert_eq!(user.amount_of_referrals, 0);
        assert_eq!(user.gold_per_pillage, 100);
        assert_eq!(user.user_language, Language::Ru);
        assert!(user.last_time_pillage_claimed.is_none());
        assert_ne!(user.referral_code, UserRecord::new(43, Language::En, 100).referral_code);
    }

    #[test]
    fn test_user_update_only_serializes_set_fields() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let update = UserUpdate {
            last_time_pillage_claimed: Some(at),
            ..UserUpdate::default()
        };
        let doc = bson::to_document(&update).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(
            doc.get_datetime("last_time_pillage_claimed").unwrap().to_chrono(),
            at
        );
    }

    #[test]
    fn test_user_record_bson_roundtrip_keeps_timestamps() {
        let mut user = UserRecord::new(7, Language::En, 100);
        user.last_time_daily_quest_completed =
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        let doc = bson::to_document(&user).unwrap();
        assert_eq!(doc.get_i64("_id").unwrap(), 7);
        let back: UserRecord = bson::from_document(doc).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_unknown_quest_type_is_tolerated() {
        let common: CommonRecord = bson::from_document(bson::doc! {
            "_id": 0_i64,
            "quest_types": [{ "type": "follow_on_x", "update_time": null }],
        })
        .unwrap();
        assert_eq!(common.quest_types[0].kind, QuestKind::Unknown);
    }

    #[test]
    fn test_common_update_relaunch_inserts_then_replaces() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut common = CommonRecord::default();

        CommonUpdate {
            relaunch: Some((QuestKind::StartAnotherBot, first)),
            ..CommonUpdate::default()
        }
        .apply(&mut common);
        CommonUpdate {
            relaunch: Some((QuestKind::StartAnotherBot, second)),
            ..CommonUpdate::default()
        }
        .apply(&mut common);

        assert_eq!(common.quest_types.len(), 1);
        assert_eq!(common.quest_types[0].update_time, Some(second));
    }
}
