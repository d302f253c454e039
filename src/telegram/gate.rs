//! Channel membership checks through `channels.getParticipant`.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use grammers_tl_types as tl;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{TelegramBot, TelegramError};
use crate::commands::ChannelGate;
use crate::store::UserId;

/// Checks membership in one channel, identified by its public username.
pub struct ChannelMembership {
    bot: Arc<TelegramBot>,
    username: String,

    /// `(channel_id, access_hash)`, resolved on first use.
    channel: OnceCell<(i64, i64)>,

    /// Access hashes of users seen in updates, needed to address them.
    user_hashes: AccessHashes,
}

/// Upper bound of cached access hashes. Every update refreshes its sender's
/// entry, so emptying a full cache only costs refills.
const MAX_KNOWN_USERS: usize = 10_000;

/// Bounded map of user access hashes.
#[derive(Debug)]
struct AccessHashes {
    hashes: DashMap<UserId, i64>,
    capacity: usize,
}

impl AccessHashes {
    fn new(capacity: usize) -> Self {
        Self {
            hashes: DashMap::new(),
            capacity,
        }
    }

    fn remember(&self, user: UserId, hash: i64) {
        if self.hashes.len() >= self.capacity && !self.hashes.contains_key(&user) {
            debug!("Access hash cache full ({} users), clearing", self.hashes.len());
            self.hashes.clear();
        }
        self.hashes.insert(user, hash);
    }

    fn get(&self, user: UserId) -> Option<i64> {
        self.hashes.get(&user).map(|hash| *hash)
    }

    fn len(&self) -> usize {
        self.hashes.len()
    }
}

impl ChannelMembership {
    #[must_use]
    pub fn new(bot: Arc<TelegramBot>, username: impl Into<String>) -> Self {
        Self {
            bot,
            username: username.into().trim_start_matches('@').to_owned(),
            channel: OnceCell::new(),
            user_hashes: AccessHashes::new(MAX_KNOWN_USERS),
        }
    }

    /// Records the access hash of a user taken from an incoming update.
    pub fn remember_user(&self, user: UserId, access_hash: Option<i64>) {
        if let Some(hash) = access_hash {
            self.user_hashes.remember(user, hash);
        }
    }

    async fn channel(&self) -> Result<(i64, i64), TelegramError> {
        self.channel
            .get_or_try_init(|| async {
                let request = tl::functions::contacts::ResolveUsername {
                    username: self.username.clone(),
                    referer: None,
                };
                let tl::enums::contacts::ResolvedPeer::Peer(resolved) =
                    self.bot.invoke(&request).await?;

                resolved
                    .chats
                    .into_iter()
                    .find_map(|chat| match chat {
                        tl::enums::Chat::Channel(channel) => {
                            Some((channel.id, channel.access_hash.unwrap_or_default()))
                        }
                        _ => None,
                    })
                    .inspect(|(id, _)| info!("Resolved channel @{} to id {}", self.username, id))
                    .ok_or_else(|| TelegramError::ChannelNotFound(self.username.clone()))
            })
            .await
            .copied()
    }
}

#[async_trait]
impl ChannelGate for ChannelMembership {
    async fn is_member(&self, user: UserId) -> anyhow::Result<bool> {
        let (channel_id, channel_hash) = self
            .channel()
            .await
            .with_context(|| format!("Failed to resolve channel @{}", self.username))?;
        let user_hash = self.user_hashes.get(user).unwrap_or_default();

        let request = tl::functions::channels::GetParticipant {
            channel: tl::enums::InputChannel::Channel(tl::types::InputChannel {
                channel_id,
                access_hash: channel_hash,
            }),
            participant: tl::enums::InputPeer::User(tl::types::InputPeerUser {
                user_id: user,
                access_hash: user_hash,
            }),
        };

        match self.bot.invoke(&request).await {
            Ok(tl::enums::channels::ChannelParticipant::Participant(result)) => {
                let member = is_member_status(&result.participant);
                debug!("User {} membership in @{}: {}", user, self.username, member);
                Ok(member)
            }
            Err(TelegramError::Invocation(msg)) if msg.contains("USER_NOT_PARTICIPANT") => {
                debug!("User {} is not in @{}", user, self.username);
                Ok(false)
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to check membership of user {user}")),
        }
    }
}

/// Members, administrators and the creator pass; banned and departed users do not.
const fn is_member_status(participant: &tl::enums::ChannelParticipant) -> bool {
    matches!(
        participant,
        tl::enums::ChannelParticipant::Participant(_)
            | tl::enums::ChannelParticipant::ParticipantSelf(_)
            | tl::enums::ChannelParticipant::Creator(_)
            | tl::enums::ChannelParticipant::Admin(_)
    )
}

impl std::fmt::Debug for ChannelMembership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelMembership")
            .field("username", &self.username)
            .field("known_users", &self.user_hashes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_hashes_stay_bounded() {
        let hashes = AccessHashes::new(2);
        hashes.remember(1, 10);
        hashes.remember(2, 20);
        hashes.remember(2, 21);
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes.get(2), Some(21));

        hashes.remember(3, 30);
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes.get(1), None);
        assert_eq!(hashes.get(3), Some(30));
    }
}
