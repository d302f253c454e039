//! Which bonus quests a user is offered.

use chrono::{DateTime, Utc};

use super::reward::{BONUS_WINDOW_SECS, window_elapsed};
use crate::store::{CommonRecord, QuestKind, UserRecord};

/// Computes the quests currently offered to `user`.
///
/// The daily quest returns 24 hours after its last completion. Campaign
/// quests are offered when the campaign has a launch time and the user either
/// never completed them or completed them before the latest relaunch.
#[must_use]
pub fn active_quests(
    now: DateTime<Utc>,
    user: &UserRecord,
    common: Option<&CommonRecord>,
) -> Vec<QuestKind> {
    let mut active = Vec::new();

    if window_elapsed(now, user.last_time_daily_quest_completed, BONUS_WINDOW_SECS) {
        active.push(QuestKind::Daily);
    }

    let Some(common) = common else {
        return active;
    };

    for entry in &common.quest_types {
        if !matches!(
            entry.kind,
            QuestKind::SubscribeTgChannel | QuestKind::StartAnotherBot
        ) || active.contains(&entry.kind)
        {
            continue;
        }
        let Some(launched) = entry.update_time else {
            continue;
        };
        let offered = user
            .quest_completed_at(entry.kind)
            .is_none_or(|completed| launched > completed);
        if offered {
            active.push(entry.kind);
        }
    }

    active
}

/// The daily quest can only be completed after its link was handed out.
#[must_use]
pub const fn daily_prerequisite_met(user: &UserRecord) -> bool {
    user.last_time_twitter_link_clicked.is_some()
}
