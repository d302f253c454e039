//! Referral reward tiers.

use chrono::{DateTime, Utc};

use super::reward::{BONUS_WINDOW_SECS, window_elapsed};

/// Gold credited to a referrer without a settled quest completion.
pub const REFERRAL_REWARD_BASE: u64 = 500;

/// Gold credited to a referrer whose last quest completion is a day old.
pub const REFERRAL_REWARD_SETTLED: u64 = 1000;

/// Reward tier picked from the referrer's daily-quest activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralTier {
    /// Completed the daily quest at least 24 hours ago.
    Settled,
    /// Completed the daily quest within the last 24 hours.
    Recent,
    /// Never completed the daily quest.
    NoActivity,
}

impl ReferralTier {
    #[must_use]
    pub const fn amount(self) -> u64 {
        match self {
            Self::Settled => REFERRAL_REWARD_SETTLED,
            Self::Recent | Self::NoActivity => REFERRAL_REWARD_BASE,
        }
    }
}

/// Picks the reward tier for a referrer at `now`.
#[must_use]
pub fn referral_tier(now: DateTime<Utc>, last_quest_completion: Option<DateTime<Utc>>) -> ReferralTier {
    match last_quest_completion {
        None => ReferralTier::NoActivity,
        Some(_) if window_elapsed(now, last_quest_completion, BONUS_WINDOW_SECS) => {
            ReferralTier::Settled
        }
        Some(_) => ReferralTier::Recent,
    }
}

/// Extracts the deep-link argument of a `/start` message.
///
/// Returns `None` if the text is not a start command, `Some(None)` for a
/// bare `/start`, and `Some(Some(code))` when a referral code is attached.
#[must_use]
pub fn parse_start(text: &str) -> Option<Option<&str>> {
    let mut parts = text.split_whitespace();
    let command = parts.next()?;
    let command = command.split_once('@').map_or(command, |(cmd, _bot)| cmd);
    if command != "/start" {
        return None;
    }
    Some(parts.next())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    #[test]
    fn test_referral_tiers() {
        let completed = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

        assert_eq!(referral_tier(completed, None).amount(), 500);
        assert_eq!(
            referral_tier(completed + TimeDelta::hours(23), Some(completed)),
            ReferralTier::Recent
        );
        assert_eq!(
            referral_tier(completed + TimeDelta::hours(23), Some(completed)).amount(),
            500
        );
        assert_eq!(
            referral_tier(completed + TimeDelta::hours(25), Some(completed)),
            ReferralTier::Settled
        );
        assert_eq!(
            referral_tier(completed + TimeDelta::hours(25), Some(completed)).amount(),
            1000
        );
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(parse_start("/start"), Some(None));
        assert_eq!(parse_start("/start abc-123"), Some(Some("abc-123")));
        assert_eq!(parse_start("/start@pillage_bot abc"), Some(Some("abc")));
        assert_eq!(parse_start("  /start   abc  "), Some(Some("abc")));
        assert_eq!(parse_start("/stats"), None);
        assert_eq!(parse_start("hello"), None);
        assert_eq!(parse_start(""), None);
    }
}
