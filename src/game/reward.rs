//! Claim cooldown and reward amount.

use chrono::{DateTime, TimeDelta, Utc};

/// Time between two successful claims.
pub const CLAIM_COOLDOWN_SECS: i64 = 4 * 60 * 60;

/// Age the bonus-quest completion must reach before claims pay double.
pub const BONUS_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Outcome of evaluating a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDecision {
    /// The cooldown has elapsed; credit `amount` and restart the cooldown.
    Granted { amount: u64, doubled: bool },
    /// The cooldown is still running.
    Cooldown { remaining: TimeDelta },
}

/// Whether at least `window_secs` passed since `since`. Unset counts as elapsed.
#[must_use]
pub fn window_elapsed(now: DateTime<Utc>, since: Option<DateTime<Utc>>, window_secs: i64) -> bool {
    since.is_none_or(|at| now.signed_duration_since(at) >= TimeDelta::seconds(window_secs))
}

/// Decides a claim made at `now`.
///
/// The doubling condition looks only at `last_bonus_completion`; it is
/// independent of the claim cooldown.
#[must_use]
pub fn evaluate_claim(
    now: DateTime<Utc>,
    last_claim: Option<DateTime<Utc>>,
    last_bonus_completion: Option<DateTime<Utc>>,
    base_reward: u64,
) -> ClaimDecision {
    if !window_elapsed(now, last_claim, CLAIM_COOLDOWN_SECS) {
        return ClaimDecision::Cooldown {
            remaining: remaining_time(now, last_claim),
        };
    }

    let doubled = last_bonus_completion.is_some()
        && window_elapsed(now, last_bonus_completion, BONUS_WINDOW_SECS);
    let amount = if doubled {
        base_reward.saturating_mul(2)
    } else {
        base_reward
    };

    ClaimDecision::Granted { amount, doubled }
}

/// Time left until the next claim is allowed. Never negative and never
/// longer than the cooldown itself, even if `now` precedes `last_claim`.
#[must_use]
pub fn remaining_time(now: DateTime<Utc>, last_claim: Option<DateTime<Utc>>) -> TimeDelta {
    let cooldown = TimeDelta::seconds(CLAIM_COOLDOWN_SECS);
    let Some(last_claim) = last_claim else {
        return TimeDelta::zero();
    };
    let elapsed = now.signed_duration_since(last_claim).max(TimeDelta::zero());
    if elapsed >= cooldown {
        TimeDelta::zero()
    } else {
        cooldown - elapsed
    }
}

/// Formats a duration as zero-padded `HH:MM:SS`, truncating sub-second parts.
#[must_use]
pub fn format_hms(duration: TimeDelta) -> String {
    let total = duration.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
