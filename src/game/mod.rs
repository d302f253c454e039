//! Game rules and the operations built on them.
//!
//! `reward`, `referral` and `quests` are pure functions of timestamps;
//! `service` applies them to stored user records.

pub mod quests;
pub mod referral;
pub mod reward;
mod service;

pub use reward::{ClaimDecision, format_hms};
pub use service::{
    ClaimOutcome, GameError, GameService, QuestCheck, ReferralOutcome, ReferrerLookup,
    StartOutcome,
};
