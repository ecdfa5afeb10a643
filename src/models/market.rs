use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, MarketStatus, Side, WinningSide};

/// Immutable terms of a market, fixed by the registry at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetDetails {
    pub title: String,
    pub description: String,
    pub betting_deadline: DateTime<Utc>,
    pub proof_deadline: DateTime<Utc>,
    pub voting_deadline: DateTime<Utc>,
    /// Minimum USD amount of a single stake.
    pub minimum_bet: Amount,
    /// Each side must reach this USD total or betting closes into CANCELLED.
    pub minimum_side_stake: Amount,
    /// Reputation required to stake or vote.
    pub minimum_trust_score: u32,
    pub minimum_votes: u32,
    pub voter_reward_pct: u32,
    pub platform_fee_pct: u32,
    /// UTIL bond every voter posts.
    pub vote_stake: Amount,
}

/// A creation request. Percentages fall back to registry defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub betting_deadline: DateTime<Utc>,
    pub proof_deadline: DateTime<Utc>,
    pub voting_deadline: DateTime<Utc>,
    pub minimum_bet: Amount,
    pub minimum_side_stake: Amount,
    #[serde(default)]
    pub minimum_trust_score: u32,
    #[serde(default)]
    pub minimum_votes: u32,
    pub voter_reward_pct: Option<u32>,
    pub platform_fee_pct: Option<u32>,
}

/// Per-participant stake record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub yes_stake: Amount,
    pub no_stake: Amount,
    pub has_withdrawn: bool,
}

impl Participant {
    pub fn stake_on(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes_stake,
            Side::No => self.no_stake,
        }
    }

    pub fn total(&self) -> Amount {
        self.yes_stake.saturating_add(self.no_stake)
    }
}

/// Per-voter bond record. `stake_util` is zeroed once the bond is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub stake_util: Amount,
    pub vote: Side,
    pub has_voted: bool,
}

/// Settlement figures computed once at the COMPLETED transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSnapshot {
    pub winning_side: Side,
    pub total_winning_stake: Amount,
    pub total_losing_stake: Amount,
    pub platform_fee_amount: Amount,
    pub voter_reward_pool: Amount,
    pub winners_pool: Amount,
    pub winning_voter_count: u32,
    pub reward_per_winning_voter: Amount,
    /// USD that no claim can reach: the fee plus integer remainders.
    pub treasury_usd: Amount,
    /// UTIL bonds forfeited by voters on the losing side.
    pub forfeited_util: Amount,
}

/// Public resolution view; zeroed figures until the market completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionInfo {
    pub status: MarketStatus,
    pub winning_side: WinningSide,
    pub total_winning_stake: Amount,
    pub total_losing_stake: Amount,
    pub platform_fee_pct: u32,
    pub voter_reward_pct: u32,
    pub platform_fee_amount: Amount,
    pub voter_reward_pool: Amount,
    pub winners_pool: Amount,
    pub winning_voter_count: u32,
    pub reward_per_winning_voter: Amount,
}

/// Serializable snapshot of a market for API consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketView {
    pub id: Uuid,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub details: BetDetails,
    pub status: MarketStatus,
    pub total_yes_stake: Amount,
    pub total_no_stake: Amount,
    pub proof_url: String,
    pub winning_side: WinningSide,
    pub yes_votes: u32,
    pub no_votes: u32,
    pub participant_count: usize,
    pub voter_count: usize,
    pub funds_distributed: bool,
    pub collateral_locked: bool,
    pub creator_collateral: Amount,
    pub cancel_reason: Option<String>,
}
