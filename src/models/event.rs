use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, Side, WinningSide};

/// Observable market events, in emission order per market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MarketEvent {
    #[serde(rename = "market_created")]
    MarketCreated { creator: String, title: String },

    #[serde(rename = "bet_placed")]
    BetPlaced { user: String, side: Side, amount: Amount },

    #[serde(rename = "vote_cast")]
    VoteCast { voter: String, side: Side, stake: Amount },

    #[serde(rename = "proof_submitted")]
    ProofSubmitted { creator: String, url: String },

    #[serde(rename = "betting_closed")]
    BettingClosed { total_yes_stake: Amount, total_no_stake: Amount },

    #[serde(rename = "bet_resolved_snapshot")]
    BetResolvedSnapshot {
        winning_side: WinningSide,
        total_winning_stake: Amount,
        total_losing_stake: Amount,
        platform_fee_amount: Amount,
        voter_reward_pool: Amount,
        winners_pool: Amount,
        winning_voter_count: u32,
        reward_per_winning_voter: Amount,
    },

    #[serde(rename = "bet_cancelled")]
    BetCancelled { reason: String },

    #[serde(rename = "funds_withdrawn")]
    FundsWithdrawn { user: String, amount_usd: Amount, amount_util: Amount },

    #[serde(rename = "collateral_returned")]
    CollateralReturned { creator: String, amount: Amount },

    #[serde(rename = "address_banned")]
    AddressBanned { address: String },
}

/// An event tagged with its market and emission time, as broadcast to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub market_id: Uuid,
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub event: MarketEvent,
}
