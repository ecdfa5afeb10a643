//! Settlement arithmetic for a completed market.
//!
//! All figures are integer minor units. Percentages truncate; the winners
//! pool absorbs the remainder of the fee/reward split, so
//! `platform_fee + voter_reward_pool + winners_pool == losing_stake` exactly.
//! Whatever the per-winner and per-voter floor divisions cannot hand out is
//! routed to the treasury together with the fee, so escrow drains to zero.

use crate::models::{Amount, ResolutionSnapshot, Side};

use super::error::MarketError;

/// Inputs gathered from a market at the moment it completes.
#[derive(Debug, Clone)]
pub struct ResolutionInput {
    pub winning_side: Side,
    pub total_winning_stake: Amount,
    pub total_losing_stake: Amount,
    pub platform_fee_pct: u32,
    pub voter_reward_pct: u32,
    pub winning_voter_count: u32,
    /// UTIL bonds of voters who backed the losing side.
    pub losing_voter_bonds: Amount,
    /// Each winner's stake on the winning side.
    pub winner_stakes: Vec<Amount>,
}

fn pct_of(amount: Amount, pct: u32) -> Amount {
    // pct <= 100, so the result never exceeds `amount`.
    (amount as u128 * pct as u128 / 100) as Amount
}

/// Pro-rata share of the winners pool for one winning stake.
fn pool_share(own_stake: Amount, total_winning_stake: Amount, winners_pool: Amount) -> Amount {
    if total_winning_stake == 0 {
        return 0;
    }
    (own_stake as u128 * winners_pool as u128 / total_winning_stake as u128) as Amount
}

/// Fee and reward percentages together may claim at most the whole losing pool.
pub fn exceeds_full_share(platform_fee_pct: u32, voter_reward_pct: u32) -> bool {
    u64::from(platform_fee_pct) + u64::from(voter_reward_pct) > 100
}

pub fn compute_snapshot(input: &ResolutionInput) -> Result<ResolutionSnapshot, MarketError> {
    if exceeds_full_share(input.platform_fee_pct, input.voter_reward_pct) {
        return Err(MarketError::InvalidConfiguration(format!(
            "platform fee {}% plus voter reward {}% exceeds 100%",
            input.platform_fee_pct, input.voter_reward_pct
        )));
    }

    let losing = input.total_losing_stake;
    let platform_fee_amount = pct_of(losing, input.platform_fee_pct);
    let voter_reward_pool = pct_of(losing, input.voter_reward_pct);
    let winners_pool = losing - platform_fee_amount - voter_reward_pool;

    let reward_per_winning_voter = if input.winning_voter_count > 0 {
        voter_reward_pool / input.winning_voter_count as Amount
    } else {
        0
    };
    let voter_dust = voter_reward_pool - reward_per_winning_voter * input.winning_voter_count as Amount;

    let distributed: Amount = input
        .winner_stakes
        .iter()
        .map(|&stake| pool_share(stake, input.total_winning_stake, winners_pool))
        .sum();
    let winners_dust = winners_pool.checked_sub(distributed).ok_or_else(|| {
        MarketError::InvalidConfiguration("winner stakes exceed the winning total".into())
    })?;

    Ok(ResolutionSnapshot {
        winning_side: input.winning_side,
        total_winning_stake: input.total_winning_stake,
        total_losing_stake: losing,
        platform_fee_amount,
        voter_reward_pool,
        winners_pool,
        winning_voter_count: input.winning_voter_count,
        reward_per_winning_voter,
        treasury_usd: platform_fee_amount + voter_dust + winners_dust,
        forfeited_util: input.losing_voter_bonds,
    })
}

/// Stake returned plus pro-rata share of the winners pool.
pub fn winner_payout(own_stake: Amount, snapshot: &ResolutionSnapshot) -> Amount {
    own_stake + pool_share(own_stake, snapshot.total_winning_stake, snapshot.winners_pool)
}
