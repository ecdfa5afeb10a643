//! Post-terminal claims. Each one is a single ledger movement out of the
//! market escrow followed by a flag flip, so a repeated call finds nothing
//! left to pay.

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::ledger::TransferLeg;
use crate::models::{Amount, Asset, MarketEvent, MarketStatus};

use super::error::{Ineligibility, MarketError};
use super::resolution::winner_payout;
use super::{Market, MarketContext};

impl Market {
    /// COMPLETED only: stake plus pro-rata share of the winners pool.
    pub fn claim_winnings(
        &mut self,
        ctx: &MarketContext,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<Amount, MarketError> {
        if self.status != MarketStatus::Completed {
            return Err(MarketError::wrong_status(MarketStatus::Completed, self.status));
        }
        let snapshot = self
            .resolution
            .as_ref()
            .ok_or_else(|| MarketError::GuardNotMet("resolution snapshot missing".into()))?;

        let stake = match self.participants.get(user) {
            Some(p) if !p.has_withdrawn => p.stake_on(snapshot.winning_side),
            _ => 0,
        };
        if stake == 0 {
            return Err(Ineligibility::NoWinnings.into());
        }

        let payout = winner_payout(stake, snapshot);
        ctx.ledger.transfer(
            &self.escrow,
            user,
            Asset::Usd,
            payout,
            &format!("claim:winnings:{}", self.id),
        )?;
        if let Some(p) = self.participants.get_mut(user) {
            p.has_withdrawn = true;
        }

        self.record_withdrawal(ctx, user, payout, 0, now, "Winnings claimed");
        Ok(payout)
    }

    /// CANCELLED only: every stake comes back in full.
    pub fn claim_refund(
        &mut self,
        ctx: &MarketContext,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<Amount, MarketError> {
        if self.status != MarketStatus::Cancelled {
            return Err(MarketError::wrong_status(MarketStatus::Cancelled, self.status));
        }

        let refund = match self.participants.get(user) {
            Some(p) if !p.has_withdrawn => p.total(),
            _ => 0,
        };
        if refund == 0 {
            return Err(Ineligibility::NothingToRefund.into());
        }

        ctx.ledger.transfer(
            &self.escrow,
            user,
            Asset::Usd,
            refund,
            &format!("claim:refund:{}", self.id),
        )?;
        if let Some(p) = self.participants.get_mut(user) {
            p.has_withdrawn = true;
        }

        self.record_withdrawal(ctx, user, refund, 0, now, "Refund claimed");
        Ok(refund)
    }

    /// Winning voters get their bond plus the per-voter reward once the
    /// market completes; after a cancellation every voter gets the bond back.
    /// Returns `(usd, util)` paid.
    pub fn claim_voter_rewards(
        &mut self,
        ctx: &MarketContext,
        voter: &str,
        now: DateTime<Utc>,
    ) -> Result<(Amount, Amount), MarketError> {
        let record = match self.voters.get(voter) {
            Some(v) if v.stake_util > 0 => v.clone(),
            _ if !self.status.is_terminal() => {
                return Err(MarketError::GuardNotMet(format!(
                    "market is {}, voter rewards open after resolution",
                    self.status
                )));
            }
            _ => return Err(Ineligibility::NoVoterRewards.into()),
        };

        let (usd, util) = match self.status {
            MarketStatus::Completed => {
                let snapshot = self
                    .resolution
                    .as_ref()
                    .ok_or_else(|| MarketError::GuardNotMet("resolution snapshot missing".into()))?;
                if record.vote != snapshot.winning_side {
                    return Err(Ineligibility::NoVoterRewards.into());
                }
                (snapshot.reward_per_winning_voter, record.stake_util)
            }
            MarketStatus::Cancelled => (0, record.stake_util),
            other => {
                return Err(MarketError::GuardNotMet(format!(
                    "market is {other}, voter rewards open after resolution"
                )));
            }
        };

        ctx.ledger.transfer_batch(
            &[
                TransferLeg::new(&self.escrow, voter, Asset::Usd, usd),
                TransferLeg::new(&self.escrow, voter, Asset::Util, util),
            ],
            &format!("claim:voter:{}", self.id),
        )?;
        if let Some(v) = self.voters.get_mut(voter) {
            v.stake_util = 0;
        }

        self.record_withdrawal(ctx, voter, usd, util, now, "Voter rewards claimed");
        Ok((usd, util))
    }

    /// Any terminal state, creator only: release the locked collateral.
    pub fn claim_creator_collateral(
        &mut self,
        ctx: &MarketContext,
        caller: &str,
        now: DateTime<Utc>,
    ) -> Result<Amount, MarketError> {
        if !self.status.is_terminal() {
            return Err(MarketError::GuardNotMet(format!(
                "market is {}, collateral unlocks at completion or cancellation",
                self.status
            )));
        }
        if caller != self.creator {
            return Err(Ineligibility::NotCreator.into());
        }
        if !self.collateral_locked {
            return Err(Ineligibility::NoCollateral.into());
        }

        let amount = self.creator_collateral;
        ctx.ledger.transfer(
            &self.escrow,
            caller,
            Asset::Usd,
            amount,
            &format!("claim:collateral:{}", self.id),
        )?;
        self.collateral_locked = false;

        counter!("claims_paid_total").increment(1);
        tracing::info!(market_id = %self.id, creator = %caller, amount, "Creator collateral returned");
        self.emit(
            ctx,
            now,
            MarketEvent::CollateralReturned {
                creator: caller.to_string(),
                amount,
            },
        );
        Ok(amount)
    }

    fn record_withdrawal(
        &mut self,
        ctx: &MarketContext,
        user: &str,
        amount_usd: Amount,
        amount_util: Amount,
        now: DateTime<Utc>,
        message: &'static str,
    ) {
        counter!("claims_paid_total").increment(1);
        tracing::info!(
            market_id = %self.id,
            user = %user,
            amount_usd,
            amount_util,
            "{message}"
        );
        self.emit(
            ctx,
            now,
            MarketEvent::FundsWithdrawn {
                user: user.to_string(),
                amount_usd,
                amount_util,
            },
        );
    }
}
