pub mod claims;
pub mod error;
pub mod handle;
pub mod resolution;

pub use error::{Ineligibility, MarketError};
pub use handle::MarketHandle;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::clock::Clock;
use crate::ledger::{Ledger, TransferLeg};
use crate::models::{
    Amount, Asset, BetDetails, EventEnvelope, MarketEvent, MarketStatus, MarketView, Participant,
    ResolutionInfo, ResolutionSnapshot, Side, VoterRecord, WinningSide,
};
use crate::reputation::{ReputationEvent, ReputationStore};

use self::resolution::{compute_snapshot, ResolutionInput};

pub const REASON_MIN_SIDE_STAKE: &str = "minimum side stake not met";
pub const REASON_NO_PROOF: &str = "proof not submitted";
pub const REASON_TIE: &str = "tie";
pub const REASON_INSUFFICIENT_VOTES: &str = "insufficient votes";

const ESCROW_PREFIX: &str = "market:";

/// Shared services every market mutates through.
pub struct MarketContext {
    pub ledger: Ledger,
    pub reputation: ReputationStore,
    pub clock: Arc<dyn Clock>,
    pub events: broadcast::Sender<EventEnvelope>,
    pub treasury: String,
}

impl MarketContext {
    /// Escrow and treasury accounts move only through settlement, never as a caller.
    pub fn ensure_user_account(&self, account: &str) -> Result<(), MarketError> {
        if account.trim().is_empty() {
            return Err(MarketError::InvalidConfiguration("account must not be empty".into()));
        }
        if is_system_account(account, &self.treasury) {
            return Err(Ineligibility::SystemAccount.into());
        }
        Ok(())
    }
}

pub fn is_system_account(account: &str, treasury: &str) -> bool {
    account.starts_with(ESCROW_PREFIX) || account == treasury
}

/// Result of a deadline check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Transition {
    /// Guard not met, or the transition already happened.
    Unchanged,
    Advanced { from: MarketStatus, to: MarketStatus },
}

pub fn escrow_account(id: Uuid) -> String {
    format!("{ESCROW_PREFIX}{id}")
}

/// One claim market: stakes, votes, proof and settlement.
///
/// All methods are synchronous and either fully apply or leave the market
/// and the ledger untouched. Serialization per market is the caller's job
/// (see [`MarketHandle`]).
pub struct Market {
    id: Uuid,
    creator: String,
    created_at: DateTime<Utc>,
    details: BetDetails,
    escrow: String,

    status: MarketStatus,
    total_yes_stake: Amount,
    total_no_stake: Amount,
    proof_url: String,
    winning_side: WinningSide,
    funds_distributed: bool,
    collateral_locked: bool,
    creator_collateral: Amount,
    yes_votes: u32,
    no_votes: u32,
    cancel_reason: Option<String>,
    resolution: Option<ResolutionSnapshot>,

    participants: HashMap<String, Participant>,
    voters: HashMap<String, VoterRecord>,
    banned: HashSet<String>,
    events: Vec<EventEnvelope>,
}

impl Market {
    pub fn new(
        ctx: &MarketContext,
        id: Uuid,
        creator: String,
        details: BetDetails,
        now: DateTime<Utc>,
    ) -> Self {
        let title = details.title.clone();
        let mut market = Self {
            id,
            creator: creator.clone(),
            created_at: now,
            details,
            escrow: escrow_account(id),
            status: MarketStatus::Open,
            total_yes_stake: 0,
            total_no_stake: 0,
            proof_url: String::new(),
            winning_side: WinningSide::None,
            funds_distributed: false,
            collateral_locked: false,
            creator_collateral: 0,
            yes_votes: 0,
            no_votes: 0,
            cancel_reason: None,
            resolution: None,
            participants: HashMap::new(),
            voters: HashMap::new(),
            banned: HashSet::new(),
            events: Vec::new(),
        };
        market.emit(ctx, now, MarketEvent::MarketCreated { creator, title });
        market
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn details(&self) -> &BetDetails {
        &self.details
    }

    pub fn status(&self) -> MarketStatus {
        self.status
    }

    pub fn total_yes_stake(&self) -> Amount {
        self.total_yes_stake
    }

    pub fn total_no_stake(&self) -> Amount {
        self.total_no_stake
    }

    pub fn proof_url(&self) -> &str {
        &self.proof_url
    }

    pub fn winning_side(&self) -> WinningSide {
        self.winning_side
    }

    pub fn escrow(&self) -> &str {
        &self.escrow
    }

    pub fn collateral_locked(&self) -> bool {
        self.collateral_locked
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn participant(&self, user: &str) -> Option<&Participant> {
        self.participants.get(user)
    }

    pub fn voter(&self, user: &str) -> Option<&VoterRecord> {
        self.voters.get(user)
    }

    pub fn is_banned(&self, address: &str) -> bool {
        self.banned.contains(address)
    }

    pub fn events(&self) -> &[EventEnvelope] {
        &self.events
    }

    pub fn resolution_info(&self) -> ResolutionInfo {
        let snap = self.resolution.as_ref();
        ResolutionInfo {
            status: self.status,
            winning_side: self.winning_side,
            total_winning_stake: snap.map_or(0, |s| s.total_winning_stake),
            total_losing_stake: snap.map_or(0, |s| s.total_losing_stake),
            platform_fee_pct: self.details.platform_fee_pct,
            voter_reward_pct: self.details.voter_reward_pct,
            platform_fee_amount: snap.map_or(0, |s| s.platform_fee_amount),
            voter_reward_pool: snap.map_or(0, |s| s.voter_reward_pool),
            winners_pool: snap.map_or(0, |s| s.winners_pool),
            winning_voter_count: snap.map_or(0, |s| s.winning_voter_count),
            reward_per_winning_voter: snap.map_or(0, |s| s.reward_per_winning_voter),
        }
    }

    pub fn view(&self) -> MarketView {
        MarketView {
            id: self.id,
            creator: self.creator.clone(),
            created_at: self.created_at,
            details: self.details.clone(),
            status: self.status,
            total_yes_stake: self.total_yes_stake,
            total_no_stake: self.total_no_stake,
            proof_url: self.proof_url.clone(),
            winning_side: self.winning_side,
            yes_votes: self.yes_votes,
            no_votes: self.no_votes,
            participant_count: self.participants.len(),
            voter_count: self.voters.len(),
            funds_distributed: self.funds_distributed,
            collateral_locked: self.collateral_locked,
            creator_collateral: self.creator_collateral,
            cancel_reason: self.cancel_reason.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Participation
    // -----------------------------------------------------------------------

    /// Stake `amount` USD on `side`. The creator's first stake also locks an
    /// equal collateral amount.
    pub fn place_bet(
        &mut self,
        ctx: &MarketContext,
        user: &str,
        side: Side,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        ctx.ensure_user_account(user)?;
        self.require_status(MarketStatus::Open)?;
        if now >= self.details.betting_deadline {
            return Err(MarketError::GuardNotMet("betting deadline has passed".into()));
        }
        if amount == 0 {
            return Err(MarketError::InvalidConfiguration(
                "stake amount must be greater than zero".into(),
            ));
        }
        if amount < self.details.minimum_bet {
            return Err(MarketError::InvalidConfiguration(format!(
                "stake {amount} below minimum {}",
                self.details.minimum_bet
            )));
        }
        if self.banned.contains(user) {
            return Err(Ineligibility::Banned.into());
        }
        self.require_trust(ctx, user)?;

        let first_stake = !self.participants.contains_key(user);
        let collateral = if user == self.creator && first_stake {
            amount
        } else {
            0
        };

        let reason = format!("bet:{}:{}", self.id, side);
        ctx.ledger.transfer_batch(
            &[
                TransferLeg::new(user, &self.escrow, Asset::Usd, amount),
                TransferLeg::new(user, &self.escrow, Asset::Usd, collateral),
            ],
            &reason,
        )?;

        let record = self.participants.entry(user.to_string()).or_default();
        match side {
            Side::Yes => {
                record.yes_stake += amount;
                self.total_yes_stake += amount;
            }
            Side::No => {
                record.no_stake += amount;
                self.total_no_stake += amount;
            }
        }
        if collateral > 0 {
            self.creator_collateral = collateral;
            self.collateral_locked = true;
        }
        if first_stake {
            ctx.reputation.record(user, ReputationEvent::Participated);
        }

        counter!("bets_placed_total").increment(1);
        tracing::info!(
            market_id = %self.id,
            user = %user,
            side = %side,
            amount,
            collateral,
            "Bet placed"
        );
        self.emit(
            ctx,
            now,
            MarketEvent::BetPlaced {
                user: user.to_string(),
                side,
                amount,
            },
        );
        Ok(())
    }

    /// Cast a vote by posting the market's UTIL bond.
    pub fn vote(
        &mut self,
        ctx: &MarketContext,
        voter: &str,
        side: Side,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        ctx.ensure_user_account(voter)?;
        self.require_status(MarketStatus::Voting)?;
        if now >= self.details.voting_deadline {
            return Err(MarketError::GuardNotMet("voting deadline has passed".into()));
        }
        if voter == self.creator {
            return Err(Ineligibility::CreatorCannotVote.into());
        }
        if self.participants.get(voter).is_some_and(|p| p.total() > 0) {
            return Err(Ineligibility::BettorCannotVote.into());
        }
        if self.voters.get(voter).is_some_and(|v| v.has_voted) {
            return Err(Ineligibility::AlreadyVoted.into());
        }
        if self.banned.contains(voter) {
            return Err(Ineligibility::Banned.into());
        }
        self.require_trust(ctx, voter)?;

        let stake = self.details.vote_stake;
        ctx.ledger.transfer(
            voter,
            &self.escrow,
            Asset::Util,
            stake,
            &format!("vote:{}:{}", self.id, side),
        )?;

        self.voters.insert(
            voter.to_string(),
            VoterRecord {
                stake_util: stake,
                vote: side,
                has_voted: true,
            },
        );
        match side {
            Side::Yes => self.yes_votes += 1,
            Side::No => self.no_votes += 1,
        }
        ctx.reputation.record(voter, ReputationEvent::VoteCast);

        counter!("votes_cast_total").increment(1);
        tracing::info!(market_id = %self.id, voter = %voter, side = %side, stake, "Vote cast");
        self.emit(
            ctx,
            now,
            MarketEvent::VoteCast {
                voter: voter.to_string(),
                side,
                stake,
            },
        );
        Ok(())
    }

    /// Creator publishes the evidence URL, opening the vote.
    pub fn submit_proof(
        &mut self,
        ctx: &MarketContext,
        caller: &str,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        self.require_status(MarketStatus::AwaitingProof)?;
        if caller != self.creator {
            return Err(Ineligibility::NotCreator.into());
        }
        let url = url.trim();
        if url.is_empty() {
            return Err(MarketError::InvalidConfiguration(
                "proof url must not be empty".into(),
            ));
        }
        if now >= self.details.proof_deadline {
            return Err(MarketError::GuardNotMet("proof deadline has passed".into()));
        }

        self.proof_url = url.to_string();
        self.status = MarketStatus::Voting;

        tracing::info!(market_id = %self.id, url = %url, "Proof submitted, voting open");
        self.emit(
            ctx,
            now,
            MarketEvent::ProofSubmitted {
                creator: caller.to_string(),
                url: url.to_string(),
            },
        );
        Ok(())
    }

    /// Creator bars an address that has not staked yet.
    pub fn ban(
        &mut self,
        ctx: &MarketContext,
        caller: &str,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        self.require_status(MarketStatus::Open)?;
        if caller != self.creator {
            return Err(Ineligibility::NotCreator.into());
        }
        if address == self.creator {
            return Err(MarketError::InvalidConfiguration(
                "creator cannot ban themselves".into(),
            ));
        }
        ctx.ensure_user_account(address)?;
        if self.participants.get(address).is_some_and(|p| p.total() > 0) {
            return Err(Ineligibility::AlreadyStaked.into());
        }

        if self.banned.insert(address.to_string()) {
            tracing::info!(market_id = %self.id, address = %address, "Address banned");
            self.emit(
                ctx,
                now,
                MarketEvent::AddressBanned {
                    address: address.to_string(),
                },
            );
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Deadline checks: no-ops outside their guard
    // -----------------------------------------------------------------------

    pub fn close_betting(
        &mut self,
        ctx: &MarketContext,
        now: DateTime<Utc>,
    ) -> Result<Transition, MarketError> {
        if self.status != MarketStatus::Open || now < self.details.betting_deadline {
            return Ok(Transition::Unchanged);
        }

        let min = self.details.minimum_side_stake;
        if self.total_yes_stake < min || self.total_no_stake < min {
            return Ok(self.cancel(ctx, REASON_MIN_SIDE_STAKE, now));
        }

        self.status = MarketStatus::AwaitingProof;
        tracing::info!(
            market_id = %self.id,
            yes = self.total_yes_stake,
            no = self.total_no_stake,
            "Betting closed, awaiting proof"
        );
        self.emit(
            ctx,
            now,
            MarketEvent::BettingClosed {
                total_yes_stake: self.total_yes_stake,
                total_no_stake: self.total_no_stake,
            },
        );
        Ok(Transition::Advanced {
            from: MarketStatus::Open,
            to: MarketStatus::AwaitingProof,
        })
    }

    pub fn cancel_for_missing_proof(
        &mut self,
        ctx: &MarketContext,
        now: DateTime<Utc>,
    ) -> Result<Transition, MarketError> {
        if self.status != MarketStatus::AwaitingProof
            || now < self.details.proof_deadline
            || !self.proof_url.is_empty()
        {
            return Ok(Transition::Unchanged);
        }

        ctx.reputation.record(&self.creator, ReputationEvent::ProofMissed);
        Ok(self.cancel(ctx, REASON_NO_PROOF, now))
    }

    /// Close the vote: majority wins, ties and thin turnout cancel.
    pub fn resolve(
        &mut self,
        ctx: &MarketContext,
        now: DateTime<Utc>,
    ) -> Result<Transition, MarketError> {
        if self.status != MarketStatus::Voting || now < self.details.voting_deadline {
            return Ok(Transition::Unchanged);
        }

        let total_votes = self.yes_votes + self.no_votes;
        if total_votes == 0 || total_votes < self.details.minimum_votes {
            return Ok(self.cancel(ctx, REASON_INSUFFICIENT_VOTES, now));
        }
        if self.yes_votes == self.no_votes {
            return Ok(self.cancel(ctx, REASON_TIE, now));
        }

        let winner = if self.yes_votes > self.no_votes {
            Side::Yes
        } else {
            Side::No
        };
        let (winning_stake, losing_stake) = match winner {
            Side::Yes => (self.total_yes_stake, self.total_no_stake),
            Side::No => (self.total_no_stake, self.total_yes_stake),
        };

        let losing_voter_bonds: Amount = self
            .voters
            .values()
            .filter(|v| v.vote != winner)
            .map(|v| v.stake_util)
            .sum();
        let snapshot = compute_snapshot(&ResolutionInput {
            winning_side: winner,
            total_winning_stake: winning_stake,
            total_losing_stake: losing_stake,
            platform_fee_pct: self.details.platform_fee_pct,
            voter_reward_pct: self.details.voter_reward_pct,
            winning_voter_count: match winner {
                Side::Yes => self.yes_votes,
                Side::No => self.no_votes,
            },
            losing_voter_bonds,
            winner_stakes: self
                .participants
                .values()
                .map(|p| p.stake_on(winner))
                .filter(|&s| s > 0)
                .collect(),
        })?;

        ctx.ledger.transfer_batch(
            &[
                TransferLeg::new(&self.escrow, &ctx.treasury, Asset::Usd, snapshot.treasury_usd),
                TransferLeg::new(&self.escrow, &ctx.treasury, Asset::Util, snapshot.forfeited_util),
            ],
            &format!("resolve:{}", self.id),
        )?;

        for (address, record) in self.voters.iter_mut() {
            if record.vote == winner {
                ctx.reputation.record(address, ReputationEvent::VotedWithMajority);
            } else {
                // Bond already swept with the settlement.
                record.stake_util = 0;
                ctx.reputation.record(address, ReputationEvent::VotedWithMinority);
            }
        }

        self.status = MarketStatus::Completed;
        self.winning_side = winner.into();
        self.funds_distributed = true;

        tracing::info!(
            market_id = %self.id,
            winning_side = %winner,
            winning_stake = snapshot.total_winning_stake,
            losing_stake = snapshot.total_losing_stake,
            platform_fee = snapshot.platform_fee_amount,
            winners_pool = snapshot.winners_pool,
            "Market resolved"
        );
        self.emit(
            ctx,
            now,
            MarketEvent::BetResolvedSnapshot {
                winning_side: self.winning_side,
                total_winning_stake: snapshot.total_winning_stake,
                total_losing_stake: snapshot.total_losing_stake,
                platform_fee_amount: snapshot.platform_fee_amount,
                voter_reward_pool: snapshot.voter_reward_pool,
                winners_pool: snapshot.winners_pool,
                winning_voter_count: snapshot.winning_voter_count,
                reward_per_winning_voter: snapshot.reward_per_winning_voter,
            },
        );
        self.resolution = Some(snapshot);

        Ok(Transition::Advanced {
            from: MarketStatus::Voting,
            to: MarketStatus::Completed,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn cancel(&mut self, ctx: &MarketContext, reason: &str, now: DateTime<Utc>) -> Transition {
        let from = self.status;
        self.status = MarketStatus::Cancelled;
        self.winning_side = WinningSide::None;
        self.cancel_reason = Some(reason.to_string());

        tracing::info!(market_id = %self.id, from = %from, reason = reason, "Market cancelled");
        self.emit(
            ctx,
            now,
            MarketEvent::BetCancelled {
                reason: reason.to_string(),
            },
        );
        Transition::Advanced {
            from,
            to: MarketStatus::Cancelled,
        }
    }

    fn require_status(&self, expected: MarketStatus) -> Result<(), MarketError> {
        if self.status != expected {
            return Err(MarketError::wrong_status(expected, self.status));
        }
        Ok(())
    }

    fn require_trust(&self, ctx: &MarketContext, user: &str) -> Result<(), MarketError> {
        let score = ctx.reputation.score(user);
        let required = self.details.minimum_trust_score;
        if score < required {
            return Err(Ineligibility::LowReputation { score, required }.into());
        }
        Ok(())
    }

    pub(crate) fn emit(&mut self, ctx: &MarketContext, now: DateTime<Utc>, event: MarketEvent) {
        let envelope = EventEnvelope {
            market_id: self.id,
            seq: self.events.len() as u64 + 1,
            at: now,
            event,
        };
        // No live subscribers is fine; the log keeps the history.
        let _ = ctx.events.send(envelope.clone());
        self.events.push(envelope);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;

    pub(crate) const TREASURY: &str = "treasury";

    pub(crate) fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    pub(crate) fn context() -> MarketContext {
        let clock = Arc::new(ManualClock::new(start()));
        let (events, _) = broadcast::channel(64);
        MarketContext {
            ledger: Ledger::with_clock(clock.clone()),
            reputation: ReputationStore::new(50),
            clock,
            events,
            treasury: TREASURY.to_string(),
        }
    }

    pub(crate) fn details(min_side: Amount, min_votes: u32) -> BetDetails {
        BetDetails {
            title: "It will rain on Friday".into(),
            description: String::new(),
            betting_deadline: start() + Duration::hours(1),
            proof_deadline: start() + Duration::hours(2),
            voting_deadline: start() + Duration::hours(3),
            minimum_bet: 10,
            minimum_side_stake: min_side,
            minimum_trust_score: 0,
            minimum_votes: min_votes,
            voter_reward_pct: 10,
            platform_fee_pct: 5,
            vote_stake: 10,
        }
    }

    pub(crate) fn market(ctx: &MarketContext, details: BetDetails) -> Market {
        Market::new(ctx, Uuid::new_v4(), "creator".into(), details, start())
    }

    pub(crate) fn fund(ctx: &MarketContext, user: &str, usd: Amount, util: Amount) {
        if usd > 0 {
            ctx.ledger.deposit(user, Asset::Usd, usd).unwrap();
        }
        if util > 0 {
            ctx.ledger.deposit(user, Asset::Util, util).unwrap();
        }
    }

    pub(crate) fn after(hours: i64) -> DateTime<Utc> {
        start() + Duration::hours(hours) + Duration::seconds(1)
    }

    #[test]
    fn test_bet_moves_funds_into_escrow() {
        let ctx = context();
        let mut m = market(&ctx, details(100, 1));
        fund(&ctx, "alice", 500, 0);

        m.place_bet(&ctx, "alice", Side::Yes, 150, start()).unwrap();

        assert_eq!(m.total_yes_stake(), 150);
        assert_eq!(m.participant("alice").unwrap().yes_stake, 150);
        assert_eq!(ctx.ledger.balance("alice", Asset::Usd), 350);
        assert_eq!(ctx.ledger.balance(m.escrow(), Asset::Usd), 150);
        assert_eq!(ctx.reputation.score("alice"), 52);
    }

    #[test]
    fn test_creator_first_stake_locks_collateral() {
        let ctx = context();
        let mut m = market(&ctx, details(100, 1));
        fund(&ctx, "creator", 1_000, 0);

        m.place_bet(&ctx, "creator", Side::Yes, 100, start()).unwrap();
        assert!(m.collateral_locked());
        assert_eq!(ctx.ledger.balance("creator", Asset::Usd), 800);

        // Only the first stake is doubled.
        m.place_bet(&ctx, "creator", Side::Yes, 50, start()).unwrap();
        assert_eq!(ctx.ledger.balance("creator", Asset::Usd), 750);
        assert_eq!(m.total_yes_stake(), 150);
        assert_eq!(m.view().creator_collateral, 100);
    }

    #[test]
    fn test_creator_without_double_funds_is_rejected() {
        let ctx = context();
        let mut m = market(&ctx, details(100, 1));
        fund(&ctx, "creator", 150, 0);

        let err = m.place_bet(&ctx, "creator", Side::No, 100, start()).unwrap_err();
        assert!(err.is_insufficient_balance());
        assert!(!m.collateral_locked());
        assert_eq!(m.total_no_stake(), 0);
        assert_eq!(ctx.ledger.balance("creator", Asset::Usd), 150);
    }

    #[test]
    fn test_bet_validation() {
        let ctx = context();
        let mut d = details(100, 1);
        d.minimum_trust_score = 60;
        let mut m = market(&ctx, d);
        fund(&ctx, "alice", 500, 0);

        let err = m.place_bet(&ctx, "alice", Side::Yes, 100, start()).unwrap_err();
        assert_eq!(
            err,
            MarketError::Ineligible(Ineligibility::LowReputation { score: 50, required: 60 })
        );

        let err = m.place_bet(&ctx, "alice", Side::Yes, 0, start()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidConfiguration(_)));

        let err = m.place_bet(&ctx, "alice", Side::Yes, 5, start()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidConfiguration(_)));

        let err = m.place_bet(&ctx, "alice", Side::Yes, 100, after(1)).unwrap_err();
        assert!(err.is_guard_not_met());
        assert_eq!(ctx.ledger.balance("alice", Asset::Usd), 500);
    }

    #[test]
    fn test_banned_address_cannot_bet() {
        let ctx = context();
        let mut m = market(&ctx, details(0, 1));
        fund(&ctx, "mallory", 500, 0);
        fund(&ctx, "alice", 500, 0);

        let err = m.ban(&ctx, "alice", "mallory", start()).unwrap_err();
        assert_eq!(err, MarketError::Ineligible(Ineligibility::NotCreator));

        m.ban(&ctx, "creator", "mallory", start()).unwrap();
        assert!(m.is_banned("mallory"));
        let err = m.place_bet(&ctx, "mallory", Side::No, 50, start()).unwrap_err();
        assert_eq!(err, MarketError::Ineligible(Ineligibility::Banned));

        m.place_bet(&ctx, "alice", Side::No, 50, start()).unwrap();
        let err = m.ban(&ctx, "creator", "alice", start()).unwrap_err();
        assert_eq!(err, MarketError::Ineligible(Ineligibility::AlreadyStaked));
    }

    #[test]
    fn test_close_betting_before_deadline_is_noop() {
        let ctx = context();
        let mut m = market(&ctx, details(100, 1));
        assert_eq!(m.close_betting(&ctx, start()).unwrap(), Transition::Unchanged);
        assert_eq!(m.status(), MarketStatus::Open);
    }

    #[test]
    fn test_submit_proof_rules() {
        let ctx = context();
        let mut m = market(&ctx, details(0, 1));
        m.close_betting(&ctx, after(1)).unwrap();
        assert_eq!(m.status(), MarketStatus::AwaitingProof);

        let err = m.submit_proof(&ctx, "alice", "https://x", after(1)).unwrap_err();
        assert_eq!(err, MarketError::Ineligible(Ineligibility::NotCreator));

        let err = m.submit_proof(&ctx, "creator", "   ", after(1)).unwrap_err();
        assert!(matches!(err, MarketError::InvalidConfiguration(_)));

        let err = m.submit_proof(&ctx, "creator", "https://x", after(2)).unwrap_err();
        assert!(err.is_guard_not_met());

        m.submit_proof(&ctx, "creator", "https://proof.example/1", after(1)).unwrap();
        assert_eq!(m.status(), MarketStatus::Voting);
        assert_eq!(m.proof_url(), "https://proof.example/1");

        let err = m.submit_proof(&ctx, "creator", "https://x", after(1)).unwrap_err();
        assert!(err.is_guard_not_met());
    }

    #[test]
    fn test_proof_submitted_market_is_not_cancelled() {
        let ctx = context();
        let mut m = market(&ctx, details(0, 1));
        m.close_betting(&ctx, after(1)).unwrap();
        m.submit_proof(&ctx, "creator", "https://proof", after(1)).unwrap();

        assert_eq!(m.cancel_for_missing_proof(&ctx, after(2)).unwrap(), Transition::Unchanged);
        assert_eq!(m.status(), MarketStatus::Voting);
    }

    #[test]
    fn test_missing_proof_penalizes_creator() {
        let ctx = context();
        let mut m = market(&ctx, details(0, 1));
        m.close_betting(&ctx, after(1)).unwrap();

        assert_eq!(
            m.cancel_for_missing_proof(&ctx, after(1)).unwrap(),
            Transition::Unchanged
        );
        assert_eq!(
            m.cancel_for_missing_proof(&ctx, after(2)).unwrap(),
            Transition::Advanced {
                from: MarketStatus::AwaitingProof,
                to: MarketStatus::Cancelled
            }
        );
        assert_eq!(m.cancel_reason(), Some(REASON_NO_PROOF));
        assert_eq!(ctx.reputation.score("creator"), 30);
    }

    fn voting_market(ctx: &MarketContext, min_votes: u32) -> Market {
        let mut m = market(ctx, details(100, min_votes));
        fund(ctx, "yes_bettor", 1_000, 0);
        fund(ctx, "no_bettor", 1_000, 0);
        m.place_bet(ctx, "yes_bettor", Side::Yes, 150, start()).unwrap();
        m.place_bet(ctx, "no_bettor", Side::No, 120, start()).unwrap();
        m.close_betting(ctx, after(1)).unwrap();
        m.submit_proof(ctx, "creator", "https://proof", after(1)).unwrap();
        m
    }

    #[test]
    fn test_vote_eligibility() {
        let ctx = context();
        let mut m = voting_market(&ctx, 1);
        fund(&ctx, "voter", 0, 100);
        fund(&ctx, "creator", 0, 100);
        fund(&ctx, "yes_bettor", 0, 100);

        let err = m.vote(&ctx, "creator", Side::Yes, after(1)).unwrap_err();
        assert_eq!(err, MarketError::Ineligible(Ineligibility::CreatorCannotVote));

        let err = m.vote(&ctx, "yes_bettor", Side::Yes, after(1)).unwrap_err();
        assert_eq!(err, MarketError::Ineligible(Ineligibility::BettorCannotVote));

        m.vote(&ctx, "voter", Side::No, after(1)).unwrap();
        let err = m.vote(&ctx, "voter", Side::Yes, after(1)).unwrap_err();
        assert_eq!(err, MarketError::Ineligible(Ineligibility::AlreadyVoted));

        assert_eq!(ctx.ledger.balance("voter", Asset::Util), 90);
        assert_eq!(ctx.ledger.balance(m.escrow(), Asset::Util), 10);
    }

    #[test]
    fn test_vote_without_util_rejected() {
        let ctx = context();
        let mut m = voting_market(&ctx, 1);

        let err = m.vote(&ctx, "broke", Side::Yes, after(1)).unwrap_err();
        assert!(err.is_insufficient_balance());
        assert!(m.voter("broke").is_none());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let ctx = context();
        let mut m = voting_market(&ctx, 1);
        fund(&ctx, "v1", 0, 10);
        m.vote(&ctx, "v1", Side::Yes, after(1)).unwrap();

        assert_eq!(m.resolve(&ctx, after(2)).unwrap(), Transition::Unchanged);
        assert!(matches!(m.resolve(&ctx, after(3)).unwrap(), Transition::Advanced { .. }));
        let treasury_after_first = ctx.ledger.balances(TREASURY);
        let events_after_first = m.events().len();

        assert_eq!(m.resolve(&ctx, after(3)).unwrap(), Transition::Unchanged);
        assert_eq!(ctx.ledger.balances(TREASURY), treasury_after_first);
        assert_eq!(m.events().len(), events_after_first);
        assert_eq!(treasury_after_first.usd, 6);
    }

    #[test]
    fn test_losing_voter_bond_is_forfeited() {
        let ctx = context();
        let mut m = voting_market(&ctx, 1);
        for v in ["v1", "v2", "v3"] {
            fund(&ctx, v, 0, 10);
        }
        m.vote(&ctx, "v1", Side::No, after(1)).unwrap();
        m.vote(&ctx, "v2", Side::No, after(1)).unwrap();
        m.vote(&ctx, "v3", Side::Yes, after(1)).unwrap();
        m.resolve(&ctx, after(3)).unwrap();

        assert_eq!(m.winning_side(), WinningSide::No);
        assert_eq!(m.voter("v3").unwrap().stake_util, 0);
        assert_eq!(ctx.ledger.balance(TREASURY, Asset::Util), 10);
        assert_eq!(ctx.reputation.score("v3"), 49);
        assert_eq!(ctx.reputation.score("v1"), 53);
    }

    #[test]
    fn test_events_are_ordered_and_broadcast() {
        let ctx = context();
        let mut rx = ctx.events.subscribe();
        let mut m = market(&ctx, details(0, 1));
        fund(&ctx, "alice", 100, 0);
        m.place_bet(&ctx, "alice", Side::Yes, 10, start()).unwrap();

        let seqs: Vec<u64> = m.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert!(matches!(m.events()[1].event, MarketEvent::BetPlaced { amount: 10, .. }));

        let created = rx.try_recv().unwrap();
        assert!(matches!(created.event, MarketEvent::MarketCreated { .. }));
        let placed = rx.try_recv().unwrap();
        assert_eq!(placed.seq, 2);
        assert!(matches!(placed.event, MarketEvent::BetPlaced { .. }));
    }
}
