use thiserror::Error;

use crate::ledger::LedgerError;
use crate::models::MarketStatus;

/// Why a caller may not perform an otherwise well-timed action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ineligibility {
    #[error("reputation {score} below required {required}")]
    LowReputation { score: u32, required: u32 },
    #[error("address is banned from this market")]
    Banned,
    #[error("creator cannot vote on own market")]
    CreatorCannotVote,
    #[error("participants with stake cannot vote")]
    BettorCannotVote,
    #[error("already voted")]
    AlreadyVoted,
    #[error("only the creator may do this")]
    NotCreator,
    #[error("no winnings")]
    NoWinnings,
    #[error("nothing to refund")]
    NothingToRefund,
    #[error("no voter rewards")]
    NoVoterRewards,
    #[error("no collateral locked")]
    NoCollateral,
    #[error("address already has stake in this market")]
    AlreadyStaked,
    #[error("creator already has {active} active markets (max {max})")]
    TooManyActiveMarkets { active: usize, max: usize },
    #[error("system accounts cannot act as users")]
    SystemAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    /// Called outside the phase or before the time the action needs.
    #[error("guard not met: {0}")]
    GuardNotMet(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("ineligible: {0}")]
    Ineligible(#[from] Ineligibility),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("market not found: {0}")]
    NotFound(String),
}

impl MarketError {
    pub(crate) fn wrong_status(expected: MarketStatus, actual: MarketStatus) -> Self {
        MarketError::GuardNotMet(format!("market is {actual}, expected {expected}"))
    }

    /// GuardNotMet is the expected outcome of polling early or twice.
    pub fn is_guard_not_met(&self) -> bool {
        matches!(self, MarketError::GuardNotMet(_))
    }

    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, MarketError::Ledger(LedgerError::InsufficientBalance { .. }))
    }
}
