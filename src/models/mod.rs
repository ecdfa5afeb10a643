pub mod event;
pub mod market;

pub use event::{EventEnvelope, MarketEvent};
pub use market::{
    BetDetails, MarketView, NewBet, Participant, ResolutionInfo, ResolutionSnapshot, VoterRecord,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minor units of either asset. Balances never go negative.
pub type Amount = u64;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "YES" | "1" | "TRUE" => Some(Side::Yes),
            "NO" | "0" | "FALSE" => Some(Side::No),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

// ---------------------------------------------------------------------------
// WinningSide
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WinningSide {
    #[default]
    None,
    Yes,
    No,
}

impl From<Side> for WinningSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Yes => WinningSide::Yes,
            Side::No => WinningSide::No,
        }
    }
}

impl fmt::Display for WinningSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinningSide::None => write!(f, "NONE"),
            WinningSide::Yes => write!(f, "YES"),
            WinningSide::No => write!(f, "NO"),
        }
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// The two internal asset classes: settlement (USD) and utility (UTIL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Usd,
    Util,
}

impl Asset {
    pub const ALL: [Asset; 2] = [Asset::Usd, Asset::Util];

    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Usd => "USD",
            Asset::Util => "UTIL",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MarketStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Open,
    AwaitingProof,
    Voting,
    Completed,
    Cancelled,
}

impl MarketStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MarketStatus::Completed | MarketStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Open => "open",
            MarketStatus::AwaitingProof => "awaiting_proof",
            MarketStatus::Voting => "voting",
            MarketStatus::Completed => "completed",
            MarketStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
