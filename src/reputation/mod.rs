use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

pub const MAX_SCORE: u32 = 1_000;

/// Score-changing events. Each has a fixed, bounded effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReputationEvent {
    MarketCreated,
    /// First stake a user places in a given market.
    Participated,
    VoteCast,
    VotedWithMajority,
    /// Creator let the proof deadline lapse.
    ProofMissed,
    VotedWithMinority,
}

impl ReputationEvent {
    /// Signed score delta applied by this event.
    pub fn delta(self) -> i64 {
        match self {
            ReputationEvent::MarketCreated => 5,
            ReputationEvent::Participated => 2,
            ReputationEvent::VoteCast => 1,
            ReputationEvent::VotedWithMajority => 2,
            ReputationEvent::ProofMissed => -20,
            ReputationEvent::VotedWithMinority => -2,
        }
    }
}

/// Per-user integer reputation in `[0, MAX_SCORE]`.
///
/// Reads never wait on a market; mutations are restricted to the market
/// engine and registry.
#[derive(Clone)]
pub struct ReputationStore {
    scores: Arc<RwLock<HashMap<String, u32>>>,
    initial: u32,
}

impl ReputationStore {
    pub fn new(initial: u32) -> Self {
        Self {
            scores: Arc::new(RwLock::new(HashMap::new())),
            initial: initial.min(MAX_SCORE),
        }
    }

    pub fn score(&self, user: &str) -> u32 {
        self.scores.read().get(user).copied().unwrap_or(self.initial)
    }

    /// Apply an event, saturating at both bounds. Returns the new score.
    pub(crate) fn record(&self, user: &str, event: ReputationEvent) -> u32 {
        let mut scores = self.scores.write();
        let entry = scores.entry(user.to_string()).or_insert(self.initial);
        let old = *entry;
        *entry = (old as i64 + event.delta()).clamp(0, MAX_SCORE as i64) as u32;

        tracing::debug!(
            user = %user,
            event = ?event,
            old,
            new = *entry,
            "Reputation updated"
        );
        *entry
    }
}
