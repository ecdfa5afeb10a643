use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use proofstake::clock::ManualClock;
use proofstake::config::AppConfig;
use proofstake::market::MarketHandle;
use proofstake::models::{Amount, NewBet};
use proofstake::AppState;

pub const CREATOR: &str = "0xcreator";

pub fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-06-01T09:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// In-memory application wired to a clock the test controls.
pub struct Harness {
    pub state: AppState,
    pub clock: ManualClock,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let clock = ManualClock::new(start());
        let state = AppState::build(config, Arc::new(clock.clone()), None)
            .expect("Failed to build app state");
        Self { state, clock }
    }

    pub fn fund(&self, user: &str, usd: Amount, util: Amount) {
        if usd > 0 {
            self.state.registry.deposit_usd(user, usd).expect("deposit usd");
        }
        if util > 0 {
            self.state.registry.deposit_util(user, util).expect("deposit util");
        }
    }

    /// A market whose deadlines are 1h/2h/3h after the current instant.
    pub async fn create_market(&self, minimum_side_stake: Amount, minimum_votes: u32) -> MarketHandle {
        self.fund(CREATOR, 0, self.state.config.creation_fee_util);
        let id = self
            .state
            .registry
            .create_bet(CREATOR, new_bet(self.now(), minimum_side_stake, minimum_votes))
            .await
            .expect("Failed to create market");
        self.market(id)
    }

    pub fn market(&self, id: Uuid) -> MarketHandle {
        self.state.registry.market(id).expect("market exists")
    }

    pub fn now(&self) -> DateTime<Utc> {
        proofstake::clock::Clock::now(&self.clock)
    }

    /// Move the clock to just past `hours` after the harness start.
    pub fn advance_to(&self, hours: i64) {
        self.clock.set(start() + Duration::hours(hours) + Duration::seconds(1));
    }
}

#[allow(dead_code)]
pub fn new_bet(now: DateTime<Utc>, minimum_side_stake: Amount, minimum_votes: u32) -> NewBet {
    NewBet {
        title: "Marathon finished under 4h".into(),
        description: "Creator claims a sub-4h marathon finish".into(),
        betting_deadline: now + Duration::hours(1),
        proof_deadline: now + Duration::hours(2),
        voting_deadline: now + Duration::hours(3),
        minimum_bet: 10,
        minimum_side_stake,
        minimum_trust_score: 0,
        minimum_votes,
        voter_reward_pct: Some(10),
        platform_fee_pct: Some(5),
    }
}
