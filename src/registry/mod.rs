pub mod store;

pub use store::MarketStore;

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::clock::Clock;
use crate::ledger::{Balances, Ledger};
use crate::market::resolution::exceeds_full_share;
use crate::market::{Ineligibility, Market, MarketContext, MarketError, MarketHandle};
use crate::models::{Amount, Asset, BetDetails, NewBet};
use crate::reputation::{ReputationEvent, ReputationStore};

/// Global market policy, fixed for the registry's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryPolicy {
    /// UTIL charged to the creator for every new market.
    pub creation_fee_util: Amount,
    /// Cap on a creator's non-terminal markets.
    pub max_active_markets: usize,
    pub default_platform_fee_pct: u32,
    pub default_voter_reward_pct: u32,
    /// UTIL bond each voter posts.
    pub vote_stake_util: Amount,
    /// Account collecting creation fees, platform fees and settlement dust.
    pub treasury: String,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self {
            creation_fee_util: 10,
            max_active_markets: 5,
            default_platform_fee_pct: 5,
            default_voter_reward_pct: 10,
            vote_stake_util: 10,
            treasury: "treasury".into(),
        }
    }
}

impl RegistryPolicy {
    pub fn validate(&self) -> Result<(), MarketError> {
        if exceeds_full_share(self.default_platform_fee_pct, self.default_voter_reward_pct) {
            return Err(MarketError::InvalidConfiguration(format!(
                "default platform fee {}% plus voter reward {}% exceeds 100%",
                self.default_platform_fee_pct, self.default_voter_reward_pct
            )));
        }
        if self.vote_stake_util == 0 {
            return Err(MarketError::InvalidConfiguration(
                "vote stake must be greater than zero".into(),
            ));
        }
        if self.max_active_markets == 0 {
            return Err(MarketError::InvalidConfiguration(
                "max active markets must be at least one".into(),
            ));
        }
        if self.treasury.trim().is_empty() {
            return Err(MarketError::InvalidConfiguration("treasury account must be set".into()));
        }
        Ok(())
    }
}

/// Creates markets, enforces global policy and fronts the ledger.
pub struct MarketRegistry {
    store: MarketStore,
    ctx: Arc<MarketContext>,
    policy: RegistryPolicy,
    creation_lock: Mutex<()>,
}

impl MarketRegistry {
    pub fn new(
        store: MarketStore,
        ctx: Arc<MarketContext>,
        policy: RegistryPolicy,
    ) -> Result<Self, MarketError> {
        policy.validate()?;
        if ctx.treasury != policy.treasury {
            return Err(MarketError::InvalidConfiguration(format!(
                "treasury mismatch: context {} vs policy {}",
                ctx.treasury, policy.treasury
            )));
        }
        Ok(Self {
            store,
            ctx,
            policy,
            creation_lock: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &MarketStore {
        &self.store
    }

    pub fn context(&self) -> &Arc<MarketContext> {
        &self.ctx
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ctx.ledger
    }

    pub fn reputation(&self) -> &ReputationStore {
        &self.ctx.reputation
    }

    pub fn policy(&self) -> &RegistryPolicy {
        &self.policy
    }

    /// Validate terms, charge the creation fee and open a new market.
    pub async fn create_bet(&self, creator: &str, bet: NewBet) -> Result<Uuid, MarketError> {
        self.ctx.ensure_user_account(creator)?;
        let now = self.ctx.clock.now();
        let details = self.build_details(bet, now)?;

        // Serialize creations so the active-market cap cannot be raced.
        let _guard = self.creation_lock.lock().await;

        let active = self.active_market_count(creator).await;
        if active >= self.policy.max_active_markets {
            return Err(Ineligibility::TooManyActiveMarkets {
                active,
                max: self.policy.max_active_markets,
            }
            .into());
        }

        let id = Uuid::new_v4();
        if self.policy.creation_fee_util > 0 {
            self.ctx.ledger.transfer(
                creator,
                &self.policy.treasury,
                Asset::Util,
                self.policy.creation_fee_util,
                &format!("create:{id}"),
            )?;
        }

        let market = Market::new(&self.ctx, id, creator.to_string(), details, now);
        self.store.insert(MarketHandle::new(market, self.ctx.clone()));
        self.ctx.reputation.record(creator, ReputationEvent::MarketCreated);

        counter!("markets_created_total").increment(1);
        tracing::info!(
            market_id = %id,
            creator = %creator,
            fee = self.policy.creation_fee_util,
            "Market created"
        );
        Ok(id)
    }

    /// Every market id ever created, in creation order.
    pub fn get_bets(&self) -> Vec<Uuid> {
        self.store.ids()
    }

    pub fn market(&self, id: Uuid) -> Result<MarketHandle, MarketError> {
        self.store
            .get(id)
            .ok_or_else(|| MarketError::NotFound(id.to_string()))
    }

    pub fn markets_by_creator(&self, creator: &str) -> Vec<MarketHandle> {
        self.store.by_creator(creator)
    }

    pub async fn active_market_count(&self, creator: &str) -> usize {
        let mut active = 0;
        for handle in self.store.by_creator(creator) {
            if !handle.status().await.is_terminal() {
                active += 1;
            }
        }
        active
    }

    // --- ledger surface ----------------------------------------------------

    pub fn get_internal_balances(&self, user: &str) -> Balances {
        self.ctx.ledger.balances(user)
    }

    pub fn deposit_usd(&self, user: &str, amount: Amount) -> Result<Amount, MarketError> {
        self.deposit(user, Asset::Usd, amount)
    }

    pub fn deposit_util(&self, user: &str, amount: Amount) -> Result<Amount, MarketError> {
        self.deposit(user, Asset::Util, amount)
    }

    pub fn withdraw_usd(&self, user: &str, amount: Amount) -> Result<Amount, MarketError> {
        self.withdraw(user, Asset::Usd, amount)
    }

    pub fn withdraw_util(&self, user: &str, amount: Amount) -> Result<Amount, MarketError> {
        self.withdraw(user, Asset::Util, amount)
    }

    pub fn deposit(&self, user: &str, asset: Asset, amount: Amount) -> Result<Amount, MarketError> {
        self.ctx.ensure_user_account(user)?;
        let balance = self.ctx.ledger.deposit(user, asset, amount)?;
        tracing::info!(user = %user, asset = %asset, amount, balance, "Deposit");
        Ok(balance)
    }

    pub fn withdraw(&self, user: &str, asset: Asset, amount: Amount) -> Result<Amount, MarketError> {
        self.ctx.ensure_user_account(user)?;
        let balance = self.ctx.ledger.withdraw(user, asset, amount)?;
        tracing::info!(user = %user, asset = %asset, amount, balance, "Withdrawal");
        Ok(balance)
    }

    fn build_details(&self, bet: NewBet, now: chrono::DateTime<chrono::Utc>) -> Result<BetDetails, MarketError> {
        if bet.title.trim().is_empty() {
            return Err(MarketError::InvalidConfiguration("title must not be empty".into()));
        }
        if bet.betting_deadline <= now {
            return Err(MarketError::InvalidConfiguration(
                "betting deadline must be in the future".into(),
            ));
        }
        if !(bet.betting_deadline < bet.proof_deadline && bet.proof_deadline < bet.voting_deadline) {
            return Err(MarketError::InvalidConfiguration(
                "deadlines must satisfy betting < proof < voting".into(),
            ));
        }
        if bet.minimum_bet == 0 {
            return Err(MarketError::InvalidConfiguration(
                "minimum bet must be greater than zero".into(),
            ));
        }

        let platform_fee_pct = bet.platform_fee_pct.unwrap_or(self.policy.default_platform_fee_pct);
        let voter_reward_pct = bet.voter_reward_pct.unwrap_or(self.policy.default_voter_reward_pct);
        if exceeds_full_share(platform_fee_pct, voter_reward_pct) {
            return Err(MarketError::InvalidConfiguration(format!(
                "platform fee {platform_fee_pct}% plus voter reward {voter_reward_pct}% exceeds 100%"
            )));
        }

        Ok(BetDetails {
            title: bet.title.trim().to_string(),
            description: bet.description,
            betting_deadline: bet.betting_deadline,
            proof_deadline: bet.proof_deadline,
            voting_deadline: bet.voting_deadline,
            minimum_bet: bet.minimum_bet,
            minimum_side_stake: bet.minimum_side_stake,
            minimum_trust_score: bet.minimum_trust_score,
            minimum_votes: bet.minimum_votes,
            voter_reward_pct,
            platform_fee_pct,
            vote_stake: self.policy.vote_stake_util,
        })
    }
}
