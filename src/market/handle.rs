use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{
    Amount, BetDetails, EventEnvelope, MarketStatus, MarketView, Participant, ResolutionInfo, Side,
    VoterRecord, WinningSide,
};

use super::{Market, MarketContext, MarketError, Transition};

/// Shared, serialized access to one market.
///
/// Every call locks the market, reads the clock, and runs the synchronous
/// operation to completion, so mutations on the same market never
/// interleave. Clones refer to the same market.
#[derive(Clone)]
pub struct MarketHandle {
    id: Uuid,
    creator: String,
    market: Arc<Mutex<Market>>,
    ctx: Arc<MarketContext>,
}

impl MarketHandle {
    pub fn new(market: Market, ctx: Arc<MarketContext>) -> Self {
        Self {
            id: market.id(),
            creator: market.creator().to_string(),
            market: Arc::new(Mutex::new(market)),
            ctx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    // --- reads -------------------------------------------------------------

    pub async fn details(&self) -> BetDetails {
        self.market.lock().await.details().clone()
    }

    pub async fn status(&self) -> MarketStatus {
        self.market.lock().await.status()
    }

    pub async fn total_yes_stake(&self) -> Amount {
        self.market.lock().await.total_yes_stake()
    }

    pub async fn total_no_stake(&self) -> Amount {
        self.market.lock().await.total_no_stake()
    }

    pub async fn proof_url(&self) -> String {
        self.market.lock().await.proof_url().to_string()
    }

    pub async fn winning_side(&self) -> WinningSide {
        self.market.lock().await.winning_side()
    }

    pub async fn resolution_info(&self) -> ResolutionInfo {
        self.market.lock().await.resolution_info()
    }

    pub async fn is_banned(&self, address: &str) -> bool {
        self.market.lock().await.is_banned(address)
    }

    pub async fn participant(&self, user: &str) -> Option<Participant> {
        self.market.lock().await.participant(user).cloned()
    }

    pub async fn voter(&self, user: &str) -> Option<VoterRecord> {
        self.market.lock().await.voter(user).cloned()
    }

    pub async fn view(&self) -> MarketView {
        self.market.lock().await.view()
    }

    pub async fn events(&self) -> Vec<EventEnvelope> {
        self.market.lock().await.events().to_vec()
    }

    // --- participation -----------------------------------------------------

    pub async fn place_bet(&self, user: &str, side: Side, amount: Amount) -> Result<(), MarketError> {
        let mut market = self.market.lock().await;
        market.place_bet(&self.ctx, user, side, amount, self.ctx.clock.now())
    }

    pub async fn vote(&self, voter: &str, side: Side) -> Result<(), MarketError> {
        let mut market = self.market.lock().await;
        market.vote(&self.ctx, voter, side, self.ctx.clock.now())
    }

    pub async fn submit_proof(&self, caller: &str, url: &str) -> Result<(), MarketError> {
        let mut market = self.market.lock().await;
        market.submit_proof(&self.ctx, caller, url, self.ctx.clock.now())
    }

    pub async fn ban(&self, caller: &str, address: &str) -> Result<(), MarketError> {
        let mut market = self.market.lock().await;
        market.ban(&self.ctx, caller, address, self.ctx.clock.now())
    }

    // --- deadline checks ---------------------------------------------------

    pub async fn close_betting(&self) -> Result<Transition, MarketError> {
        let mut market = self.market.lock().await;
        market.close_betting(&self.ctx, self.ctx.clock.now())
    }

    pub async fn cancel_for_missing_proof(&self) -> Result<Transition, MarketError> {
        let mut market = self.market.lock().await;
        market.cancel_for_missing_proof(&self.ctx, self.ctx.clock.now())
    }

    pub async fn resolve(&self) -> Result<Transition, MarketError> {
        let mut market = self.market.lock().await;
        market.resolve(&self.ctx, self.ctx.clock.now())
    }

    // --- claims ------------------------------------------------------------

    pub async fn claim_winnings(&self, user: &str) -> Result<Amount, MarketError> {
        let mut market = self.market.lock().await;
        market.claim_winnings(&self.ctx, user, self.ctx.clock.now())
    }

    pub async fn claim_refund(&self, user: &str) -> Result<Amount, MarketError> {
        let mut market = self.market.lock().await;
        market.claim_refund(&self.ctx, user, self.ctx.clock.now())
    }

    pub async fn claim_voter_rewards(&self, voter: &str) -> Result<(Amount, Amount), MarketError> {
        let mut market = self.market.lock().await;
        market.claim_voter_rewards(&self.ctx, voter, self.ctx.clock.now())
    }

    pub async fn claim_creator_collateral(&self, caller: &str) -> Result<Amount, MarketError> {
        let mut market = self.market.lock().await;
        market.claim_creator_collateral(&self.ctx, caller, self.ctx.clock.now())
    }

    #[cfg(test)]
    pub(crate) async fn lock_for_test(&self) -> tokio::sync::MutexGuard<'_, Market> {
        self.market.lock().await
    }
}
