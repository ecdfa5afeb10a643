pub mod api;
pub mod clock;
pub mod config;
pub mod errors;
pub mod keeper;
pub mod ledger;
pub mod market;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod reputation;
pub mod services;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::keeper::Keeper;
use crate::ledger::Ledger;
use crate::market::MarketContext;
use crate::models::EventEnvelope;
use crate::registry::{MarketRegistry, MarketStore};
use crate::reputation::ReputationStore;
use crate::services::notifier::Notifier;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MarketRegistry>,
    pub keeper: Keeper,
    pub config: AppConfig,
    pub ws_tx: broadcast::Sender<EventEnvelope>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    pub pause_flag: Arc<AtomicBool>,
}

impl AppState {
    /// Wire ledger, reputation, registry and keeper around one clock.
    pub fn build(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        notifier: Option<Arc<Notifier>>,
    ) -> anyhow::Result<Self> {
        let (ws_tx, _) = broadcast::channel::<EventEnvelope>(EVENT_CHANNEL_CAPACITY);

        let ctx = Arc::new(MarketContext {
            ledger: Ledger::with_clock(clock.clone()),
            reputation: ReputationStore::new(config.reputation_initial),
            clock: clock.clone(),
            events: ws_tx.clone(),
            treasury: config.treasury_account.clone(),
        });

        let store = MarketStore::new();
        let registry = MarketRegistry::new(store.clone(), ctx, config.registry_policy())?;
        let keeper = Keeper::new(store, clock, config.keeper_config(), notifier);

        Ok(Self {
            registry: Arc::new(registry),
            keeper,
            config,
            ws_tx,
            metrics_handle: crate::metrics::init_metrics(),
            pause_flag: Arc::new(AtomicBool::new(false)),
        })
    }
}
