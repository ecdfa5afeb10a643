//! Deadline keeper: scans every market and applies the one check its
//! status implies. Holds no memory between cycles; every check is a
//! guarded no-op when its time has not come.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use metrics::{counter, gauge, histogram};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::clock::Clock;
use crate::market::{MarketError, MarketHandle, Transition};
use crate::models::MarketStatus;
use crate::registry::MarketStore;
use crate::services::notifier::{self, Notifier};

#[derive(Debug, Clone)]
pub struct KeeperConfig {
    pub interval: Duration,
    /// Markets checked in parallel within one cycle.
    pub concurrency: usize,
    /// A single market check is abandoned after this long and retried next cycle.
    pub call_timeout: Duration,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            concurrency: 16,
            call_timeout: Duration::from_millis(5_000),
        }
    }
}

/// What one market check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Terminal market, nothing to check.
    Skipped(MarketStatus),
    Unchanged,
    Advanced { from: MarketStatus, to: MarketStatus },
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionRecord {
    pub market_id: Uuid,
    pub from: MarketStatus,
    pub to: MarketStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub started_at: Option<DateTime<Utc>>,
    pub scanned: usize,
    pub skipped_terminal: usize,
    pub unchanged: usize,
    pub advanced: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub transitions: Vec<TransitionRecord>,
    pub elapsed_ms: u64,
}

impl CycleReport {
    fn record(&mut self, market_id: Uuid, outcome: &TickOutcome) {
        self.scanned += 1;
        match outcome {
            TickOutcome::Skipped(_) => self.skipped_terminal += 1,
            TickOutcome::Unchanged => self.unchanged += 1,
            TickOutcome::Advanced { from, to } => {
                self.advanced += 1;
                self.transitions.push(TransitionRecord {
                    market_id,
                    from: *from,
                    to: *to,
                });
            }
            TickOutcome::Failed(_) => self.failed += 1,
            TickOutcome::TimedOut => self.timed_out += 1,
        }
    }
}

#[derive(Clone)]
pub struct Keeper {
    store: MarketStore,
    clock: Arc<dyn Clock>,
    config: KeeperConfig,
    notifier: Option<Arc<Notifier>>,
    last_report: Arc<Mutex<Option<CycleReport>>>,
}

impl Keeper {
    pub fn new(
        store: MarketStore,
        clock: Arc<dyn Clock>,
        config: KeeperConfig,
        notifier: Option<Arc<Notifier>>,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            notifier,
            last_report: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report.lock().clone()
    }

    /// Apply the status-appropriate check to one market, bounded by the call timeout.
    pub async fn tick_market(&self, handle: &MarketHandle) -> TickOutcome {
        match timeout(self.config.call_timeout, check(handle)).await {
            Ok(Ok(Ok(Transition::Advanced { from, to }))) => TickOutcome::Advanced { from, to },
            Ok(Ok(Ok(Transition::Unchanged))) => TickOutcome::Unchanged,
            Ok(Ok(Err(e))) if e.is_guard_not_met() => TickOutcome::Unchanged,
            Ok(Ok(Err(e))) => TickOutcome::Failed(e.to_string()),
            Ok(Err(status)) => TickOutcome::Skipped(status),
            Err(_) => TickOutcome::TimedOut,
        }
    }

    /// One full pass over every market. Failures never abort the pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport {
            started_at: Some(self.clock.now()),
            ..CycleReport::default()
        };
        let handles = self.store.handles();
        let concurrency = self.config.concurrency.max(1);

        let outcomes: Vec<(MarketHandle, TickOutcome)> = stream::iter(handles)
            .map(|handle| async move {
                let outcome = self.tick_market(&handle).await;
                (handle, outcome)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for (handle, outcome) in &outcomes {
            report.record(handle.id(), outcome);
            match outcome {
                TickOutcome::Advanced { from, to } => {
                    counter!("keeper_transitions_total", "to" => to.as_str()).increment(1);
                    tracing::info!(market_id = %handle.id(), from = %from, to = %to, "Keeper advanced market");
                    if to.is_terminal() {
                        self.notify_terminal(handle).await;
                    }
                }
                TickOutcome::Failed(e) => {
                    counter!("keeper_failures_total").increment(1);
                    tracing::warn!(market_id = %handle.id(), error = %e, "Keeper check failed, retrying next cycle");
                }
                TickOutcome::TimedOut => {
                    counter!("keeper_failures_total").increment(1);
                    tracing::warn!(market_id = %handle.id(), "Keeper check timed out, retrying next cycle");
                }
                TickOutcome::Skipped(_) | TickOutcome::Unchanged => {}
            }
        }

        let elapsed = started.elapsed();
        report.elapsed_ms = elapsed.as_millis() as u64;

        counter!("keeper_cycles_total").increment(1);
        gauge!("keeper_last_cycle_markets").set(report.scanned as f64);
        histogram!("keeper_cycle_seconds").record(elapsed.as_secs_f64());

        tracing::debug!(
            scanned = report.scanned,
            advanced = report.advanced,
            failed = report.failed,
            timed_out = report.timed_out,
            "Keeper cycle complete"
        );

        *self.last_report.lock() = Some(report.clone());
        report
    }

    async fn notify_terminal(&self, handle: &MarketHandle) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let view = handle.view().await;
        let info = handle.resolution_info().await;
        let msg = notifier::format_terminal(
            view.id,
            &view.details.title,
            &info,
            view.cancel_reason.as_deref(),
        );
        notifier.send(&msg).await;
    }
}

/// `Err(status)` for terminal markets, otherwise the check's result.
async fn check(handle: &MarketHandle) -> Result<Result<Transition, MarketError>, MarketStatus> {
    let status = handle.status().await;
    let result = match status {
        MarketStatus::Open => handle.close_betting().await,
        MarketStatus::AwaitingProof => handle.cancel_for_missing_proof().await,
        MarketStatus::Voting => handle.resolve().await,
        MarketStatus::Completed | MarketStatus::Cancelled => return Err(status),
    };
    Ok(result)
}

/// Periodically run keeper cycles until the process exits.
pub async fn run_keeper(keeper: Keeper, pause_flag: Arc<AtomicBool>) {
    let mut ticker = interval(keeper.config.interval);

    tracing::info!(
        interval_secs = keeper.config.interval.as_secs(),
        concurrency = keeper.config.concurrency,
        "Keeper started"
    );

    loop {
        ticker.tick().await;

        if pause_flag.load(Ordering::Relaxed) {
            tracing::debug!("Keeper paused");
            continue;
        }

        if keeper.store.is_empty() {
            tracing::debug!("Keeper: no markets yet");
            continue;
        }

        keeper.run_cycle().await;
    }
}
