//! Monitoring loop.
//!
//! One scheduled cycle per interval. A cycle runs to completion, hedge
//! execution included, before the next tick is taken; ticks missed while
//! a cycle runs are skipped, not queued. Out-of-band price updates are
//! checked against the hard limits between ticks and can start one
//! emergency cycle per breach. Each underlying has its own emergency
//! latch, so a breach on one book never mutes another.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hedge_core::{MarketSnapshot, Position};
use hedge_risk::EmergencyBreach;
use hedge_risk::EmergencyLatch;
use hedge_telemetry::{HedgingStatsReporter, Metrics};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::engine::{CycleOutcome, HedgingEngine};
use crate::error::EngineResult;
use crate::positions::{group_by_underlying, PositionSource};

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTrigger {
    Scheduled,
    Emergency,
    Once,
}

impl CycleTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Emergency => "emergency",
            Self::Once => "once",
        }
    }
}

/// Price observed outside the scheduled snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: f64,
    pub at: DateTime<Utc>,
}

impl PriceUpdate {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            at: Utc::now(),
        }
    }
}

/// Periodic driver for one portfolio.
pub struct MonitoringLoop {
    engine: Arc<HedgingEngine>,
    positions: Arc<dyn PositionSource>,
    config: MonitorConfig,
    /// Emergency latches keyed by underlying.
    latches: DashMap<String, EmergencyLatch>,
    stats: Arc<HedgingStatsReporter>,
    /// Positions of the last scheduled cycle, re-analyzed on price updates.
    last_positions: Mutex<Vec<Position>>,
}

impl MonitoringLoop {
    pub fn new(
        engine: Arc<HedgingEngine>,
        positions: Arc<dyn PositionSource>,
        config: MonitorConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            engine,
            positions,
            config,
            latches: DashMap::new(),
            stats: Arc::new(HedgingStatsReporter::new()),
            last_positions: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn with_stats(mut self, stats: Arc<HedgingStatsReporter>) -> Self {
        self.stats = stats;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<HedgingStatsReporter> {
        &self.stats
    }

    /// True while `underlying` has a hard-limit breach not yet cleared by
    /// a scheduled cycle.
    pub fn is_latched(&self, underlying: &str) -> bool {
        self.latches
            .get(underlying)
            .is_some_and(|latch| latch.is_triggered())
    }

    /// Returns true when the latch for `underlying` was newly triggered.
    fn trigger_latch(&self, underlying: &str, breach: EmergencyBreach, at: DateTime<Utc>) -> bool {
        self.latches
            .entry(underlying.to_string())
            .or_default()
            .trigger(breach, at)
    }

    /// Channel for out-of-band price updates, sized from the config.
    pub fn price_channel(&self) -> (mpsc::Sender<PriceUpdate>, mpsc::Receiver<PriceUpdate>) {
        mpsc::channel(self.config.price_channel_capacity)
    }

    /// Run until `cancel` fires.
    pub async fn run(&self, mut updates: mpsc::Receiver<PriceUpdate>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_ms = self.config.interval_ms,
            observe_only = self.config.observe_only,
            "Monitoring loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_once(CycleTrigger::Scheduled, &cancel).await;
                }
                Some(update) = updates.recv() => {
                    self.on_price_update(update, &cancel).await;
                }
            }
        }

        info!("Monitoring loop stopped");
    }

    /// One full cycle over every book in the portfolio.
    pub async fn run_once(
        &self,
        trigger: CycleTrigger,
        cancel: &CancellationToken,
    ) -> Vec<CycleOutcome> {
        let started = Instant::now();
        Metrics::cycle_started(trigger.as_str());

        let positions = match self.positions.positions() {
            Ok(positions) => positions,
            Err(e) => {
                error!(error = %e, "Failed to load positions, skipping cycle");
                Metrics::cycle_failed("positions");
                return Vec::new();
            }
        };
        *self.last_positions.lock() = positions.clone();

        let books = group_by_underlying(&positions);
        let symbols: Vec<String> = books.keys().cloned().collect();
        let now = Utc::now();
        let market = self.engine.market();
        let snapshot = market.snapshot(&symbols, now).await;
        for symbol in snapshot.stale_symbols() {
            Metrics::stale_quote(&symbol);
        }

        let mut outcomes = Vec::with_capacity(books.len());
        for (underlying, book) in &books {
            if cancel.is_cancelled() {
                info!("Stop requested, skipping remaining books");
                break;
            }
            outcomes.push(self.run_book(underlying, book, &snapshot, cancel).await);
        }

        if !cancel.is_cancelled() {
            for outcome in &outcomes {
                match &outcome.breach {
                    Some(breach) => {
                        if self.trigger_latch(&outcome.underlying, breach.clone(), now) {
                            Metrics::emergency_triggered();
                        }
                    }
                    None => {
                        if let Some(latch) = self.latches.get(&outcome.underlying) {
                            latch.reset();
                        }
                    }
                }
            }
            self.latches.retain(|underlying, _| books.contains_key(underlying));
        }

        let evicted = market.evict_expired(now);
        if evicted > 0 {
            debug!(evicted, "Evicted expired market data");
        }
        Metrics::cycle_duration(trigger.as_str(), started.elapsed().as_secs_f64() * 1000.0);
        outcomes
    }

    /// Re-check the hard limits for the updated underlying and run an
    /// emergency cycle on a new breach.
    pub async fn on_price_update(
        &self,
        update: PriceUpdate,
        cancel: &CancellationToken,
    ) -> Option<CycleOutcome> {
        let market = self.engine.market();
        market.apply_price_update(&update.symbol, update.price, update.at);

        if self.is_latched(&update.symbol) {
            debug!(symbol = %update.symbol, "Emergency already active, waiting for next tick");
            return None;
        }

        let book: Vec<Position> = self
            .last_positions
            .lock()
            .iter()
            .filter(|p| p.symbol == update.symbol)
            .cloned()
            .collect();
        if book.is_empty() {
            return None;
        }

        let snapshot = market.snapshot(&[update.symbol.clone()], update.at).await;
        let report = match self.engine.analyze_exposure(&book, &snapshot) {
            Ok(report) => report,
            Err(e) => {
                warn!(symbol = %update.symbol, error = %e, "Out-of-band analysis failed");
                return None;
            }
        };
        let breach = self.engine.emergency_breach(&report)?;
        if !self.trigger_latch(&update.symbol, breach.clone(), update.at) {
            return None;
        }

        error!(
            symbol = %update.symbol,
            price = update.price,
            breach = %breach,
            "Hard limit breached between ticks, running emergency cycle"
        );
        Metrics::emergency_triggered();
        Metrics::cycle_started(CycleTrigger::Emergency.as_str());
        let started = Instant::now();
        let outcome = self.run_book(&update.symbol, &book, &snapshot, cancel).await;
        Metrics::cycle_duration(
            CycleTrigger::Emergency.as_str(),
            started.elapsed().as_secs_f64() * 1000.0,
        );
        Some(outcome)
    }

    async fn run_book(
        &self,
        underlying: &str,
        book: &[Position],
        snapshot: &MarketSnapshot,
        cancel: &CancellationToken,
    ) -> CycleOutcome {
        let conditions = self
            .engine
            .market()
            .conditions(underlying, snapshot, book)
            .await;

        if self.config.observe_only {
            let outcome = self.engine.plan_cycle(book, snapshot, &conditions);
            if let Some(strategy) = outcome.strategy.as_ref().filter(|s| s.requires_execution()) {
                info!(
                    underlying,
                    action = %strategy.action,
                    instruments = strategy.instruments.len(),
                    "Observation mode, strategy not executed"
                );
            }
            return outcome;
        }

        let outcome = self
            .engine
            .run_cycle(book, snapshot, &conditions, cancel)
            .await;
        if let Some(result) = &outcome.execution {
            self.stats.record(result);
        }
        outcome
    }
}
