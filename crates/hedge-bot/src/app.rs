//! Main application orchestration.
//!
//! Builds the gateways and engine from configuration, then drives the
//! monitoring loop until Ctrl-C.

use crate::config::{AppConfig, ClassifierConfig, FeedSource};
use crate::error::AppResult;
use hedge_classifier::{ClassifierModel, RiskClassifier};
use hedge_engine::{
    CycleOutcome, CycleTrigger, HedgingEngine, MonitoringLoop, PriceUpdate,
    StaticPositionSource,
};
use hedge_executor::{ExecutionGateway, PaperExecutionGateway, ReferencePrices};
use hedge_feed::{
    MarketDataGateway, MarketDataService, RestMarketDataGateway, StaticMarketDataGateway,
};
use hedge_telemetry::{HedgingStatsReporter, Metrics};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
    monitor: Arc<MonitoringLoop>,
    positions: Arc<StaticPositionSource>,
    stats: Arc<HedgingStatsReporter>,
    price_tx: mpsc::Sender<PriceUpdate>,
    price_rx: mpsc::Receiver<PriceUpdate>,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let market = Arc::new(MarketDataService::new(
            market_gateway(&config)?,
            config.feed.service.clone(),
        ));
        let prices = Arc::new(ReferencePrices::new());
        let execution: Arc<dyn ExecutionGateway> =
            Arc::new(PaperExecutionGateway::new(prices.clone(), &config.paper));
        let engine = HedgingEngine::new(
            config.engine.clone(),
            load_classifier(&config.classifier),
            market,
            execution,
        )?
        .with_reference_prices(prices);

        let positions = Arc::new(StaticPositionSource::new(config.positions.clone()));
        let stats = Arc::new(HedgingStatsReporter::new());
        let monitor = MonitoringLoop::new(
            Arc::new(engine),
            positions.clone(),
            config.monitor_config(),
        )?
        .with_stats(stats.clone());
        let (price_tx, price_rx) = monitor.price_channel();

        Ok(Self {
            config,
            monitor: Arc::new(monitor),
            positions,
            stats,
            price_tx,
            price_rx,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Position source shared with the monitoring loop.
    pub fn positions(&self) -> &Arc<StaticPositionSource> {
        &self.positions
    }

    /// Sender for out-of-band price updates. Updates are checked against
    /// the hard limits between ticks once `run` has started.
    pub fn price_sender(&self) -> mpsc::Sender<PriceUpdate> {
        self.price_tx.clone()
    }

    /// Run a single cycle over every book and print the statistics.
    pub async fn run_once(&self) -> Vec<CycleOutcome> {
        let outcomes = self
            .monitor
            .run_once(CycleTrigger::Once, &CancellationToken::new())
            .await;
        for outcome in &outcomes {
            log_outcome(outcome);
        }
        self.stats.output_summary();
        outcomes
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        info!(
            mode = ?self.config.mode,
            positions = self.config.positions.len(),
            interval_ms = self.config.monitor.interval_ms,
            "Starting application"
        );

        let cancel = CancellationToken::new();
        let price_rx = self.price_rx;

        let monitor = self.monitor.clone();
        let loop_cancel = cancel.clone();
        let monitor_handle = tokio::spawn(async move {
            monitor.run(price_rx, loop_cancel).await;
        });

        let period = self.config.stats_interval();
        let mut stats_interval = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = stats_interval.tick() => {
                    info!("Outputting periodic hedging summary");
                    self.stats.output_summary();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    cancel.cancel();
                    break;
                }
            }
        }

        if let Err(e) = monitor_handle.await {
            error!(error = %e, "Monitoring loop task failed");
        }

        info!("Final hedging summary:");
        self.stats.output_summary();
        match Metrics::encode_text() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
        Ok(())
    }
}

fn market_gateway(config: &AppConfig) -> AppResult<Arc<dyn MarketDataGateway>> {
    match config.feed.source {
        FeedSource::Static => {
            let mut gateway = StaticMarketDataGateway::new();
            for position in &config.positions {
                gateway = gateway.with_price(position.symbol.clone(), position.underlying_price);
            }
            info!(positions = config.positions.len(), "Using static market data");
            Ok(Arc::new(gateway))
        }
        FeedSource::Rest => {
            let gateway = RestMarketDataGateway::with_timeout(
                config.feed.rest_base_url.clone(),
                config.feed.rest_timeout(),
            )?;
            info!(base_url = %config.feed.rest_base_url, "Using REST market data");
            Ok(Arc::new(gateway))
        }
    }
}

/// A missing or broken artifact leaves the engine on rule-based ratios.
fn load_classifier(config: &ClassifierConfig) -> Option<RiskClassifier> {
    let path = config.model_path.as_deref()?;
    match ClassifierModel::load(path) {
        Ok(model) => Some(RiskClassifier::new(model)),
        Err(e) => {
            warn!(path = %path, error = %e, "Failed to load classifier model");
            None
        }
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    let action = outcome.strategy.as_ref().map(|s| s.action.as_str());
    let executed = outcome.execution.as_ref().map(|e| e.executed);
    match &outcome.error {
        Some(e) => warn!(
            underlying = %outcome.underlying,
            stage = ?outcome.failed_stage,
            error = %e,
            "Cycle finished with errors"
        ),
        None => info!(
            underlying = %outcome.underlying,
            action = ?action,
            executed = ?executed,
            alerts = outcome.alerts.len(),
            "Cycle finished"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatingMode;
    use chrono::{Duration, Utc};
    use hedge_core::{HedgeAction, OptionType, Position};
    use rust_decimal_macros::dec;

    fn straddle(quantity: f64) -> Vec<Position> {
        let expiry = Utc::now() + Duration::days(30);
        [OptionType::Call, OptionType::Put]
            .into_iter()
            .map(|t| Position::new("DOGEUSDT", dec!(0.35), expiry, t, quantity, 0.35, 0.5))
            .collect()
    }

    fn config(mode: OperatingMode, positions: Vec<Position>) -> AppConfig {
        let mut config = AppConfig {
            mode,
            positions,
            ..Default::default()
        };
        config.engine.strategy.timing.inter_order_delay_ms = 0;
        config
    }

    #[tokio::test]
    async fn test_observation_mode_plans_without_executing() {
        let app = Application::new(config(OperatingMode::Observation, straddle(1_000_000.0)))
            .unwrap();
        let outcomes = app.run_once().await;

        assert_eq!(outcomes.len(), 1);
        let strategy = outcomes[0].strategy.as_ref().unwrap();
        assert_eq!(strategy.action, HedgeAction::EmergencyHedge);
        assert!(outcomes[0].execution.is_none());
    }

    #[tokio::test]
    async fn test_trading_mode_fills_on_paper() {
        let app =
            Application::new(config(OperatingMode::Trading, straddle(1_000_000.0))).unwrap();
        let outcomes = app.run_once().await;

        let execution = outcomes[0].execution.as_ref().unwrap();
        assert!(execution.executed);
        assert!(!execution.fills.is_empty());
        assert!(execution.total_cost > rust_decimal::Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_missing_classifier_artifact_falls_back() {
        let mut cfg = config(OperatingMode::Observation, straddle(5_000.0));
        cfg.classifier.model_path = Some("/nonexistent/model.json".to_string());
        let app = Application::new(cfg).unwrap();
        let outcomes = app.run_once().await;

        let strategy = outcomes[0].strategy.as_ref().unwrap();
        assert_eq!(strategy.action, HedgeAction::NoHedgeNeeded);
        assert!(strategy.classifier.is_none());
    }

    #[tokio::test]
    async fn test_price_sender_feeds_monitor_channel() {
        let cfg = config(OperatingMode::Observation, straddle(5_000.0));
        let capacity = cfg.monitor.price_channel_capacity;
        let app = Application::new(cfg).unwrap();

        let tx = app.price_sender();
        assert!(!tx.is_closed());
        assert_eq!(tx.capacity(), capacity);
        tx.try_send(PriceUpdate::new("DOGEUSDT", 0.36)).unwrap();
        assert_eq!(app.price_sender().capacity(), capacity - 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = AppConfig::default();
        cfg.monitor.interval_ms = 0;
        assert!(Application::new(cfg).is_err());
    }
}
