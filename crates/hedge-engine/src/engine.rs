//! Hedging engine service.
//!
//! One call covers one book: the positions on a single underlying. The
//! monitoring loop splits the portfolio by underlying and calls the engine
//! once per book.

use std::sync::Arc;

use chrono::Utc;
use hedge_classifier::RiskClassifier;
use hedge_core::{
    ClassifierOutcome, ExecutionResult, ExposureReport, HedgingStrategy, MarketConditions,
    MarketSnapshot, Position,
};
use hedge_executor::{ExecutionGateway, HedgeExecutor, ReferencePrices};
use hedge_feed::MarketDataService;
use hedge_greeks::GreeksCalculator;
use hedge_risk::{Alert, AlertMonitor, EmergencyBreach, EmergencyCheck, ExposureAggregator};
use hedge_strategy::StrategyGenerator;
use hedge_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Stage at which a cycle stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    Analyze,
    Execute,
}

impl CycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Execute => "execute",
        }
    }
}

/// Structured result of one cycle for one book.
///
/// Always returned, even on failure: `failed_stage` names where the
/// cycle stopped and the optional fields hold whatever was produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub underlying: String,
    pub report: Option<ExposureReport>,
    pub strategy: Option<HedgingStrategy>,
    pub execution: Option<ExecutionResult>,
    pub alerts: Vec<Alert>,
    pub breach: Option<EmergencyBreach>,
    pub failed_stage: Option<CycleStage>,
    pub error: Option<String>,
}

impl CycleOutcome {
    fn new(underlying: &str) -> Self {
        Self {
            underlying: underlying.to_string(),
            report: None,
            strategy: None,
            execution: None,
            alerts: Vec::new(),
            breach: None,
            failed_stage: None,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failed_stage.is_none()
    }
}

/// Gamma/delta hedging engine with injected gateways.
pub struct HedgingEngine {
    greeks: GreeksCalculator,
    aggregator: ExposureAggregator,
    classifier: Option<RiskClassifier>,
    generator: StrategyGenerator,
    executor: HedgeExecutor,
    alerts: AlertMonitor,
    emergency: EmergencyCheck,
    market: Arc<MarketDataService>,
    reference_prices: Option<Arc<ReferencePrices>>,
    min_balance: Decimal,
}

impl HedgingEngine {
    /// Build an engine. `classifier` is `None` when no trained model is
    /// available; strategies then use the rule-based ratio only.
    pub fn new(
        config: EngineConfig,
        classifier: Option<RiskClassifier>,
        market: Arc<MarketDataService>,
        execution: Arc<dyn ExecutionGateway>,
    ) -> EngineResult<Self> {
        config.validate()?;
        if classifier.is_none() {
            warn!("No classifier model loaded, using rule-based hedge ratios only");
        }
        let thresholds = config.strategy.thresholds.clone();
        Ok(Self {
            greeks: GreeksCalculator::new(config.greeks),
            aggregator: ExposureAggregator::new(thresholds.clone()),
            classifier,
            generator: StrategyGenerator::new(config.strategy)?,
            executor: HedgeExecutor::new(execution, config.executor),
            alerts: AlertMonitor::new(config.alerts),
            emergency: EmergencyCheck::new(thresholds),
            market,
            reference_prices: None,
            min_balance: config.min_balance,
        })
    }

    /// Publish snapshot prices to a shared reference table (paper fills).
    #[must_use]
    pub fn with_reference_prices(mut self, prices: Arc<ReferencePrices>) -> Self {
        self.reference_prices = Some(prices);
        self
    }

    pub fn market(&self) -> &Arc<MarketDataService> {
        &self.market
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    // ========================================================================
    // Exposed operations
    // ========================================================================

    /// Greeks per position, then aggregate. Pure given its inputs.
    pub fn analyze_exposure(
        &self,
        positions: &[Position],
        snapshot: &MarketSnapshot,
    ) -> EngineResult<ExposureReport> {
        let greeks: Vec<_> = positions
            .iter()
            .map(|p| self.greeks.compute_greeks(p, snapshot))
            .collect();
        Ok(self.aggregator.aggregate(positions, &greeks, snapshot)?)
    }

    /// Classify (when a model is loaded) and generate a strategy.
    pub fn generate_strategy(
        &self,
        report: &ExposureReport,
        conditions: &MarketConditions,
    ) -> HedgingStrategy {
        let outcome = self.classify(report, conditions);
        let strategy = self
            .generator
            .generate(report, conditions, outcome.as_ref(), Utc::now());
        Metrics::action_decided(strategy.action.as_str());
        Metrics::classifier_confidence(strategy.confidence);
        strategy
    }

    /// Execute a strategy after the balance pre-check.
    pub async fn execute_strategy(
        &self,
        strategy: &HedgingStrategy,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        if strategy.requires_execution() {
            if let Err(e) = self.check_balance().await {
                warn!(error = %e, "Balance pre-check failed, not executing");
                let mut result = ExecutionResult::nothing_to_do(
                    strategy.action,
                    strategy.exposure_delta,
                    strategy.exposure_gamma,
                    Utc::now(),
                );
                result.executed = false;
                result.error = Some(e.to_string());
                return result;
            }
        }
        self.executor.execute(strategy, cancel).await
    }

    /// Analyze, plan and execute one book.
    pub async fn run_cycle(
        &self,
        positions: &[Position],
        snapshot: &MarketSnapshot,
        conditions: &MarketConditions,
        cancel: &CancellationToken,
    ) -> CycleOutcome {
        let mut outcome = self.plan_cycle(positions, snapshot, conditions);
        let Some(strategy) = outcome.strategy.as_ref() else {
            return outcome;
        };
        if !strategy.requires_execution() {
            return outcome;
        }

        let result = self.execute_strategy(strategy, cancel).await;
        if !result.executed {
            outcome.failed_stage = Some(CycleStage::Execute);
            outcome.error = result.error.clone();
            Metrics::cycle_failed(CycleStage::Execute.as_str());
        }
        outcome.execution = Some(result);
        outcome
    }

    /// Analyze and plan one book without executing.
    pub fn plan_cycle(
        &self,
        positions: &[Position],
        snapshot: &MarketSnapshot,
        conditions: &MarketConditions,
    ) -> CycleOutcome {
        let mut outcome = CycleOutcome::new(&conditions.underlying);
        if let Some(prices) = &self.reference_prices {
            for (symbol, quote) in &snapshot.quotes {
                prices.update_f64(symbol.clone(), quote.price);
            }
        }

        let report = match self.analyze_exposure(positions, snapshot) {
            Ok(report) => report,
            Err(e) => {
                warn!(underlying = %conditions.underlying, error = %e, "Exposure analysis failed");
                Metrics::cycle_failed(CycleStage::Analyze.as_str());
                outcome.failed_stage = Some(CycleStage::Analyze);
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };

        Metrics::exposure(
            &conditions.underlying,
            report.total_gamma,
            report.total_delta,
            report.hedging_urgency,
            report.concentration,
        );
        if !report.excluded.is_empty() {
            Metrics::positions_excluded(report.excluded.len());
        }
        info!(
            underlying = %conditions.underlying,
            total_gamma = report.total_gamma,
            total_delta = report.total_delta,
            risk_level = ?report.risk_level,
            urgency = report.hedging_urgency,
            stale = report.is_stale(),
            "Exposure analyzed"
        );

        outcome.alerts = self.alerts.check_exposure(&report);
        outcome.breach = self.emergency.evaluate(&report);

        let strategy = self.generate_strategy(&report, conditions);
        if let Some(alert) = self.alerts.check_cost(strategy.expected_cost) {
            outcome.alerts.push(alert);
        }
        for alert in &outcome.alerts {
            Metrics::alert(alert.kind.as_str());
        }

        outcome.report = Some(report);
        outcome.strategy = Some(strategy);
        outcome
    }

    /// Hard-threshold breach for a report, if any.
    pub fn emergency_breach(&self, report: &ExposureReport) -> Option<EmergencyBreach> {
        self.emergency.evaluate(report)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn classify(
        &self,
        report: &ExposureReport,
        conditions: &MarketConditions,
    ) -> Option<ClassifierOutcome> {
        let classifier = self.classifier.as_ref()?;
        match classifier.classify(report, conditions) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Classifier unavailable for this cycle, using rule-based ratio");
                None
            }
        }
    }

    /// Unreachable or unsupported balance endpoints skip the check.
    async fn check_balance(&self) -> EngineResult<()> {
        if self.min_balance <= Decimal::ZERO {
            return Ok(());
        }
        match self.market.balance().await {
            Ok(balance) if balance.available < self.min_balance => {
                Err(EngineError::InsufficientBalance {
                    available: balance.available,
                    required: self.min_balance,
                })
            }
            Ok(_) => Ok(()),
            Err(e) => {
                debug!(error = %e, "Balance unavailable, skipping pre-check");
                Ok(())
            }
        }
    }
}
