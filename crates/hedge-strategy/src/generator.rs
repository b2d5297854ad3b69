//! Strategy generator.

use crate::config::StrategyConfig;
use crate::error::StrategyResult;
use crate::instruments::InstrumentSelector;
use chrono::{DateTime, Utc};
use hedge_core::{
    ClassifierOutcome, ExposureReport, HedgeAction, HedgingStrategy, MarketConditions,
};
use tracing::info;

const RISK_REDUCTION_CAP: f64 = 0.95;
const RISK_REDUCTION_SCALE: f64 = 0.8;
const RISK_REDUCTION_GAMMA_UNIT: f64 = 1_000_000.0;

/// Builds a `HedgingStrategy` from exposure and market conditions.
///
/// Holds no state between calls.
#[derive(Debug, Clone)]
pub struct StrategyGenerator {
    config: StrategyConfig,
    selector: InstrumentSelector,
}

impl StrategyGenerator {
    pub fn new(config: StrategyConfig) -> StrategyResult<Self> {
        config.validate()?;
        let selector = InstrumentSelector::new(config.instruments.clone());
        Ok(Self { config, selector })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Threshold state machine over the hedge action, with a reason.
    pub fn decide_action(&self, exposure: &ExposureReport) -> (HedgeAction, String) {
        let t = &self.config.thresholds;
        let gamma = exposure.total_gamma.abs();
        let imbalance = exposure.delta_imbalance;

        if gamma < t.low && imbalance < t.no_hedge_imbalance {
            return (
                HedgeAction::NoHedgeNeeded,
                format!("gamma {gamma:.0} below {:.0} and imbalance {imbalance:.4} below {}", t.low, t.no_hedge_imbalance),
            );
        }
        if gamma >= t.extreme || imbalance > t.emergency_imbalance {
            return (
                HedgeAction::EmergencyHedge,
                format!("gamma {gamma:.0} / imbalance {imbalance:.4} past extreme limits"),
            );
        }
        if gamma >= t.high || imbalance > t.aggressive_imbalance {
            return (
                HedgeAction::AggressiveHedge,
                format!("gamma {gamma:.0} / imbalance {imbalance:.4} past high limits"),
            );
        }
        if gamma >= t.medium || imbalance > t.standard_imbalance {
            return (
                HedgeAction::StandardHedge,
                format!("gamma {gamma:.0} / imbalance {imbalance:.4} past medium limits"),
            );
        }
        (
            HedgeAction::ConservativeHedge,
            format!("gamma {gamma:.0} / imbalance {imbalance:.4} past low limits"),
        )
    }

    /// Rule-based ratio times the classifier adjustment, clamped to
    /// `[0, max_ratio]`. Zero for NO_HEDGE_NEEDED.
    pub fn hedge_ratio(
        &self,
        action: HedgeAction,
        conditions: &MarketConditions,
        classifier: Option<&ClassifierOutcome>,
    ) -> f64 {
        if action == HedgeAction::NoHedgeNeeded {
            return 0.0;
        }
        let r = &self.config.ratio;
        let rule = r.base_ratio
            * r.market_adjustment(conditions.regime)
            * r.liquidity_adjustment(conditions.liquidity)
            * self.config.costs.ratio_adjustment();
        let refined = match classifier {
            Some(outcome) => rule * outcome.ratio_adjustment(),
            None => rule,
        };
        if refined.is_finite() {
            refined.clamp(0.0, r.max_ratio)
        } else {
            0.0
        }
    }

    /// Generate a strategy. `classifier` is `None` when no model is loaded;
    /// the rule-based ratio is used and confidence is 0.
    pub fn generate(
        &self,
        exposure: &ExposureReport,
        conditions: &MarketConditions,
        classifier: Option<&ClassifierOutcome>,
        now: DateTime<Utc>,
    ) -> HedgingStrategy {
        let (action, reason) = self.decide_action(exposure);
        let hedge_ratio = self.hedge_ratio(action, conditions, classifier);

        let instruments = if action == HedgeAction::NoHedgeNeeded {
            Vec::new()
        } else {
            let tolerance = self
                .config
                .delta_tolerance
                .for_position_count(exposure.position_count);
            self.selector.select(
                exposure,
                conditions,
                action,
                tolerance,
                self.config.thresholds.medium,
            )
        };

        let plan = self
            .config
            .timing
            .plan(now, exposure.hedging_urgency, instruments.len());
        let expected_cost = self
            .config
            .costs
            .expected_cost(instruments.len(), hedge_ratio);
        let risk_reduction = (hedge_ratio
            * RISK_REDUCTION_SCALE
            * (1.0 + exposure.total_gamma.abs() / RISK_REDUCTION_GAMMA_UNIT))
            .min(RISK_REDUCTION_CAP);

        info!(
            underlying = %conditions.underlying,
            action = %action,
            hedge_ratio,
            instruments = instruments.len(),
            order_type = %plan.order_type,
            expected_cost,
            "Strategy generated"
        );

        HedgingStrategy {
            underlying: conditions.underlying.clone(),
            action,
            hedge_ratio,
            instruments,
            plan,
            expected_cost,
            confidence: classifier.map_or(0.0, |c| c.confidence),
            classifier: classifier.copied(),
            exposure_delta: exposure.total_delta,
            exposure_gamma: exposure.total_gamma,
            risk_reduction,
            reason,
            created_at: now,
        }
    }
}
