//! Prometheus metrics for the hedging engine.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec,
    register_histogram, register_histogram_vec, Counter, CounterVec, Encoder, Gauge, GaugeVec,
    Histogram, HistogramVec, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Monitoring cycles run.
/// Labels: trigger (scheduled/emergency/once)
pub static CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("hedge_cycles_total", "Total monitoring cycles", &["trigger"]).unwrap()
});

/// Cycles that stopped at a stage.
pub static CYCLE_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hedge_cycle_failures_total",
        "Total cycles that failed, by stage",
        &["stage"]
    )
    .unwrap()
});

/// Cycle duration in milliseconds.
pub static CYCLE_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "hedge_cycle_duration_ms",
        "Monitoring cycle duration in milliseconds",
        &["trigger"],
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0]
    )
    .unwrap()
});

/// Hedge actions decided.
pub static ACTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hedge_actions_total",
        "Total hedge actions decided",
        &["action"]
    )
    .unwrap()
});

/// Hedge orders by instrument kind and outcome (filled/failed/skipped).
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hedge_orders_total",
        "Total hedge orders",
        &["kind", "outcome"]
    )
    .unwrap()
});

/// Rollback orders by outcome (ok/failed).
pub static ROLLBACKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hedge_rollbacks_total",
        "Total rollback orders",
        &["outcome"]
    )
    .unwrap()
});

/// Critical alerts raised.
pub static ALERTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("hedge_alerts_total", "Total critical alerts", &["kind"]).unwrap()
});

/// Quotes served from cache or fallback instead of a fresh read.
pub static STALE_QUOTES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hedge_stale_quotes_total",
        "Total stale quotes used",
        &["symbol"]
    )
    .unwrap()
});

/// Positions excluded from aggregation.
pub static EXCLUDED_POSITIONS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "hedge_excluded_positions_total",
        "Total positions excluded from aggregation"
    )
    .unwrap()
});

/// Emergency latch triggers.
pub static EMERGENCY_TRIGGERS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "hedge_emergency_triggers_total",
        "Total emergency latch triggers"
    )
    .unwrap()
});

/// Execution cost accumulated (quote currency).
pub static HEDGE_COST_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("hedge_cost_total", "Total hedge execution cost").unwrap()
});

/// Hedge effectiveness of executed strategies.
pub static HEDGE_EFFECTIVENESS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "hedge_effectiveness",
        "Fraction of targeted exposure neutralized",
        vec![0.1, 0.3, 0.5, 0.7, 0.8, 0.9, 0.95, 1.0]
    )
    .unwrap()
});

/// Book gamma of the last cycle.
/// Labels: underlying
pub static PORTFOLIO_GAMMA: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "hedge_portfolio_gamma",
        "Gamma of the last cycle per underlying",
        &["underlying"]
    )
    .unwrap()
});

/// Book delta of the last cycle.
/// Labels: underlying
pub static PORTFOLIO_DELTA: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "hedge_portfolio_delta",
        "Delta of the last cycle per underlying",
        &["underlying"]
    )
    .unwrap()
});

/// Hedging urgency of the last cycle.
/// Labels: underlying
pub static HEDGING_URGENCY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "hedge_hedging_urgency",
        "Hedging urgency in [0, 1]",
        &["underlying"]
    )
    .unwrap()
});

/// Gamma concentration (Herfindahl) of the last cycle.
/// Labels: underlying
pub static GAMMA_CONCENTRATION: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "hedge_gamma_concentration",
        "Herfindahl index over gamma by strike",
        &["underlying"]
    )
    .unwrap()
});

/// Classifier confidence of the last strategy (0 when unavailable).
pub static CLASSIFIER_CONFIDENCE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "hedge_classifier_confidence",
        "Classifier confidence of the last strategy"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn cycle_started(trigger: &str) {
        CYCLES_TOTAL.with_label_values(&[trigger]).inc();
    }

    pub fn cycle_duration(trigger: &str, duration_ms: f64) {
        CYCLE_DURATION_MS
            .with_label_values(&[trigger])
            .observe(duration_ms);
    }

    pub fn cycle_failed(stage: &str) {
        CYCLE_FAILURES_TOTAL.with_label_values(&[stage]).inc();
    }

    pub fn action_decided(action: &str) {
        ACTIONS_TOTAL.with_label_values(&[action]).inc();
    }

    pub fn order(kind: &str, outcome: &str) {
        ORDERS_TOTAL.with_label_values(&[kind, outcome]).inc();
    }

    pub fn rollback(succeeded: bool) {
        let outcome = if succeeded { "ok" } else { "failed" };
        ROLLBACKS_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn alert(kind: &str) {
        ALERTS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn stale_quote(symbol: &str) {
        STALE_QUOTES_TOTAL.with_label_values(&[symbol]).inc();
    }

    pub fn positions_excluded(count: usize) {
        EXCLUDED_POSITIONS_TOTAL.inc_by(count as f64);
    }

    pub fn emergency_triggered() {
        EMERGENCY_TRIGGERS_TOTAL.inc();
    }

    /// Negative or non-finite costs are ignored.
    pub fn hedge_cost(cost: f64) {
        if cost.is_finite() && cost > 0.0 {
            HEDGE_COST_TOTAL.inc_by(cost);
        }
    }

    pub fn hedge_effectiveness(effectiveness: f64) {
        HEDGE_EFFECTIVENESS.observe(effectiveness);
    }

    /// Record the exposure gauges of one underlying's book.
    pub fn exposure(
        underlying: &str,
        total_gamma: f64,
        total_delta: f64,
        urgency: f64,
        concentration: f64,
    ) {
        PORTFOLIO_GAMMA.with_label_values(&[underlying]).set(total_gamma);
        PORTFOLIO_DELTA.with_label_values(&[underlying]).set(total_delta);
        HEDGING_URGENCY.with_label_values(&[underlying]).set(urgency);
        GAMMA_CONCENTRATION
            .with_label_values(&[underlying])
            .set(concentration);
    }

    pub fn classifier_confidence(confidence: f64) {
        CLASSIFIER_CONFIDENCE.set(confidence);
    }

    /// Render the default registry in Prometheus text format.
    pub fn encode_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_contains_recorded_metrics() {
        Metrics::action_decided("STANDARD_HEDGE");
        Metrics::exposure("BTCUSDT", 1_500_000.0, 12.0, 0.3, 0.6);

        let text = Metrics::encode_text().unwrap();
        assert!(text.contains("hedge_actions_total"));
        assert!(text.contains("hedge_portfolio_gamma"));
    }

    #[test]
    fn test_exposure_kept_per_underlying() {
        Metrics::exposure("SOLUSDT", 250_000.0, -3.0, 0.2, 0.4);
        Metrics::exposure("XRPUSDT", 4_500_000.0, 40.0, 0.9, 0.8);

        assert_eq!(PORTFOLIO_GAMMA.with_label_values(&["SOLUSDT"]).get(), 250_000.0);
        assert_eq!(PORTFOLIO_GAMMA.with_label_values(&["XRPUSDT"]).get(), 4_500_000.0);
        assert_eq!(PORTFOLIO_DELTA.with_label_values(&["SOLUSDT"]).get(), -3.0);
        assert_eq!(HEDGING_URGENCY.with_label_values(&["XRPUSDT"]).get(), 0.9);
        assert_eq!(GAMMA_CONCENTRATION.with_label_values(&["SOLUSDT"]).get(), 0.4);
    }

    #[test]
    fn test_counters_increase() {
        let before = ROLLBACKS_TOTAL.with_label_values(&["failed"]).get();
        Metrics::rollback(false);
        assert!(ROLLBACKS_TOTAL.with_label_values(&["failed"]).get() >= before + 1.0);
    }

    #[test]
    fn test_hedge_cost_ignores_negative() {
        let before = HEDGE_COST_TOTAL.get();
        Metrics::hedge_cost(-5.0);
        Metrics::hedge_cost(f64::NAN);
        // Other tests may add cost concurrently, never subtract.
        assert!(HEDGE_COST_TOTAL.get() >= before);
    }
}
