//! Running hedging statistics.
//!
//! Counts executed strategies and summarizes them on a schedule:
//! - total and successful hedges (effectiveness above 0.7)
//! - total execution cost
//! - running mean effectiveness
//! - rollbacks and failed rollbacks
//! - cycle duration percentiles read back from the Prometheus histogram

use crate::metrics::{Metrics, CYCLE_DURATION_MS};
use chrono::{DateTime, Utc};
use hedge_core::ExecutionResult;
use parking_lot::Mutex;
use prometheus::core::Collector;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// Effectiveness above which a hedge counts as successful.
pub const SUCCESS_EFFECTIVENESS: f64 = 0.7;

/// Snapshot of the running statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HedgingStats {
    pub total_hedges: u64,
    pub successful_hedges: u64,
    pub failed_hedges: u64,
    pub total_cost: Decimal,
    pub mean_effectiveness: f64,
    pub rollbacks: u64,
    pub failed_rollbacks: u64,
}

impl HedgingStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_hedges == 0 {
            0.0
        } else {
            self.successful_hedges as f64 / self.total_hedges as f64
        }
    }

    fn record(&mut self, result: &ExecutionResult) {
        self.total_hedges += 1;
        if !result.executed {
            self.failed_hedges += 1;
        } else if result.hedge_effectiveness > SUCCESS_EFFECTIVENESS {
            self.successful_hedges += 1;
        }
        self.total_cost += result.total_cost;

        let n = self.total_hedges as f64;
        self.mean_effectiveness += (result.hedge_effectiveness - self.mean_effectiveness) / n;

        self.rollbacks += result.rollbacks.len() as u64;
        self.failed_rollbacks += result.rollbacks.iter().filter(|r| !r.succeeded()).count() as u64;
    }
}

/// Accumulates hedging statistics and logs periodic summaries.
pub struct HedgingStatsReporter {
    stats: Mutex<HedgingStats>,
    start_time: DateTime<Utc>,
}

impl Default for HedgingStatsReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl HedgingStatsReporter {
    pub fn new() -> Self {
        Self {
            stats: Mutex::new(HedgingStats::default()),
            start_time: Utc::now(),
        }
    }

    /// Record one execution result. Also updates the Prometheus series.
    pub fn record(&self, result: &ExecutionResult) {
        if result.fills.is_empty() && result.partial_results.is_empty() && result.executed {
            // Nothing was sent: NO_HEDGE_NEEDED or every leg sized to zero.
            return;
        }
        self.stats.lock().record(result);

        for execution in result.fills.iter().chain(result.partial_results.iter()) {
            Metrics::order(execution.instrument.kind.as_str(), "filled");
        }
        for record in &result.rollbacks {
            Metrics::rollback(record.succeeded());
        }
        Metrics::hedge_cost(result.total_cost.to_f64().unwrap_or(0.0));
        if result.executed {
            Metrics::hedge_effectiveness(result.hedge_effectiveness);
        }
    }

    pub fn snapshot(&self) -> HedgingStats {
        self.stats.lock().clone()
    }

    /// Cycle duration percentiles (p50, p95, p99) in milliseconds.
    pub fn cycle_duration_percentiles(&self, trigger: &str) -> (f64, f64, f64) {
        for mf in CYCLE_DURATION_MS.collect() {
            for m in mf.get_metric() {
                let matches = m
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == "trigger" && pair.get_value() == trigger);
                if !matches {
                    continue;
                }
                let h = m.get_histogram();
                let count = h.get_sample_count();
                if count == 0 {
                    return (0.0, 0.0, 0.0);
                }
                let buckets: Vec<(f64, u64)> = h
                    .get_bucket()
                    .iter()
                    .map(|b| (b.get_upper_bound(), b.get_cumulative_count()))
                    .collect();
                return (
                    percentile_from_buckets(&buckets, count, 0.50),
                    percentile_from_buckets(&buckets, count, 0.95),
                    percentile_from_buckets(&buckets, count, 0.99),
                );
            }
        }
        (0.0, 0.0, 0.0)
    }

    /// Output the running summary to logs.
    pub fn output_summary(&self) {
        let s = self.snapshot();
        let duration = Utc::now() - self.start_time;
        let (p50, p95, p99) = self.cycle_duration_percentiles("scheduled");

        info!("========== Hedging Statistics Summary ==========");
        info!(
            "Period: {} ({} hours {} minutes)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            duration.num_hours(),
            duration.num_minutes() % 60
        );
        info!(
            "  Hedges: {} (successful: {}, failed: {}, success rate: {:.1}%)",
            s.total_hedges,
            s.successful_hedges,
            s.failed_hedges,
            s.success_rate() * 100.0
        );
        info!("  Total cost: {}", s.total_cost);
        info!("  Mean effectiveness: {:.3}", s.mean_effectiveness);
        info!(
            "  Rollbacks: {} (failed: {})",
            s.rollbacks, s.failed_rollbacks
        );
        info!(
            "  Cycle duration (ms): P50={:.1}, P95={:.1}, P99={:.1}",
            p50, p95, p99
        );
        info!("================================================");
    }

    /// JSON-formatted statistics.
    pub fn to_json(&self) -> serde_json::Value {
        let s = self.snapshot();
        serde_json::json!({
            "since": self.start_time.to_rfc3339(),
            "total_hedges": s.total_hedges,
            "successful_hedges": s.successful_hedges,
            "failed_hedges": s.failed_hedges,
            "success_rate": s.success_rate(),
            "total_cost": s.total_cost.to_string(),
            "mean_effectiveness": s.mean_effectiveness,
            "rollbacks": s.rollbacks,
            "failed_rollbacks": s.failed_rollbacks,
        })
    }
}

/// Percentile from cumulative `(upper_bound, count)` buckets with linear
/// interpolation inside the bucket.
pub fn percentile_from_buckets(buckets: &[(f64, u64)], total_count: u64, percentile: f64) -> f64 {
    let target = (total_count as f64 * percentile) as u64;
    let mut prev_bound = 0.0;
    let mut prev_count = 0u64;

    for &(upper_bound, cumulative_count) in buckets {
        if cumulative_count >= target {
            let bucket_count = cumulative_count - prev_count;
            if bucket_count == 0 {
                return upper_bound;
            }
            let position = (target - prev_count) as f64 / bucket_count as f64;
            return prev_bound + position * (upper_bound - prev_bound);
        }
        prev_bound = upper_bound;
        prev_count = cumulative_count;
    }

    buckets.last().map(|(bound, _)| *bound).unwrap_or(0.0)
}
