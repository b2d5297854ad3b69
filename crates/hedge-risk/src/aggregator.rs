//! Portfolio exposure aggregation.

use crate::error::{RiskError, RiskResult};
use crate::thresholds::RiskThresholds;
use hedge_core::{ExcludedPosition, ExposureReport, Greeks, MarketSnapshot, Position};
use hedge_greeks::{GreeksOutcome, GreeksResult};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Sums per-position Greeks into an `ExposureReport`.
///
/// Pure: identical inputs yield identical reports.
#[derive(Debug, Clone, Default)]
pub struct ExposureAggregator {
    thresholds: RiskThresholds,
}

impl ExposureAggregator {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Aggregate positions with their Greeks results (same order, same length).
    ///
    /// Failed Greeks and structurally invalid positions are excluded and
    /// listed in the report. Expired positions contribute nothing.
    pub fn aggregate(
        &self,
        positions: &[Position],
        greeks: &[GreeksResult<GreeksOutcome>],
        snapshot: &MarketSnapshot,
    ) -> RiskResult<ExposureReport> {
        if positions.len() != greeks.len() {
            return Err(RiskError::InputMismatch {
                positions: positions.len(),
                greeks: greeks.len(),
            });
        }

        let mut totals = Greeks::ZERO;
        let mut gamma_by_strike: BTreeMap<Decimal, f64> = BTreeMap::new();
        let mut gamma_by_expiration = BTreeMap::new();
        let mut excluded = Vec::new();
        let mut expired_count = 0;
        let mut stale: BTreeSet<String> = snapshot.stale_symbols().into_iter().collect();

        for (index, (position, outcome)) in positions.iter().zip(greeks).enumerate() {
            if let Err(e) = position.validate() {
                excluded.push(ExcludedPosition {
                    index,
                    symbol: position.symbol.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
            let greeks = match outcome {
                Ok(GreeksOutcome::Live(g)) => *g,
                Ok(GreeksOutcome::Expired) => {
                    expired_count += 1;
                    continue;
                }
                Err(e) => {
                    warn!(index, symbol = %position.symbol, error = %e, "Position excluded from exposure");
                    excluded.push(ExcludedPosition {
                        index,
                        symbol: position.symbol.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if snapshot.quote(&position.symbol).is_none() {
                stale.insert(position.symbol.clone());
            }

            let weighted = greeks.scale(position.quantity);
            totals += weighted;
            *gamma_by_strike.entry(position.strike).or_insert(0.0) += weighted.gamma;
            *gamma_by_expiration
                .entry(position.expiration)
                .or_insert(0.0) += weighted.gamma;
        }

        let total_delta = totals.delta;
        let total_gamma = totals.gamma;
        let delta_imbalance = RiskThresholds::delta_imbalance(total_delta, total_gamma);
        let concentration = herfindahl(gamma_by_strike.values().copied());

        let report = ExposureReport {
            as_of: snapshot.as_of,
            total_delta,
            total_gamma,
            totals,
            gamma_by_strike,
            gamma_by_expiration,
            delta_imbalance,
            risk_level: self.thresholds.categorize(total_gamma.abs()),
            hedging_urgency: self.thresholds.hedging_urgency(total_gamma, delta_imbalance),
            concentration,
            gamma_risk: total_gamma.abs() * (1.0 + concentration),
            position_count: positions.len(),
            expired_count,
            excluded,
            stale_symbols: stale.into_iter().collect(),
        };

        debug!(
            total_delta,
            total_gamma,
            risk_level = %report.risk_level,
            urgency = report.hedging_urgency,
            concentration,
            "Exposure aggregated"
        );
        Ok(report)
    }
}

/// Herfindahl index over absolute values. 1.0 for zero or one bucket,
/// or when every bucket is zero.
fn herfindahl(values: impl Iterator<Item = f64>) -> f64 {
    let abs: Vec<f64> = values.map(f64::abs).collect();
    let total: f64 = abs.iter().sum();
    if abs.len() <= 1 || total == 0.0 {
        return 1.0;
    }
    abs.iter().map(|v| (v / total).powi(2)).sum()
}
