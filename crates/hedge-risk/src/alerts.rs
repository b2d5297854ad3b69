//! Critical alert checks on exposure and strategy cost.

use hedge_core::ExposureReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Alert thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// |total gamma| at which gamma is considered blown up. Default: 10,000,000.
    #[serde(default = "default_gamma_blowup")]
    pub gamma_blowup: f64,
    /// Delta imbalance alert level. Default: 0.25.
    #[serde(default = "default_delta_deviation")]
    pub delta_deviation: f64,
    /// Expected hedging cost alert level (fraction). Default: 0.05.
    #[serde(default = "default_hedging_cost")]
    pub hedging_cost: f64,
}

fn default_gamma_blowup() -> f64 {
    10_000_000.0
}

fn default_delta_deviation() -> f64 {
    0.25
}

fn default_hedging_cost() -> f64 {
    0.05
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            gamma_blowup: default_gamma_blowup(),
            delta_deviation: default_delta_deviation(),
            hedging_cost: default_hedging_cost(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    GammaBlowup,
    DeltaDeviation,
    HedgingCost,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GammaBlowup => "gamma_blowup",
            Self::DeltaDeviation => "delta_deviation",
            Self::HedgingCost => "hedging_cost",
        }
    }
}

/// A raised alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.4} exceeds {:.4}",
            self.kind.as_str(),
            self.value,
            self.threshold
        )
    }
}

/// Raises alerts when exposure or cost crosses configured levels.
#[derive(Debug, Clone, Default)]
pub struct AlertMonitor {
    config: AlertConfig,
}

impl AlertMonitor {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    pub fn check_exposure(&self, report: &ExposureReport) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let abs_gamma = report.total_gamma.abs();
        if abs_gamma >= self.config.gamma_blowup {
            alerts.push(Alert {
                kind: AlertKind::GammaBlowup,
                value: abs_gamma,
                threshold: self.config.gamma_blowup,
            });
        }
        if report.delta_imbalance > self.config.delta_deviation {
            alerts.push(Alert {
                kind: AlertKind::DeltaDeviation,
                value: report.delta_imbalance,
                threshold: self.config.delta_deviation,
            });
        }
        for alert in &alerts {
            error!(alert = %alert, "CRITICAL ALERT");
        }
        alerts
    }

    pub fn check_cost(&self, expected_cost: f64) -> Option<Alert> {
        if expected_cost <= self.config.hedging_cost {
            return None;
        }
        let alert = Alert {
            kind: AlertKind::HedgingCost,
            value: expected_cost,
            threshold: self.config.hedging_cost,
        };
        error!(alert = %alert, "CRITICAL ALERT");
        Some(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hedge_core::{Greeks, RiskLevel};
    use std::collections::BTreeMap;

    fn report(gamma: f64, imbalance: f64) -> ExposureReport {
        ExposureReport {
            as_of: Utc::now(),
            total_delta: imbalance * gamma.abs().max(1.0),
            total_gamma: gamma,
            totals: Greeks::ZERO,
            gamma_by_strike: BTreeMap::new(),
            gamma_by_expiration: BTreeMap::new(),
            delta_imbalance: imbalance,
            risk_level: RiskLevel::Extreme,
            hedging_urgency: 1.0,
            concentration: 1.0,
            gamma_risk: gamma.abs() * 2.0,
            position_count: 1,
            expired_count: 0,
            excluded: Vec::new(),
            stale_symbols: Vec::new(),
        }
    }

    #[test]
    fn test_no_alerts_on_calm_book() {
        let monitor = AlertMonitor::default();
        assert!(monitor.check_exposure(&report(100_000.0, 0.05)).is_empty());
        assert!(monitor.check_cost(0.002).is_none());
    }

    #[test]
    fn test_gamma_and_delta_alerts() {
        let monitor = AlertMonitor::default();
        let alerts = monitor.check_exposure(&report(-12_000_000.0, 0.3));
        let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::GammaBlowup, AlertKind::DeltaDeviation]);
    }

    #[test]
    fn test_cost_alert() {
        let alert = AlertMonitor::default().check_cost(0.08).unwrap();
        assert_eq!(alert.kind, AlertKind::HedgingCost);
    }
}
