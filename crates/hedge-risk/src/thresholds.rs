//! Risk thresholds.

use crate::error::{RiskError, RiskResult};
use hedge_core::RiskLevel;
use serde::{Deserialize, Serialize};

/// Boundaries on |total gamma| and delta imbalance.
///
/// Gamma boundaries must be positive and strictly increasing, as must the
/// imbalance boundaries. `categorize` is then monotonic in |gamma|.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Default: 500,000.
    #[serde(default = "default_low")]
    pub low: f64,
    /// Default: 1,000,000.
    #[serde(default = "default_medium")]
    pub medium: f64,
    /// Default: 2,000,000.
    #[serde(default = "default_high")]
    pub high: f64,
    /// Default: 5,000,000.
    #[serde(default = "default_extreme")]
    pub extreme: f64,
    /// Below this (and below `low` gamma) no hedge is needed. Default: 0.1.
    #[serde(default = "default_no_hedge_imbalance")]
    pub no_hedge_imbalance: f64,
    /// Default: 0.2.
    #[serde(default = "default_standard_imbalance")]
    pub standard_imbalance: f64,
    /// Default: 0.3.
    #[serde(default = "default_aggressive_imbalance")]
    pub aggressive_imbalance: f64,
    /// Hard imbalance limit. Default: 0.5.
    #[serde(default = "default_emergency_imbalance")]
    pub emergency_imbalance: f64,
}

fn default_low() -> f64 {
    500_000.0
}

fn default_medium() -> f64 {
    1_000_000.0
}

fn default_high() -> f64 {
    2_000_000.0
}

fn default_extreme() -> f64 {
    5_000_000.0
}

fn default_no_hedge_imbalance() -> f64 {
    0.1
}

fn default_standard_imbalance() -> f64 {
    0.2
}

fn default_aggressive_imbalance() -> f64 {
    0.3
}

fn default_emergency_imbalance() -> f64 {
    0.5
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: default_low(),
            medium: default_medium(),
            high: default_high(),
            extreme: default_extreme(),
            no_hedge_imbalance: default_no_hedge_imbalance(),
            standard_imbalance: default_standard_imbalance(),
            aggressive_imbalance: default_aggressive_imbalance(),
            emergency_imbalance: default_emergency_imbalance(),
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> RiskResult<()> {
        let gamma = [self.low, self.medium, self.high, self.extreme];
        if gamma.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(RiskError::ConfigError(
                "gamma thresholds must be positive".to_string(),
            ));
        }
        if gamma.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RiskError::ConfigError(format!(
                "gamma thresholds must be strictly increasing: {gamma:?}"
            )));
        }
        let imbalance = [
            self.no_hedge_imbalance,
            self.standard_imbalance,
            self.aggressive_imbalance,
            self.emergency_imbalance,
        ];
        if imbalance.iter().any(|v| !v.is_finite() || *v <= 0.0)
            || imbalance.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(RiskError::ConfigError(format!(
                "imbalance thresholds must be positive and strictly increasing: {imbalance:?}"
            )));
        }
        Ok(())
    }

    /// Risk level for an absolute gamma.
    pub fn categorize(&self, abs_gamma: f64) -> RiskLevel {
        if abs_gamma < self.low {
            RiskLevel::Minimal
        } else if abs_gamma < self.medium {
            RiskLevel::Low
        } else if abs_gamma < self.high {
            RiskLevel::Medium
        } else if abs_gamma < self.extreme {
            RiskLevel::High
        } else {
            RiskLevel::Extreme
        }
    }

    /// `|delta| / max(|gamma|, 1)`
    pub fn delta_imbalance(total_delta: f64, total_gamma: f64) -> f64 {
        total_delta.abs() / total_gamma.abs().max(1.0)
    }

    /// `clamp(max(|gamma| / extreme, imbalance / emergency_imbalance), 0, 1)`
    pub fn hedging_urgency(&self, total_gamma: f64, delta_imbalance: f64) -> f64 {
        let gamma_pressure = total_gamma.abs() / self.extreme;
        let delta_pressure = delta_imbalance / self.emergency_imbalance;
        gamma_pressure.max(delta_pressure).clamp(0.0, 1.0)
    }
}

/// Absolute delta tolerance tiers, chosen by portfolio size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaTolerance {
    /// Fewer than 5 positions. Default: 0.05.
    #[serde(default = "default_tight")]
    pub tight: f64,
    /// Fewer than 20 positions. Default: 0.10.
    #[serde(default = "default_normal")]
    pub normal: f64,
    /// Default: 0.15.
    #[serde(default = "default_relaxed")]
    pub relaxed: f64,
}

fn default_tight() -> f64 {
    0.05
}

fn default_normal() -> f64 {
    0.10
}

fn default_relaxed() -> f64 {
    0.15
}

impl Default for DeltaTolerance {
    fn default() -> Self {
        Self {
            tight: default_tight(),
            normal: default_normal(),
            relaxed: default_relaxed(),
        }
    }
}

impl DeltaTolerance {
    pub fn for_position_count(&self, count: usize) -> f64 {
        match count {
            0..=4 => self.tight,
            5..=19 => self.normal,
            _ => self.relaxed,
        }
    }
}
