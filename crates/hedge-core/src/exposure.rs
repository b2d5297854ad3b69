//! Aggregated portfolio exposure.

use crate::greeks::Greeks;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Risk category from absolute portfolio gamma. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "MINIMAL",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Extreme => "EXTREME",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position left out of the aggregate, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedPosition {
    /// Index in the input position list.
    pub index: usize,
    pub symbol: String,
    pub reason: String,
}

/// Portfolio-level exposure for one cycle.
///
/// `total_gamma` equals the sum of `gamma_by_strike` values within
/// floating-point tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureReport {
    pub as_of: DateTime<Utc>,
    pub total_delta: f64,
    pub total_gamma: f64,
    /// Quantity-weighted sums of all five Greeks.
    pub totals: Greeks,
    pub gamma_by_strike: BTreeMap<Decimal, f64>,
    pub gamma_by_expiration: BTreeMap<DateTime<Utc>, f64>,
    pub delta_imbalance: f64,
    pub risk_level: RiskLevel,
    /// Hedging urgency in [0, 1].
    pub hedging_urgency: f64,
    /// Herfindahl index over |gamma_by_strike|.
    pub concentration: f64,
    /// |total_gamma| scaled up by concentration.
    pub gamma_risk: f64,
    pub position_count: usize,
    pub expired_count: usize,
    pub excluded: Vec<ExcludedPosition>,
    pub stale_symbols: Vec<String>,
}

impl ExposureReport {
    /// Whether any input price behind this report was stale.
    pub fn is_stale(&self) -> bool {
        !self.stale_symbols.is_empty()
    }

    /// Whether some positions were left out of the aggregate.
    pub fn has_gaps(&self) -> bool {
        !self.excluded.is_empty()
    }

    /// Nearest expiry strictly after `as_of` that carries gamma.
    pub fn nearest_live_expiry(&self) -> Option<DateTime<Utc>> {
        self.gamma_by_expiration
            .keys()
            .find(|expiry| **expiry > self.as_of)
            .copied()
    }

    /// Strikes carrying gamma, sorted by distance from `reference_price`.
    pub fn strikes_nearest(&self, reference_price: Decimal) -> Vec<Decimal> {
        let mut strikes: Vec<Decimal> = self.gamma_by_strike.keys().copied().collect();
        strikes.sort_by_key(|k| (*k - reference_price).abs());
        strikes
    }
}
