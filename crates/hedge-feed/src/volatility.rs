//! Realized volatility and regime classification.

use hedge_core::VolatilityRegime;
use serde::{Deserialize, Serialize};

use crate::gateway::Ticker;

/// Used when the ticker range is unusable.
pub const DEFAULT_VOLATILITY: f64 = 0.5;
const MIN_VOLATILITY: f64 = 0.1;
const MAX_VOLATILITY: f64 = 3.0;
const TRADING_DAYS: f64 = 252.0;

/// Annualized Parkinson volatility from one high/low range,
/// clamped to [0.1, 3.0].
pub fn parkinson_volatility(high: f64, low: f64) -> f64 {
    if !(high.is_finite() && low.is_finite()) || high <= 0.0 || low <= 0.0 || high < low {
        return DEFAULT_VOLATILITY;
    }
    let range = (high / low).ln();
    let daily = (range * range / (4.0 * std::f64::consts::LN_2)).sqrt();
    (daily * TRADING_DAYS.sqrt()).clamp(MIN_VOLATILITY, MAX_VOLATILITY)
}

/// Parkinson volatility of a 24h ticker.
pub fn ticker_volatility(ticker: &Ticker) -> f64 {
    if ticker.last_price <= 0.0 {
        return DEFAULT_VOLATILITY;
    }
    parkinson_volatility(ticker.high, ticker.low)
}

/// Realized volatility boundaries between regimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeThresholds {
    /// Below this: LOW_VOL. Default: 0.3.
    #[serde(default = "default_low_vol")]
    pub low_vol: f64,
    /// At or above this: HIGH_VOL. Default: 0.8.
    #[serde(default = "default_high_vol")]
    pub high_vol: f64,
    /// At or above this: CRISIS. Default: 1.5.
    #[serde(default = "default_crisis")]
    pub crisis: f64,
}

fn default_low_vol() -> f64 {
    0.3
}

fn default_high_vol() -> f64 {
    0.8
}

fn default_crisis() -> f64 {
    1.5
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            low_vol: default_low_vol(),
            high_vol: default_high_vol(),
            crisis: default_crisis(),
        }
    }
}

impl RegimeThresholds {
    pub fn classify(&self, volatility: f64) -> VolatilityRegime {
        if volatility >= self.crisis {
            VolatilityRegime::Crisis
        } else if volatility >= self.high_vol {
            VolatilityRegime::HighVol
        } else if volatility < self.low_vol {
            VolatilityRegime::LowVol
        } else {
            VolatilityRegime::NormalVol
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parkinson_known_value() {
        // ln(1.05)^2 / (4 ln 2), annualized
        let expected = ((1.05f64.ln().powi(2)) / (4.0 * 2f64.ln())).sqrt() * 252f64.sqrt();
        assert!((parkinson_volatility(105.0, 100.0) - expected).abs() < 1e-12);
        assert!(expected > 0.4 && expected < 0.5);
    }

    #[test]
    fn test_parkinson_clamps_and_defaults() {
        assert_eq!(parkinson_volatility(100.0, 100.0), 0.1);
        assert_eq!(parkinson_volatility(300.0, 100.0), 3.0);
        assert_eq!(parkinson_volatility(0.0, 100.0), DEFAULT_VOLATILITY);
        assert_eq!(parkinson_volatility(90.0, 100.0), DEFAULT_VOLATILITY);
        assert_eq!(parkinson_volatility(f64::NAN, 1.0), DEFAULT_VOLATILITY);
    }

    #[test]
    fn test_regime_classify() {
        let t = RegimeThresholds::default();
        assert_eq!(t.classify(0.2), VolatilityRegime::LowVol);
        assert_eq!(t.classify(0.5), VolatilityRegime::NormalVol);
        assert_eq!(t.classify(0.8), VolatilityRegime::HighVol);
        assert_eq!(t.classify(2.0), VolatilityRegime::Crisis);
    }
}
