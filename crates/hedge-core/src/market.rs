//! Market inputs: price snapshots and derived market conditions.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Latest known price for one underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlyingQuote {
    pub price: f64,
    /// Annualized realized volatility, when known.
    pub realized_vol: Option<f64>,
    pub updated_at: DateTime<Utc>,
    /// Set when the price came from a cache or fallback table
    /// instead of a fresh gateway read.
    pub stale: bool,
}

impl UnderlyingQuote {
    pub fn fresh(price: f64, updated_at: DateTime<Utc>) -> Self {
        Self {
            price,
            realized_vol: None,
            updated_at,
            stale: false,
        }
    }

    #[must_use]
    pub fn with_realized_vol(mut self, vol: f64) -> Self {
        self.realized_vol = Some(vol);
        self
    }

    #[must_use]
    pub fn mark_stale(mut self) -> Self {
        self.stale = true;
        self
    }
}

/// Point-in-time view of underlying prices used for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Valuation time. Time to expiry is measured from here.
    pub as_of: DateTime<Utc>,
    pub quotes: BTreeMap<String, UnderlyingQuote>,
}

impl MarketSnapshot {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            quotes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_quote(mut self, symbol: impl Into<String>, quote: UnderlyingQuote) -> Self {
        self.quotes.insert(symbol.into(), quote);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, quote: UnderlyingQuote) {
        self.quotes.insert(symbol.into(), quote);
    }

    pub fn quote(&self, symbol: &str) -> Option<&UnderlyingQuote> {
        self.quotes.get(symbol)
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.quotes.get(symbol).map(|q| q.price)
    }

    /// Symbols whose quotes are flagged stale, in sorted order.
    pub fn stale_symbols(&self) -> Vec<String> {
        self.quotes
            .iter()
            .filter(|(_, q)| q.stale)
            .map(|(s, _)| s.clone())
            .collect()
    }
}

/// Volatility regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityRegime {
    LowVol,
    #[default]
    NormalVol,
    HighVol,
    Crisis,
}

impl VolatilityRegime {
    /// Numeric encoding used as a classifier feature.
    pub fn encode(&self) -> f64 {
        match self {
            Self::LowVol => 0.2,
            Self::NormalVol => 0.5,
            Self::HighVol => 0.8,
            Self::Crisis => 1.0,
        }
    }

    /// True for HIGH_VOL and CRISIS.
    pub fn is_stressed(&self) -> bool {
        matches!(self, Self::HighVol | Self::Crisis)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowVol => "LOW_VOL",
            Self::NormalVol => "NORMAL_VOL",
            Self::HighVol => "HIGH_VOL",
            Self::Crisis => "CRISIS",
        }
    }
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VolatilityRegime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW_VOL" => Ok(Self::LowVol),
            "NORMAL_VOL" => Ok(Self::NormalVol),
            "HIGH_VOL" => Ok(Self::HighVol),
            "CRISIS" => Ok(Self::Crisis),
            other => Err(CoreError::UnknownRegime(other.to_string())),
        }
    }
}

/// Market conditions for one underlying, supplied per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConditions {
    pub underlying: String,
    /// Price used to pick option strikes.
    pub reference_price: f64,
    pub regime: VolatilityRegime,
    pub implied_volatility: f64,
    /// Liquidity score in [0, 1].
    pub liquidity: f64,
    /// Fractional price change over the ticker window.
    pub price_velocity: f64,
    pub volume_ratio: f64,
    /// Days until the nearest live expiry.
    pub time_to_expiration_days: f64,
    pub correlation_strength: f64,
}

impl Default for MarketConditions {
    fn default() -> Self {
        Self {
            underlying: String::new(),
            reference_price: 0.0,
            regime: VolatilityRegime::NormalVol,
            implied_volatility: 0.5,
            liquidity: 0.8,
            price_velocity: 0.0,
            volume_ratio: 1.0,
            time_to_expiration_days: 30.0,
            correlation_strength: 0.5,
        }
    }
}

impl MarketConditions {
    pub fn for_underlying(underlying: impl Into<String>, reference_price: f64) -> Self {
        Self {
            underlying: underlying.into(),
            reference_price,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_regime(mut self, regime: VolatilityRegime) -> Self {
        self.regime = regime;
        self
    }

    #[must_use]
    pub fn with_liquidity(mut self, liquidity: f64) -> Self {
        self.liquidity = liquidity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_encoding_is_monotonic() {
        let regimes = [
            VolatilityRegime::LowVol,
            VolatilityRegime::NormalVol,
            VolatilityRegime::HighVol,
            VolatilityRegime::Crisis,
        ];
        for w in regimes.windows(2) {
            assert!(w[0].encode() < w[1].encode());
        }
    }

    #[test]
    fn test_regime_round_trip_str() {
        let regime: VolatilityRegime = "HIGH_VOL".parse().unwrap();
        assert_eq!(regime, VolatilityRegime::HighVol);
        assert_eq!(regime.to_string(), "HIGH_VOL");
        assert!("EXTREME_VOL".parse::<VolatilityRegime>().is_err());
    }

    #[test]
    fn test_stale_symbols() {
        let now = Utc::now();
        let snap = MarketSnapshot::new(now)
            .with_quote("BTCUSDT", UnderlyingQuote::fresh(97000.0, now))
            .with_quote("ETHUSDT", UnderlyingQuote::fresh(3200.0, now).mark_stale());
        assert_eq!(snap.stale_symbols(), vec!["ETHUSDT".to_string()]);
        assert_eq!(snap.price("BTCUSDT"), Some(97000.0));
        assert_eq!(snap.price("SOLUSDT"), None);
    }
}
