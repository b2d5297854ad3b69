//! Option positions.
//!
//! A `Position` is an immutable snapshot of one option holding, supplied
//! fresh every cycle by the position source.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default annualized risk-free rate used when a position does not carry one.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;

fn default_risk_free_rate() -> f64 {
    DEFAULT_RISK_FREE_RATE
}

/// Option type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Single-letter code used in contract names.
    pub fn code(&self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// One option holding.
///
/// `symbol` is the underlying symbol (e.g. `BTCUSDT`) used for market data
/// lookups. `quantity` is signed: positive for long, negative for short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub strike: Decimal,
    pub expiration: DateTime<Utc>,
    pub option_type: OptionType,
    pub quantity: f64,
    /// Underlying price recorded with the position. Used when the market
    /// snapshot has no quote for `symbol`.
    pub underlying_price: f64,
    pub implied_volatility: f64,
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

impl Position {
    /// Create a new position with the default risk-free rate.
    pub fn new(
        symbol: impl Into<String>,
        strike: Decimal,
        expiration: DateTime<Utc>,
        option_type: OptionType,
        quantity: f64,
        underlying_price: f64,
        implied_volatility: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            strike,
            expiration,
            option_type,
            quantity,
            underlying_price,
            implied_volatility,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }

    /// Override the risk-free rate.
    #[must_use]
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Exchange-style contract name: `{symbol}-{YYMMDD}-{strike}-{C|P}`.
    pub fn contract_name(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.symbol,
            self.expiration.format("%y%m%d"),
            self.strike.normalize(),
            self.option_type.code()
        )
    }

    /// Whether the position has expired relative to `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration <= now
    }

    /// Structural checks that do not depend on market data.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(CoreError::InvalidPosition("empty symbol".to_string()));
        }
        if !self.quantity.is_finite() {
            return Err(CoreError::InvalidQuantity(format!(
                "{} quantity is not finite",
                self.symbol
            )));
        }
        Ok(())
    }
}
