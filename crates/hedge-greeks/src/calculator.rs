//! Greeks calculator.

use crate::error::{GreeksError, GreeksResult};
use crate::math::{normal_cdf, normal_pdf};
use chrono::{DateTime, Utc};
use hedge_core::{Greeks, MarketSnapshot, OptionType, Position};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::trace;

const MS_PER_DAY: f64 = 86_400_000.0;
const DAYS_PER_YEAR: f64 = 365.25;
const THETA_DAYS: f64 = 365.0;

/// Greeks calculator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreeksConfig {
    /// Derive volatility from the snapshot's realized volatility instead of
    /// the position's implied volatility, when available.
    #[serde(default)]
    pub use_realized_vol: bool,
    /// Multiplier from realized to model volatility. Default: 2.0.
    #[serde(default = "default_realized_vol_multiplier")]
    pub realized_vol_multiplier: f64,
    /// Model volatility floor when derived from realized. Default: 0.1.
    #[serde(default = "default_min_vol")]
    pub min_vol: f64,
    /// Model volatility cap when derived from realized. Default: 2.0.
    #[serde(default = "default_max_vol")]
    pub max_vol: f64,
}

fn default_realized_vol_multiplier() -> f64 {
    2.0
}

fn default_min_vol() -> f64 {
    0.1
}

fn default_max_vol() -> f64 {
    2.0
}

impl Default for GreeksConfig {
    fn default() -> Self {
        Self {
            use_realized_vol: false,
            realized_vol_multiplier: default_realized_vol_multiplier(),
            min_vol: default_min_vol(),
            max_vol: default_max_vol(),
        }
    }
}

/// Result of a Greeks computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GreeksOutcome {
    Live(Greeks),
    /// Expired contract: contributes zero Greeks.
    Expired,
}

impl GreeksOutcome {
    pub fn greeks(&self) -> Greeks {
        match self {
            Self::Live(g) => *g,
            Self::Expired => Greeks::ZERO,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Black-Scholes model inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsInputs {
    pub spot: f64,
    pub strike: f64,
    /// Years to expiry.
    pub time: f64,
    pub rate: f64,
    pub volatility: f64,
}

impl BsInputs {
    fn validate(&self, symbol: &str) -> GreeksResult<()> {
        if !self.spot.is_finite() || self.spot <= 0.0 {
            return Err(GreeksError::invalid(symbol, format!("spot {}", self.spot)));
        }
        if !self.strike.is_finite() || self.strike <= 0.0 {
            return Err(GreeksError::invalid(symbol, format!("strike {}", self.strike)));
        }
        if !self.volatility.is_finite() || self.volatility <= 0.0 {
            return Err(GreeksError::invalid(
                symbol,
                format!("volatility {}", self.volatility),
            ));
        }
        if !self.rate.is_finite() || !self.time.is_finite() || self.time <= 0.0 {
            return Err(GreeksError::invalid(
                symbol,
                format!("rate {} time {}", self.rate, self.time),
            ));
        }
        Ok(())
    }

    fn d1_d2(&self) -> (f64, f64) {
        let vol_sqrt_t = self.volatility * self.time.sqrt();
        let d1 = ((self.spot / self.strike).ln()
            + (self.rate + 0.5 * self.volatility * self.volatility) * self.time)
            / vol_sqrt_t;
        (d1, d1 - vol_sqrt_t)
    }

    /// Closed-form Greeks. Inputs must already be validated.
    fn greeks(&self, option_type: OptionType) -> Greeks {
        let (d1, d2) = self.d1_d2();
        let sqrt_t = self.time.sqrt();
        let pdf_d1 = normal_pdf(d1);
        let discount = (-self.rate * self.time).exp();

        let gamma = pdf_d1 / (self.spot * self.volatility * sqrt_t);
        let vega = self.spot * pdf_d1 * sqrt_t / 100.0;
        let decay = -self.spot * pdf_d1 * self.volatility / (2.0 * sqrt_t);

        let (delta, theta_annual, rho) = match option_type {
            OptionType::Call => (
                normal_cdf(d1),
                decay - self.rate * self.strike * discount * normal_cdf(d2),
                self.strike * self.time * discount * normal_cdf(d2) / 100.0,
            ),
            OptionType::Put => (
                normal_cdf(d1) - 1.0,
                decay + self.rate * self.strike * discount * normal_cdf(-d2),
                -self.strike * self.time * discount * normal_cdf(-d2) / 100.0,
            ),
        };

        Greeks::new(delta, gamma, theta_annual / THETA_DAYS, vega, rho)
    }
}

/// Black-Scholes price of a European option.
pub fn black_scholes_price(option_type: OptionType, inputs: &BsInputs) -> GreeksResult<f64> {
    inputs.validate("bs_price")?;
    let (d1, d2) = inputs.d1_d2();
    let discounted_strike = inputs.strike * (-inputs.rate * inputs.time).exp();
    Ok(match option_type {
        OptionType::Call => inputs.spot * normal_cdf(d1) - discounted_strike * normal_cdf(d2),
        OptionType::Put => discounted_strike * normal_cdf(-d2) - inputs.spot * normal_cdf(-d1),
    })
}

/// Black-Scholes Greeks for a European option.
pub fn black_scholes_greeks(option_type: OptionType, inputs: &BsInputs) -> GreeksResult<Greeks> {
    inputs.validate("bs_greeks")?;
    Ok(inputs.greeks(option_type))
}

/// Years between two instants, on a 365.25-day year.
pub fn years_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MS_PER_DAY / DAYS_PER_YEAR
}

/// Computes per-contract Greeks for positions. Stateless apart from config.
#[derive(Debug, Clone, Default)]
pub struct GreeksCalculator {
    config: GreeksConfig,
}

impl GreeksCalculator {
    pub fn new(config: GreeksConfig) -> Self {
        Self { config }
    }

    /// Compute Greeks for one position against a market snapshot.
    ///
    /// Returns `Expired` when the contract has no time left, and
    /// `InvalidMarketData` for non-positive or non-finite inputs.
    pub fn compute_greeks(
        &self,
        position: &Position,
        snapshot: &MarketSnapshot,
    ) -> GreeksResult<GreeksOutcome> {
        let time = years_between(snapshot.as_of, position.expiration);
        if time <= 0.0 {
            return Ok(GreeksOutcome::Expired);
        }

        let inputs = self.inputs_for(position, snapshot, time)?;
        inputs.validate(&position.symbol)?;
        let greeks = inputs.greeks(position.option_type);
        if !greeks.is_finite() {
            return Err(GreeksError::invalid(
                &position.symbol,
                "non-finite greeks",
            ));
        }

        trace!(
            symbol = %position.symbol,
            strike = %position.strike,
            delta = greeks.delta,
            gamma = greeks.gamma,
            "Greeks computed"
        );
        Ok(GreeksOutcome::Live(greeks))
    }

    /// Black-Scholes inputs for a position at a given time to expiry.
    pub fn inputs_for(
        &self,
        position: &Position,
        snapshot: &MarketSnapshot,
        time: f64,
    ) -> GreeksResult<BsInputs> {
        let quote = snapshot.quote(&position.symbol);
        let spot = quote.map_or(position.underlying_price, |q| q.price);
        let strike = position
            .strike
            .to_f64()
            .ok_or_else(|| GreeksError::invalid(&position.symbol, "strike not representable"))?;

        let volatility = match quote.and_then(|q| q.realized_vol) {
            Some(realized) if self.config.use_realized_vol && realized.is_finite() => {
                (realized * self.config.realized_vol_multiplier)
                    .clamp(self.config.min_vol, self.config.max_vol)
            }
            _ => position.implied_volatility,
        };

        Ok(BsInputs {
            spot,
            strike,
            time,
            rate: position.risk_free_rate,
            volatility,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hedge_core::UnderlyingQuote;
    use rust_decimal_macros::dec;

    fn call(days: i64, now: DateTime<Utc>) -> Position {
        Position::new(
            "BTCUSDT",
            dec!(50000),
            now + Duration::days(days),
            OptionType::Call,
            10.0,
            52000.0,
            0.8,
        )
    }

    #[test]
    fn test_long_call_scenario() {
        let now = Utc::now();
        let snapshot = MarketSnapshot::new(now);
        let outcome = GreeksCalculator::default()
            .compute_greeks(&call(30, now), &snapshot)
            .unwrap();
        let g = outcome.greeks();
        assert!(g.delta > 0.0 && g.delta < 1.0);
        assert!(g.gamma > 0.0);
        assert!(g.theta < 0.0);
        assert!(g.vega > 0.0);
        assert!(g.rho > 0.0);
    }

    #[test]
    fn test_expired_returns_zero() {
        let now = Utc::now();
        let snapshot = MarketSnapshot::new(now);
        let calc = GreeksCalculator::default();
        for days in [0, -1, -30] {
            let outcome = calc.compute_greeks(&call(days, now), &snapshot).unwrap();
            assert!(outcome.is_expired());
            assert_eq!(outcome.greeks(), Greeks::ZERO);
        }
    }

    #[test]
    fn test_expired_wins_over_bad_inputs() {
        let now = Utc::now();
        let mut pos = call(-1, now);
        pos.implied_volatility = 0.0;
        let outcome = GreeksCalculator::default()
            .compute_greeks(&pos, &MarketSnapshot::new(now))
            .unwrap();
        assert!(outcome.is_expired());
    }

    #[test]
    fn test_invalid_volatility_and_spot() {
        let now = Utc::now();
        let snapshot = MarketSnapshot::new(now);
        let calc = GreeksCalculator::default();

        let mut pos = call(30, now);
        pos.implied_volatility = 0.0;
        assert!(matches!(
            calc.compute_greeks(&pos, &snapshot),
            Err(GreeksError::InvalidMarketData { .. })
        ));

        let mut pos = call(30, now);
        pos.underlying_price = -1.0;
        assert!(calc.compute_greeks(&pos, &snapshot).is_err());

        let mut pos = call(30, now);
        pos.implied_volatility = f64::NAN;
        assert!(calc.compute_greeks(&pos, &snapshot).is_err());
    }

    #[test]
    fn test_snapshot_price_overrides_position_price() {
        let now = Utc::now();
        let calc = GreeksCalculator::default();
        let pos = call(30, now);
        let plain = calc
            .compute_greeks(&pos, &MarketSnapshot::new(now))
            .unwrap()
            .greeks();
        let quoted = MarketSnapshot::new(now)
            .with_quote("BTCUSDT", UnderlyingQuote::fresh(60000.0, now));
        let moved = calc.compute_greeks(&pos, &quoted).unwrap().greeks();
        assert!(moved.delta > plain.delta);

        let bad = MarketSnapshot::new(now)
            .with_quote("BTCUSDT", UnderlyingQuote::fresh(0.0, now));
        assert!(calc.compute_greeks(&pos, &bad).is_err());
    }

    #[test]
    fn test_put_call_delta_relation() {
        let now = Utc::now();
        let calc = GreeksCalculator::default();
        let snapshot = MarketSnapshot::new(now);
        let c = call(30, now);
        let mut p = c.clone();
        p.option_type = OptionType::Put;
        let gc = calc.compute_greeks(&c, &snapshot).unwrap().greeks();
        let gp = calc.compute_greeks(&p, &snapshot).unwrap().greeks();
        assert!((gc.delta - gp.delta - 1.0).abs() < 1e-12);
        assert!((gc.gamma - gp.gamma).abs() < 1e-15);
        assert!(gp.rho < 0.0);
    }

    #[test]
    fn test_put_call_parity() {
        let cases = [
            (52000.0, 50000.0, 30.0 / 365.25, 0.05, 0.8),
            (100.0, 120.0, 1.0, 0.02, 0.2),
            (3200.0, 3000.0, 0.01, 0.0, 1.5),
            (1.2, 1.0, 2.0, 0.1, 0.05),
        ];
        for (spot, strike, time, rate, volatility) in cases {
            let inputs = BsInputs {
                spot,
                strike,
                time,
                rate,
                volatility,
            };
            let c = black_scholes_price(OptionType::Call, &inputs).unwrap();
            let p = black_scholes_price(OptionType::Put, &inputs).unwrap();
            let parity = spot - strike * (-rate * time).exp();
            assert!(
                (c - p - parity).abs() < 1e-9 * spot.max(1.0),
                "parity failed for spot={spot} strike={strike}"
            );
        }
    }

    #[test]
    fn test_realized_vol_mode() {
        let now = Utc::now();
        let calc = GreeksCalculator::new(GreeksConfig {
            use_realized_vol: true,
            ..GreeksConfig::default()
        });
        let snapshot = MarketSnapshot::new(now).with_quote(
            "BTCUSDT",
            UnderlyingQuote::fresh(52000.0, now).with_realized_vol(5.0),
        );
        let inputs = calc
            .inputs_for(&call(30, now), &snapshot, 0.1)
            .unwrap();
        assert_eq!(inputs.volatility, 2.0);
    }
}
