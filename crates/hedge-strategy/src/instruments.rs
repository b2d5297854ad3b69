//! Hedge instrument selection.

use hedge_core::position::DEFAULT_RISK_FREE_RATE;
use hedge_core::{
    ExposureReport, HedgeAction, HedgePurpose, Instrument, InstrumentKind, MarketConditions,
    OptionType,
};
use hedge_greeks::{black_scholes_greeks, years_between, BsInputs};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Appended to the underlying for the futures contract. Default: "-PERP".
    #[serde(default = "default_futures_suffix")]
    pub futures_suffix: String,
    /// Appended to the underlying for the volatility product. Default: "-VOL".
    #[serde(default = "default_vol_product_suffix")]
    pub vol_product_suffix: String,
    /// Maximum option legs for a gamma hedge. Default: 2.
    #[serde(default = "default_max_option_legs")]
    pub max_option_legs: usize,
    /// Rate used to model hedge option Greeks. Default: 0.05.
    #[serde(default = "default_option_rate")]
    pub option_rate: f64,
}

fn default_futures_suffix() -> String {
    "-PERP".to_string()
}

fn default_vol_product_suffix() -> String {
    "-VOL".to_string()
}

fn default_max_option_legs() -> usize {
    2
}

fn default_option_rate() -> f64 {
    DEFAULT_RISK_FREE_RATE
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            futures_suffix: default_futures_suffix(),
            vol_product_suffix: default_vol_product_suffix(),
            max_option_legs: default_max_option_legs(),
            option_rate: default_option_rate(),
        }
    }
}

/// Picks hedge legs for an exposure.
#[derive(Debug, Clone, Default)]
pub struct InstrumentSelector {
    config: InstrumentConfig,
}

impl InstrumentSelector {
    pub fn new(config: InstrumentConfig) -> Self {
        Self { config }
    }

    /// Select instruments, sorted by priority.
    ///
    /// - FUTURES when |delta| exceeds `delta_tolerance`
    /// - OPTION legs when |gamma| exceeds `gamma_threshold`
    /// - VOL_PRODUCT under HIGH_VOL/CRISIS with an aggressive action
    pub fn select(
        &self,
        exposure: &ExposureReport,
        conditions: &MarketConditions,
        action: HedgeAction,
        delta_tolerance: f64,
        gamma_threshold: f64,
    ) -> Vec<Instrument> {
        let mut instruments = Vec::new();

        if exposure.total_delta.abs() > delta_tolerance {
            instruments.push(
                Instrument::new(
                    InstrumentKind::Futures,
                    format!("{}{}", conditions.underlying, self.config.futures_suffix),
                    -exposure.total_delta,
                    HedgePurpose::DeltaHedge,
                )
                .with_unit_exposure(1.0, 0.0),
            );
        }

        if exposure.total_gamma.abs() > gamma_threshold {
            instruments.extend(self.option_legs(exposure, conditions));
        }

        if conditions.regime.is_stressed() && action.is_aggressive() {
            instruments.push(Instrument::new(
                InstrumentKind::VolProduct,
                format!("{}{}", conditions.underlying, self.config.vol_product_suffix),
                -exposure.totals.vega,
                HedgePurpose::VolatilityHedge,
            ));
        }

        instruments.sort_by_key(|i| i.priority);
        instruments
    }

    /// Options at the strikes nearest the reference price and the nearest
    /// live expiry, splitting the gamma offset evenly across legs.
    fn option_legs(
        &self,
        exposure: &ExposureReport,
        conditions: &MarketConditions,
    ) -> Vec<Instrument> {
        let Some(expiry) = exposure.nearest_live_expiry() else {
            warn!("No live expiry for gamma hedge, skipping option legs");
            return Vec::new();
        };
        let Some(reference) = Decimal::from_f64(conditions.reference_price)
            .filter(|_| conditions.reference_price > 0.0)
        else {
            warn!(
                reference_price = conditions.reference_price,
                "No usable reference price for gamma hedge, skipping option legs"
            );
            return Vec::new();
        };

        let strikes: Vec<Decimal> = exposure
            .strikes_nearest(reference)
            .into_iter()
            .take(self.config.max_option_legs)
            .collect();
        if strikes.is_empty() {
            return Vec::new();
        }
        let gamma_share = -exposure.total_gamma / strikes.len() as f64;
        let time = years_between(exposure.as_of, expiry);

        let mut legs = Vec::with_capacity(strikes.len());
        for strike in strikes {
            let inputs = BsInputs {
                spot: conditions.reference_price,
                strike: strike.to_f64().unwrap_or(0.0),
                time,
                rate: self.config.option_rate,
                volatility: conditions.implied_volatility,
            };
            let call = match black_scholes_greeks(OptionType::Call, &inputs) {
                Ok(g) if g.gamma > 0.0 => g,
                Ok(_) => continue,
                Err(e) => {
                    warn!(strike = %strike, error = %e, "Cannot model hedge option");
                    continue;
                }
            };

            let quantity = gamma_share / call.gamma;
            // Pick the side whose delta leans against the book.
            let option_type = if quantity * exposure.total_delta < 0.0 {
                OptionType::Call
            } else {
                OptionType::Put
            };
            let unit_delta = match option_type {
                OptionType::Call => call.delta,
                OptionType::Put => call.delta - 1.0,
            };
            let symbol = format!(
                "{}-{}-{}-{}",
                conditions.underlying,
                expiry.format("%y%m%d"),
                strike.normalize(),
                option_type.code()
            );
            debug!(symbol = %symbol, quantity, unit_gamma = call.gamma, "Option hedge leg");
            legs.push(
                Instrument::new(InstrumentKind::Option, symbol, quantity, HedgePurpose::GammaHedge)
                    .with_unit_exposure(unit_delta, call.gamma),
            );
        }
        legs
    }
}
