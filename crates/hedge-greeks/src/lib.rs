//! Closed-form option Greeks.
//!
//! Black-Scholes delta, gamma, theta, vega and rho for European options,
//! using an Abramowitz-Stegun approximation of the standard normal CDF.

pub mod calculator;
pub mod error;
pub mod math;

pub use calculator::{
    black_scholes_greeks, black_scholes_price, years_between, BsInputs, GreeksCalculator,
    GreeksConfig, GreeksOutcome,
};
pub use error::{GreeksError, GreeksResult};
pub use math::{normal_cdf, normal_pdf};
