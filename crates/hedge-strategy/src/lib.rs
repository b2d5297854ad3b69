//! Hedging strategy generation.
//!
//! Turns an `ExposureReport` and `MarketConditions` (optionally refined by
//! a classifier outcome) into a `HedgingStrategy`:
//!
//! ```text
//! exposure ──► action (threshold state machine)
//!          ──► hedge ratio (market × liquidity × cost × classifier, clamped)
//!          ──► instruments (futures / options / vol product)
//!          ──► execution plan (timing, order type, slicing) + cost estimate
//! ```

pub mod config;
pub mod cost;
pub mod error;
pub mod generator;
pub mod instruments;
pub mod timing;

pub use config::{RatioConfig, StrategyConfig};
pub use cost::CostModel;
pub use error::{StrategyError, StrategyResult};
pub use generator::StrategyGenerator;
pub use instruments::{InstrumentConfig, InstrumentSelector};
pub use timing::TimingConfig;
