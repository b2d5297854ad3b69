//! Core domain types for the gamma/delta hedging engine.
//!
//! This crate provides the types shared by every stage of a hedging cycle:
//! - `Position`, `OptionType`: option positions supplied each cycle
//! - `Greeks`: per-contract sensitivities
//! - `MarketSnapshot`, `MarketConditions`: read-only market inputs
//! - `ExposureReport`, `RiskLevel`: aggregated portfolio risk
//! - `HedgingStrategy`, `Instrument`, `ExecutionPlan`: the hedge decision
//! - `ExecutionResult`, `OrderRequest`, `OrderFill`: execution outcome

pub mod error;
pub mod execution;
pub mod exposure;
pub mod greeks;
pub mod market;
pub mod position;
pub mod strategy;

pub use error::{CoreError, Result};
pub use execution::{
    ClientOrderId, ExecutionResult, InstrumentExecution, OrderFill, OrderRequest, OrderSide,
    RollbackRecord,
};
pub use exposure::{ExcludedPosition, ExposureReport, RiskLevel};
pub use greeks::Greeks;
pub use market::{MarketConditions, MarketSnapshot, UnderlyingQuote, VolatilityRegime};
pub use position::{OptionType, Position};
pub use strategy::{
    ClassifierOutcome, ExecutionPlan, HedgeAction, HedgeClass, HedgePurpose, HedgingStrategy,
    Instrument, InstrumentKind, OrderType,
};
