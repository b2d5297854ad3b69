//! Hedging engine service and monitoring loop.
//!
//! # Key Components
//!
//! - [`HedgingEngine`]: Analyze, plan and execute one book per call
//! - [`MonitoringLoop`]: Fixed-interval driver with out-of-band emergency runs
//! - [`PositionSource`]: Supplies the current positions each cycle
//!
//! # Cycle
//!
//! positions + snapshot -> Greeks -> exposure -> classifier -> strategy ->
//! execution. Every stage runs in order; a failure is reported in the
//! [`CycleOutcome`] instead of aborting the loop.

pub mod config;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod positions;

pub use config::{EngineConfig, MonitorConfig};
pub use engine::{CycleOutcome, CycleStage, HedgingEngine};
pub use error::{EngineError, EngineResult};
pub use monitor::{CycleTrigger, MonitoringLoop, PriceUpdate};
pub use positions::{group_by_underlying, PositionSource, StaticPositionSource};
