//! Portfolio exposure and risk thresholds.
//!
//! - ExposureAggregator: sums position Greeks into an `ExposureReport`
//! - RiskThresholds: gamma and delta-imbalance boundaries
//! - AlertMonitor: critical alerts on gamma blow-up, delta deviation, cost
//! - EmergencyCheck / EmergencyLatch: hard-threshold breach detection

pub mod aggregator;
pub mod alerts;
pub mod emergency;
pub mod error;
pub mod thresholds;

pub use aggregator::ExposureAggregator;
pub use alerts::{Alert, AlertConfig, AlertKind, AlertMonitor};
pub use emergency::{EmergencyBreach, EmergencyCheck, EmergencyLatch};
pub use error::{RiskError, RiskResult};
pub use thresholds::{DeltaTolerance, RiskThresholds};
