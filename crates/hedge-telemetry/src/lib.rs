//! Prometheus metrics, structured logging and hedging statistics.

pub mod error;
pub mod hedging_stats;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use hedging_stats::{HedgingStats, HedgingStatsReporter};
pub use logging::{init_logging, DEFAULT_LOG_FILTER};
pub use metrics::Metrics;
