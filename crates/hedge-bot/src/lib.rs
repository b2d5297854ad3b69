//! Gamma/delta hedging engine application.
//!
//! Wires the components into a running service:
//! - Market data gateway (static prices or public REST tickers)
//! - Paper execution gateway fed by snapshot reference prices
//! - Optional classifier artifact
//! - Monitoring loop with hourly hedging statistics

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, OperatingMode};
pub use error::{AppError, AppResult};
