//! Engine and monitoring configuration.

use hedge_executor::ExecutorConfig;
use hedge_greeks::GreeksConfig;
use hedge_risk::AlertConfig;
use hedge_strategy::StrategyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub greeks: GreeksConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    /// Available balance required before sending hedge orders.
    /// Zero disables the check. Default: 0.
    #[serde(default)]
    pub min_balance: Decimal,
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.strategy.validate()?;
        if self.min_balance < Decimal::ZERO {
            return Err(EngineError::Config(format!(
                "min_balance ({}) must not be negative",
                self.min_balance
            )));
        }
        Ok(())
    }
}

/// Monitoring loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Scheduled cycle interval (ms). Default: 30,000.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Analyze and plan, never execute. Default: false.
    #[serde(default)]
    pub observe_only: bool,
    /// Capacity of the out-of-band price update channel. Default: 256.
    #[serde(default = "default_price_channel_capacity")]
    pub price_channel_capacity: usize,
}

fn default_interval_ms() -> u64 {
    30_000
}

fn default_price_channel_capacity() -> usize {
    256
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            observe_only: false,
            price_channel_capacity: default_price_channel_capacity(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.interval_ms == 0 {
            return Err(EngineError::Config(
                "monitor interval_ms must be positive".to_string(),
            ));
        }
        if self.price_channel_capacity == 0 {
            return Err(EngineError::Config(
                "price_channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
