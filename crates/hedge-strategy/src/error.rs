//! Strategy error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Risk configuration error: {0}")]
    Risk(#[from] hedge_risk::RiskError),
}

pub type StrategyResult<T> = Result<T, StrategyError>;
