//! Engine error types.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Risk error: {0}")]
    Risk(#[from] hedge_risk::RiskError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] hedge_strategy::StrategyError),

    #[error("Feed error: {0}")]
    Feed(#[from] hedge_feed::FeedError),

    #[error("Position source error: {0}")]
    PositionSource(String),

    #[error("Insufficient balance: {available} available, {required} required")]
    InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
