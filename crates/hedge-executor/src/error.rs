//! Executor error types.

use thiserror::Error;

/// Failure of a single order at the execution gateway.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("Execution gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

impl OrderError {
    /// Whether a later cycle could succeed with the same order.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::GatewayUnavailable(_))
    }
}

pub type OrderResult<T> = Result<T, OrderError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    #[error("Execution stopped at {symbol} after {completed} filled legs: {source}")]
    PartialExecution {
        symbol: String,
        completed: usize,
        #[source]
        source: OrderError,
    },

    #[error("Execution cancelled after {completed} filled legs")]
    Cancelled { completed: usize },
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
