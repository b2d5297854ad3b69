//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
