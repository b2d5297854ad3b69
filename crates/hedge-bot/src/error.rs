//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Invalid position: {0}")]
    Position(#[from] hedge_core::CoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] hedge_engine::EngineError),

    #[error("Feed error: {0}")]
    Feed(#[from] hedge_feed::FeedError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] hedge_classifier::ClassifierError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] hedge_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
