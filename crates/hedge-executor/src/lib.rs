//! Hedge order execution.
//!
//! # Key Components
//!
//! - [`HedgeExecutor`]: Places a strategy's instruments in priority order,
//!   rolling back filled legs when a later leg fails or the run is cancelled
//! - [`ExecutionGateway`]: Order placement seam
//! - [`PaperExecutionGateway`]: Simulated fills at reference prices
//! - [`MockExecutionGateway`]: Scripted gateway for tests
//! - [`ReferencePrices`]: Shared reference price table

pub mod error;
pub mod executor;
pub mod gateway;
pub mod paper;
pub mod price_provider;

pub use error::{ExecutorError, ExecutorResult, OrderError, OrderResult};
pub use executor::{hedge_effectiveness, ExecutorConfig, HedgeExecutor};
pub use gateway::{BoxFuture, DynExecutionGateway, ExecutionGateway, MockExecutionGateway};
pub use paper::{PaperConfig, PaperExecutionGateway};
pub use price_provider::{PriceProvider, ReferencePrices};
