//! Market data for the hedging engine.
//!
//! - `MarketDataGateway`: external price/ticker/balance source
//! - `TtlCache`: generic expiring cache with an `is_stale` predicate
//! - `MarketDataService`: snapshots with stale fallback, market conditions
//! - `RestMarketDataGateway` / `StaticMarketDataGateway`: gateway impls

pub mod cache;
pub mod error;
pub mod gateway;
pub mod rest;
pub mod service;
pub mod static_gateway;
pub mod volatility;

pub use cache::{CacheHit, TtlCache};
pub use error::{FeedError, FeedResult};
pub use gateway::{Balance, BoxFuture, MarketDataGateway, Ticker};
pub use rest::RestMarketDataGateway;
pub use service::{FeedConfig, MarketDataService};
pub use static_gateway::StaticMarketDataGateway;
pub use volatility::{parkinson_volatility, RegimeThresholds};
