//! Market data gateway abstraction.

use crate::error::FeedResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// 24h ticker statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last_price: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    /// Percent change over the window (e.g. -2.5 for -2.5%).
    pub change_pct: f64,
}

/// Account balance in the quote asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub available: Decimal,
    pub total: Decimal,
}

/// External market data source.
///
/// Implementations must be `Send + Sync`; the engine holds them as
/// `Arc<dyn MarketDataGateway>`.
pub trait MarketDataGateway: Send + Sync {
    fn get_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, FeedResult<f64>>;

    fn get_ticker<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, FeedResult<Ticker>>;

    fn get_balance(&self) -> BoxFuture<'_, FeedResult<Balance>>;
}
