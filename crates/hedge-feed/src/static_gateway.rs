//! In-memory market data gateway for paper trading and tests.

use crate::error::{FeedError, FeedResult};
use crate::gateway::{Balance, BoxFuture, MarketDataGateway, Ticker};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Scriptable gateway serving configured prices.
#[derive(Debug, Default)]
pub struct StaticMarketDataGateway {
    prices: Mutex<HashMap<String, f64>>,
    tickers: Mutex<HashMap<String, Ticker>>,
    balance: Mutex<Option<Balance>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    price_calls: AtomicUsize,
}

impl StaticMarketDataGateway {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_price(self, symbol: impl Into<String>, price: f64) -> Self {
        self.set_price(symbol, price);
        self
    }

    #[must_use]
    pub fn with_ticker(self, ticker: Ticker) -> Self {
        self.set_ticker(ticker);
        self
    }

    #[must_use]
    pub fn with_balance(self, balance: Balance) -> Self {
        *self.balance.lock() = Some(balance);
        self
    }

    pub fn set_price(&self, symbol: impl Into<String>, price: f64) {
        self.prices.lock().insert(symbol.into(), price);
    }

    pub fn set_ticker(&self, ticker: Ticker) {
        self.tickers.lock().insert(ticker.symbol.clone(), ticker);
    }

    /// Make every read for `symbol` fail.
    pub fn fail_symbol(&self, symbol: impl Into<String>) {
        self.failing.lock().insert(symbol.into());
    }

    pub fn restore_symbol(&self, symbol: &str) {
        self.failing.lock().remove(symbol);
    }

    /// Make every read fail with `GatewayUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `get_price` calls served or failed.
    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self, symbol: &str) -> FeedResult<()> {
        if self.offline.load(Ordering::SeqCst) || self.failing.lock().contains(symbol) {
            return Err(FeedError::GatewayUnavailable(format!(
                "{symbol}: gateway offline"
            )));
        }
        Ok(())
    }
}

impl MarketDataGateway for StaticMarketDataGateway {
    fn get_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, FeedResult<f64>> {
        Box::pin(async move {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            self.check_available(symbol)?;
            self.prices
                .lock()
                .get(symbol)
                .copied()
                .ok_or_else(|| FeedError::SymbolNotFound(symbol.to_string()))
        })
    }

    fn get_ticker<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, FeedResult<Ticker>> {
        Box::pin(async move {
            self.check_available(symbol)?;
            self.tickers
                .lock()
                .get(symbol)
                .cloned()
                .ok_or_else(|| FeedError::SymbolNotFound(symbol.to_string()))
        })
    }

    fn get_balance(&self) -> BoxFuture<'_, FeedResult<Balance>> {
        Box::pin(async move {
            if self.offline.load(Ordering::SeqCst) {
                return Err(FeedError::GatewayUnavailable("balance: gateway offline".to_string()));
            }
            self.balance
                .lock()
                .clone()
                .ok_or_else(|| FeedError::Unsupported("no balance configured".to_string()))
        })
    }
}
