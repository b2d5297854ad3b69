//! Reference prices for simulated fills.

use dashmap::DashMap;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Source of a reference price per instrument symbol.
pub trait PriceProvider: Send + Sync {
    fn reference_price(&self, symbol: &str) -> Option<Decimal>;
}

/// Underlying prices shared between the engine and the paper gateway.
///
/// Derivative symbols (`BTCUSDT-PERP`, `BTCUSDT-250328-50000-C`) resolve
/// to their underlying, the part before the first `-`.
#[derive(Debug, Default)]
pub struct ReferencePrices {
    prices: DashMap<String, Decimal>,
}

impl ReferencePrices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, symbol: impl Into<String>, price: Decimal) {
        if price > Decimal::ZERO {
            self.prices.insert(symbol.into(), price);
        }
    }

    /// Ignores non-finite and non-positive prices.
    pub fn update_f64(&self, symbol: impl Into<String>, price: f64) {
        if let Some(price) = Decimal::from_f64(price) {
            self.update(symbol, price);
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl PriceProvider for ReferencePrices {
    fn reference_price(&self, symbol: &str) -> Option<Decimal> {
        if let Some(price) = self.prices.get(symbol) {
            return Some(*price);
        }
        let underlying = symbol.split('-').next()?;
        self.prices.get(underlying).map(|p| *p)
    }
}
