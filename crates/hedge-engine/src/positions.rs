//! Position source seam.

use std::collections::BTreeMap;

use hedge_core::Position;
use parking_lot::RwLock;

use crate::error::EngineResult;

/// Supplies the current option positions at the start of each cycle.
#[cfg_attr(test, mockall::automock)]
pub trait PositionSource: Send + Sync {
    fn positions(&self) -> EngineResult<Vec<Position>>;
}

/// In-memory positions, replaceable at runtime.
#[derive(Debug, Default)]
pub struct StaticPositionSource {
    positions: RwLock<Vec<Position>>,
}

impl StaticPositionSource {
    pub fn new(positions: Vec<Position>) -> Self {
        Self {
            positions: RwLock::new(positions),
        }
    }

    pub fn replace(&self, positions: Vec<Position>) {
        *self.positions.write() = positions;
    }
}

impl PositionSource for StaticPositionSource {
    fn positions(&self) -> EngineResult<Vec<Position>> {
        Ok(self.positions.read().clone())
    }
}

/// Positions per underlying, in symbol order.
pub fn group_by_underlying(positions: &[Position]) -> BTreeMap<String, Vec<Position>> {
    let mut books: BTreeMap<String, Vec<Position>> = BTreeMap::new();
    for position in positions {
        books
            .entry(position.symbol.clone())
            .or_default()
            .push(position.clone());
    }
    books
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use hedge_core::OptionType;
    use rust_decimal_macros::dec;

    fn position(symbol: &str) -> Position {
        Position::new(
            symbol,
            dec!(100),
            Utc::now() + Duration::days(7),
            OptionType::Call,
            1.0,
            100.0,
            0.5,
        )
    }

    #[test]
    fn test_group_by_underlying() {
        let books = group_by_underlying(&[
            position("ETHUSDT"),
            position("BTCUSDT"),
            position("ETHUSDT"),
        ]);
        let keys: Vec<&String> = books.keys().collect();
        assert_eq!(keys, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(books["ETHUSDT"].len(), 2);
    }

    #[test]
    fn test_static_source_replace() {
        let source = StaticPositionSource::new(vec![position("BTCUSDT")]);
        assert_eq!(source.positions().unwrap().len(), 1);
        source.replace(Vec::new());
        assert!(source.positions().unwrap().is_empty());
    }
}
