//! Market data service: cached quotes, stale fallback and market conditions.

use crate::cache::TtlCache;
use crate::error::FeedResult;
use crate::gateway::{Balance, MarketDataGateway, Ticker};
use crate::volatility::{ticker_volatility, RegimeThresholds, DEFAULT_VOLATILITY};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hedge_core::{MarketConditions, MarketSnapshot, Position, UnderlyingQuote};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_TIME_TO_EXPIRY_DAYS: f64 = 30.0;
const DEFAULT_LIQUIDITY: f64 = 0.8;

/// Market data service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Quote and ticker TTL (ms). Matches the monitoring interval. Default: 30,000.
    #[serde(default = "default_quote_ttl_ms")]
    pub quote_ttl_ms: u64,
    /// Cached entries older than this many TTLs are evicted. Default: 10.
    #[serde(default = "default_evict_after_ttls")]
    pub evict_after_ttls: u32,
    /// Last-resort prices when the gateway fails and nothing is cached.
    #[serde(default = "default_fallback_prices")]
    pub fallback_prices: BTreeMap<String, f64>,
    #[serde(default)]
    pub regimes: RegimeThresholds,
    /// 24h volume treated as fully liquid. Default: 100,000.
    #[serde(default = "default_reference_volume")]
    pub reference_volume: f64,
    /// EWMA weight for the running volume mean. Default: 0.2.
    #[serde(default = "default_volume_alpha")]
    pub volume_alpha: f64,
    /// Correlation strength reported in market conditions. Default: 0.5.
    #[serde(default = "default_correlation_strength")]
    pub correlation_strength: f64,
}

fn default_quote_ttl_ms() -> u64 {
    30_000
}

fn default_evict_after_ttls() -> u32 {
    10
}

fn default_fallback_prices() -> BTreeMap<String, f64> {
    [
        ("BTCUSDT", 97_000.0),
        ("ETHUSDT", 3_200.0),
        ("BNBUSDT", 580.0),
        ("SOLUSDT", 180.0),
        ("XRPUSDT", 1.20),
        ("DOGEUSDT", 0.35),
        ("ADAUSDT", 0.85),
    ]
    .into_iter()
    .map(|(s, p)| (s.to_string(), p))
    .collect()
}

fn default_reference_volume() -> f64 {
    100_000.0
}

fn default_volume_alpha() -> f64 {
    0.2
}

fn default_correlation_strength() -> f64 {
    0.5
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            quote_ttl_ms: default_quote_ttl_ms(),
            evict_after_ttls: default_evict_after_ttls(),
            fallback_prices: default_fallback_prices(),
            regimes: RegimeThresholds::default(),
            reference_volume: default_reference_volume(),
            volume_alpha: default_volume_alpha(),
            correlation_strength: default_correlation_strength(),
        }
    }
}

impl FeedConfig {
    pub fn quote_ttl(&self) -> Duration {
        i64::try_from(self.quote_ttl_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.quote_ttl_ms == 0 {
            return Err("quote_ttl_ms must be positive".to_string());
        }
        if !(self.volume_alpha > 0.0 && self.volume_alpha <= 1.0) {
            return Err(format!(
                "volume_alpha ({}) must be in (0, 1]",
                self.volume_alpha
            ));
        }
        if !(self.reference_volume > 0.0) {
            return Err(format!(
                "reference_volume ({}) must be positive",
                self.reference_volume
            ));
        }
        Ok(())
    }
}

/// Reads market data through a gateway, caching results with a TTL.
///
/// Gateway failures never abort a cycle: the last cached value is used
/// and flagged stale, then the fallback table, then nothing (callers use
/// the position's own price).
pub struct MarketDataService {
    gateway: Arc<dyn MarketDataGateway>,
    config: FeedConfig,
    quotes: TtlCache<String, UnderlyingQuote>,
    tickers: TtlCache<String, Ticker>,
    volume_means: DashMap<String, f64>,
}

impl MarketDataService {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, config: FeedConfig) -> Self {
        let ttl = config.quote_ttl();
        Self {
            gateway,
            config,
            quotes: TtlCache::new(ttl),
            tickers: TtlCache::new(ttl),
            volume_means: DashMap::new(),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Quote for one symbol, refreshing it when older than the TTL.
    pub async fn quote(&self, symbol: &str, now: DateTime<Utc>) -> Option<UnderlyingQuote> {
        let key = symbol.to_string();
        let cached = self.quotes.get(&key, now);
        if let Some(hit) = &cached {
            if !hit.stale {
                return Some(hit.value.clone());
            }
        }

        match self.gateway.get_price(symbol).await {
            Ok(price) if price.is_finite() && price > 0.0 => {
                let quote = UnderlyingQuote::fresh(price, now);
                self.quotes.insert(key, quote.clone(), now);
                Some(quote)
            }
            Ok(price) => {
                warn!(symbol, price, "Gateway returned unusable price");
                self.fallback_quote(symbol, cached.map(|h| h.value), now)
            }
            Err(e) => {
                warn!(symbol, error = %e, "Price refresh failed, using fallback");
                self.fallback_quote(symbol, cached.map(|h| h.value), now)
            }
        }
    }

    fn fallback_quote(
        &self,
        symbol: &str,
        cached: Option<UnderlyingQuote>,
        now: DateTime<Utc>,
    ) -> Option<UnderlyingQuote> {
        if let Some(quote) = cached {
            return Some(quote.mark_stale());
        }
        self.config
            .fallback_prices
            .get(symbol)
            .map(|price| UnderlyingQuote::fresh(*price, now).mark_stale())
    }

    /// 24h ticker, refreshed when older than the TTL. Stale tickers are
    /// still returned when the refresh fails.
    pub async fn ticker(&self, symbol: &str, now: DateTime<Utc>) -> Option<Ticker> {
        let key = symbol.to_string();
        let cached = self.tickers.get(&key, now);
        if let Some(hit) = &cached {
            if !hit.stale {
                return Some(hit.value.clone());
            }
        }
        match self.gateway.get_ticker(symbol).await {
            Ok(ticker) => {
                self.tickers.insert(key, ticker.clone(), now);
                Some(ticker)
            }
            Err(e) => {
                debug!(symbol, error = %e, "Ticker refresh failed");
                cached.map(|h| h.value)
            }
        }
    }

    /// Snapshot of every distinct underlying in `symbols`.
    pub async fn snapshot(&self, symbols: &[String], now: DateTime<Utc>) -> MarketSnapshot {
        let unique: BTreeSet<&String> = symbols.iter().collect();
        let mut snapshot = MarketSnapshot::new(now);
        for symbol in unique {
            let Some(mut quote) = self.quote(symbol, now).await else {
                warn!(symbol = %symbol, "No price available, positions keep their own price");
                continue;
            };
            if let Some(ticker) = self.ticker(symbol, now).await {
                quote.realized_vol = Some(ticker_volatility(&ticker));
            }
            snapshot.insert(symbol.clone(), quote);
        }
        snapshot
    }

    /// Market conditions for one underlying.
    pub async fn conditions(
        &self,
        underlying: &str,
        snapshot: &MarketSnapshot,
        positions: &[Position],
    ) -> MarketConditions {
        let own: Vec<&Position> = positions.iter().filter(|p| p.symbol == underlying).collect();
        let reference_price = snapshot
            .price(underlying)
            .or_else(|| own.first().map(|p| p.underlying_price))
            .unwrap_or(0.0);

        let ticker = self.ticker(underlying, snapshot.as_of).await;
        let realized = ticker.as_ref().map_or(DEFAULT_VOLATILITY, ticker_volatility);

        let ivs: Vec<f64> = own
            .iter()
            .map(|p| p.implied_volatility)
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        let implied_volatility = if ivs.is_empty() {
            realized
        } else {
            ivs.iter().sum::<f64>() / ivs.len() as f64
        };

        let time_to_expiration_days = own
            .iter()
            .map(|p| p.expiration)
            .filter(|e| *e > snapshot.as_of)
            .min()
            .map_or(DEFAULT_TIME_TO_EXPIRY_DAYS, |e| {
                (e - snapshot.as_of).num_seconds() as f64 / 86_400.0
            });

        let (price_velocity, volume_ratio, liquidity) = match &ticker {
            Some(t) => (
                t.change_pct / 100.0,
                self.volume_ratio(underlying, t.volume),
                (t.volume / self.config.reference_volume).clamp(0.0, 1.0),
            ),
            None => (0.0, 1.0, DEFAULT_LIQUIDITY),
        };

        MarketConditions {
            underlying: underlying.to_string(),
            reference_price,
            regime: self.config.regimes.classify(realized),
            implied_volatility,
            liquidity,
            price_velocity,
            volume_ratio,
            time_to_expiration_days,
            correlation_strength: self.config.correlation_strength,
        }
    }

    /// Volume over its running mean, then fold it into the mean.
    fn volume_ratio(&self, symbol: &str, volume: f64) -> f64 {
        if !volume.is_finite() || volume < 0.0 {
            return 1.0;
        }
        let mut mean = self
            .volume_means
            .entry(symbol.to_string())
            .or_insert(volume);
        let ratio = if *mean > 0.0 { volume / *mean } else { 1.0 };
        *mean = self.config.volume_alpha * volume + (1.0 - self.config.volume_alpha) * *mean;
        ratio
    }

    /// Record an out-of-band price as a fresh quote.
    pub fn apply_price_update(&self, symbol: &str, price: f64, at: DateTime<Utc>) {
        if price.is_finite() && price > 0.0 {
            self.quotes
                .insert(symbol.to_string(), UnderlyingQuote::fresh(price, at), at);
        }
    }

    pub async fn balance(&self) -> FeedResult<Balance> {
        self.gateway.get_balance().await
    }

    /// Drop cache entries far past their TTL.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let max_age = i32::try_from(self.config.evict_after_ttls)
            .ok()
            .and_then(|n| self.config.quote_ttl().checked_mul(n))
            .unwrap_or(Duration::MAX);
        self.quotes.evict_older_than(max_age, now) + self.tickers.evict_older_than(max_age, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_gateway::StaticMarketDataGateway;
    use hedge_core::{OptionType, VolatilityRegime};
    use rust_decimal_macros::dec;

    fn ticker(symbol: &str, high: f64, low: f64, volume: f64) -> Ticker {
        Ticker {
            symbol: symbol.to_string(),
            last_price: (high + low) / 2.0,
            high,
            low,
            volume,
            change_pct: -2.5,
        }
    }

    fn service(gateway: Arc<StaticMarketDataGateway>) -> MarketDataService {
        MarketDataService::new(gateway, FeedConfig::default())
    }

    #[tokio::test]
    async fn test_fresh_quote_is_cached() {
        let gateway = Arc::new(StaticMarketDataGateway::new().with_price("BTCUSDT", 97000.0));
        let svc = service(gateway.clone());
        let now = Utc::now();

        let q = svc.quote("BTCUSDT", now).await.unwrap();
        assert!(!q.stale);
        svc.quote("BTCUSDT", now + Duration::seconds(10)).await.unwrap();
        assert_eq!(gateway.price_calls(), 1);

        svc.quote("BTCUSDT", now + Duration::seconds(31)).await.unwrap();
        assert_eq!(gateway.price_calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_cached_stale() {
        let gateway = Arc::new(StaticMarketDataGateway::new().with_price("BTCUSDT", 97000.0));
        let svc = service(gateway.clone());
        let now = Utc::now();
        svc.quote("BTCUSDT", now).await.unwrap();

        gateway.fail_symbol("BTCUSDT");
        let q = svc.quote("BTCUSDT", now + Duration::seconds(45)).await.unwrap();
        assert!(q.stale);
        assert_eq!(q.price, 97000.0);
    }

    #[tokio::test]
    async fn test_failure_without_cache_uses_fallback_table() {
        let gateway = Arc::new(StaticMarketDataGateway::new());
        gateway.set_offline(true);
        let svc = service(gateway);
        let now = Utc::now();

        let q = svc.quote("ETHUSDT", now).await.unwrap();
        assert!(q.stale);
        assert_eq!(q.price, 3200.0);
        assert!(svc.quote("UNKNOWNUSDT", now).await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_flags_stale_and_attaches_vol() {
        let gateway = Arc::new(
            StaticMarketDataGateway::new()
                .with_price("BTCUSDT", 97000.0)
                .with_ticker(ticker("BTCUSDT", 105.0, 100.0, 50_000.0)),
        );
        gateway.fail_symbol("SOLUSDT");
        let svc = service(gateway);
        let symbols = vec![
            "BTCUSDT".to_string(),
            "SOLUSDT".to_string(),
            "BTCUSDT".to_string(),
        ];
        let snap = svc.snapshot(&symbols, Utc::now()).await;
        assert_eq!(snap.quotes.len(), 2);
        assert!(snap.quote("BTCUSDT").unwrap().realized_vol.is_some());
        assert_eq!(snap.stale_symbols(), vec!["SOLUSDT".to_string()]);
    }

    #[tokio::test]
    async fn test_conditions_from_ticker() {
        let now = Utc::now();
        let gateway = Arc::new(
            StaticMarketDataGateway::new()
                .with_price("BTCUSDT", 97000.0)
                .with_ticker(ticker("BTCUSDT", 300.0, 100.0, 50_000.0)),
        );
        let svc = service(gateway);
        let positions = vec![
            Position::new("BTCUSDT", dec!(95000), now + Duration::days(10), OptionType::Call, 1.0, 97000.0, 0.6),
            Position::new("BTCUSDT", dec!(90000), now + Duration::days(3), OptionType::Put, -1.0, 97000.0, 0.8),
            Position::new("ETHUSDT", dec!(3000), now + Duration::days(1), OptionType::Put, 1.0, 3200.0, 0.9),
        ];
        let snap = svc.snapshot(&["BTCUSDT".to_string()], now).await;
        let c = svc.conditions("BTCUSDT", &snap, &positions).await;

        assert_eq!(c.reference_price, 97000.0);
        assert_eq!(c.regime, VolatilityRegime::Crisis);
        assert!((c.implied_volatility - 0.7).abs() < 1e-12);
        assert!((c.time_to_expiration_days - 3.0).abs() < 1e-6);
        assert!((c.price_velocity + 0.025).abs() < 1e-12);
        assert_eq!(c.volume_ratio, 1.0);
        assert_eq!(c.liquidity, 0.5);
    }

    #[tokio::test]
    async fn test_conditions_without_ticker_use_defaults() {
        let now = Utc::now();
        let svc = service(Arc::new(StaticMarketDataGateway::new()));
        let c = svc
            .conditions("BTCUSDT", &MarketSnapshot::new(now), &[])
            .await;
        assert_eq!(c.reference_price, 0.0);
        assert_eq!(c.regime, VolatilityRegime::NormalVol);
        assert_eq!(c.time_to_expiration_days, 30.0);
        assert_eq!(c.liquidity, 0.8);
    }

    #[test]
    fn test_volume_ratio_running_mean() {
        let svc = service(Arc::new(StaticMarketDataGateway::new()));
        assert_eq!(svc.volume_ratio("BTCUSDT", 100.0), 1.0);
        assert_eq!(svc.volume_ratio("BTCUSDT", 200.0), 2.0);
        // mean is now 0.2 * 200 + 0.8 * 100 = 120
        assert!((svc.volume_ratio("BTCUSDT", 120.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_price_update_and_evict() {
        let svc = service(Arc::new(StaticMarketDataGateway::new()));
        let now = Utc::now();
        svc.apply_price_update("BTCUSDT", 98000.0, now);
        svc.apply_price_update("ETHUSDT", f64::NAN, now);
        assert_eq!(svc.quotes.len(), 1);
        assert_eq!(svc.evict_expired(now + Duration::minutes(10)), 1);
    }

    #[test]
    fn test_evict_with_huge_ttl_keeps_entries() {
        let config = FeedConfig {
            quote_ttl_ms: u64::MAX,
            evict_after_ttls: u32::MAX,
            ..Default::default()
        };
        assert_eq!(config.quote_ttl(), Duration::MAX);

        let svc = MarketDataService::new(Arc::new(StaticMarketDataGateway::new()), config);
        let now = Utc::now();
        svc.apply_price_update("BTCUSDT", 98000.0, now);
        assert_eq!(svc.evict_expired(now + Duration::days(365)), 0);
        assert_eq!(svc.quotes.len(), 1);
    }
}
