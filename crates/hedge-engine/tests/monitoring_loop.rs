//! Monitoring loop driven as a background task.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use hedge_core::{OptionType, Position};
use hedge_engine::{
    EngineConfig, HedgingEngine, MonitorConfig, MonitoringLoop, PriceUpdate, StaticPositionSource,
};
use hedge_executor::MockExecutionGateway;
use hedge_feed::{FeedConfig, MarketDataService, StaticMarketDataGateway};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

fn calls(strike: Decimal, quantity: f64) -> Vec<Position> {
    vec![Position::new(
        "DOGEUSDT",
        strike,
        Utc::now() + Duration::days(30),
        OptionType::Call,
        quantity,
        0.35,
        0.5,
    )]
}

fn monitor(
    positions: Vec<Position>,
    execution: Arc<MockExecutionGateway>,
    interval_ms: u64,
) -> Arc<MonitoringLoop> {
    let feed = StaticMarketDataGateway::new().with_price("DOGEUSDT", 0.35);
    let market = Arc::new(MarketDataService::new(Arc::new(feed), FeedConfig::default()));
    let mut config = EngineConfig::default();
    config.strategy.timing.inter_order_delay_ms = 0;
    let engine = HedgingEngine::new(config, None, market, execution).unwrap();
    let monitor_config = MonitorConfig {
        interval_ms,
        ..Default::default()
    };
    Arc::new(
        MonitoringLoop::new(
            Arc::new(engine),
            Arc::new(StaticPositionSource::new(positions)),
            monitor_config,
        )
        .unwrap(),
    )
}

async fn wait_for_orders(execution: &MockExecutionGateway) {
    for _ in 0..100 {
        if execution.order_count() > 0 {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_scheduled_ticks_hedge_until_cancelled() {
    let execution = Arc::new(MockExecutionGateway::new());
    let m = monitor(calls(dec!(0.35), 1_000_000.0), execution.clone(), 50);
    let (_tx, rx) = m.price_channel();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn({
        let m = m.clone();
        let cancel = cancel.clone();
        async move { m.run(rx, cancel).await }
    });

    wait_for_orders(&execution).await;
    cancel.cancel();
    tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert!(execution.order_count() > 0);
    assert!(m.stats().snapshot().total_hedges >= 1);
}

#[tokio::test]
async fn test_price_update_between_ticks_runs_emergency_cycle() {
    let execution = Arc::new(MockExecutionGateway::new());
    let m = monitor(calls(dec!(0.50), 1_000_000.0), execution.clone(), 60_000);
    let (tx, rx) = m.price_channel();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn({
        let m = m.clone();
        let cancel = cancel.clone();
        async move { m.run(rx, cancel).await }
    });

    // The first tick fires immediately and finds nothing to hedge.
    tokio::time::sleep(StdDuration::from_millis(100)).await;
    assert_eq!(execution.order_count(), 0);
    assert!(!m.is_latched("DOGEUSDT"));

    tx.send(PriceUpdate::new("DOGEUSDT", 0.50)).await.unwrap();
    wait_for_orders(&execution).await;
    cancel.cancel();
    tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert!(execution.order_count() > 0);
    assert!(m.is_latched("DOGEUSDT"));
    assert_eq!(m.stats().snapshot().total_hedges, 1);
}
