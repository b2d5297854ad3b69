//! Full-cycle scenarios against scripted gateways.

use std::sync::Arc;

use chrono::{Duration, Utc};
use hedge_classifier::{ClassifierModel, DenseLayer, RiskClassifier, LAYER_SIZES};
use hedge_core::{
    HedgeAction, HedgeClass, InstrumentKind, MarketConditions, MarketSnapshot, OptionType,
    OrderSide, Position, RiskLevel, UnderlyingQuote, VolatilityRegime,
};
use hedge_engine::{CycleStage, EngineConfig, HedgingEngine};
use hedge_executor::{MockExecutionGateway, OrderError};
use hedge_feed::{FeedConfig, MarketDataService, StaticMarketDataGateway};
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

const SPOT: f64 = 0.35;

/// Long call + long put at the money: tiny delta, large gamma per unit.
fn straddle(quantity: f64) -> Vec<Position> {
    let expiry = Utc::now() + Duration::days(30);
    [OptionType::Call, OptionType::Put]
        .into_iter()
        .map(|t| Position::new("DOGEUSDT", dec!(0.35), expiry, t, quantity, SPOT, 0.5))
        .collect()
}

fn snapshot() -> MarketSnapshot {
    MarketSnapshot::new(Utc::now()).with_quote("DOGEUSDT", UnderlyingQuote::fresh(SPOT, Utc::now()))
}

/// Zero weights with output biases favoring one class.
fn biased_model(favored: usize) -> ClassifierModel {
    let layers = LAYER_SIZES
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let mut biases = vec![0.0; w[1]];
            if i == LAYER_SIZES.len() - 2 {
                biases[favored] = 5.0;
            }
            DenseLayer {
                weights: vec![vec![0.0; w[1]]; w[0]],
                biases,
            }
        })
        .collect();
    ClassifierModel::new(7, layers).unwrap()
}

fn engine(
    execution: Arc<MockExecutionGateway>,
    classifier: Option<RiskClassifier>,
) -> HedgingEngine {
    let feed = StaticMarketDataGateway::new().with_price("DOGEUSDT", SPOT);
    let market = Arc::new(MarketDataService::new(Arc::new(feed), FeedConfig::default()));
    HedgingEngine::new(EngineConfig::default(), classifier, market, execution).unwrap()
}

#[test]
fn test_minimal_exposure_needs_no_hedge() {
    let engine = engine(Arc::new(MockExecutionGateway::new()), None);
    let report = engine
        .analyze_exposure(&straddle(5_000.0), &snapshot())
        .unwrap();

    assert!(report.total_gamma > 0.0 && report.total_gamma < 500_000.0);
    assert!(report.delta_imbalance < 0.1);
    assert_eq!(report.risk_level, RiskLevel::Minimal);

    let strategy =
        engine.generate_strategy(&report, &MarketConditions::for_underlying("DOGEUSDT", SPOT));
    assert_eq!(strategy.action, HedgeAction::NoHedgeNeeded);
    assert_eq!(strategy.hedge_ratio, 0.0);
    assert!(strategy.instruments.is_empty());
}

#[test]
fn test_extreme_gamma_emergency_with_clamped_ratio() {
    let classifier = RiskClassifier::new(biased_model(2));
    let engine = engine(Arc::new(MockExecutionGateway::new()), Some(classifier));
    let report = engine
        .analyze_exposure(&straddle(1_000_000.0), &snapshot())
        .unwrap();
    assert!(report.total_gamma >= 5_000_000.0);
    assert_eq!(report.risk_level, RiskLevel::Extreme);
    assert!(engine.emergency_breach(&report).is_some());

    let conditions = MarketConditions::for_underlying("DOGEUSDT", SPOT)
        .with_regime(VolatilityRegime::LowVol);
    let strategy = engine.generate_strategy(&report, &conditions);

    assert_eq!(strategy.action, HedgeAction::EmergencyHedge);
    let outcome = strategy.classifier.unwrap();
    assert_eq!(outcome.recommended, HedgeClass::AggressiveHedge);
    assert_eq!(outcome.model_version, 7);
    assert!(strategy.confidence > 0.33);
    assert!(strategy.hedge_ratio > 1.0);
    assert!(strategy.hedge_ratio <= 1.5);
}

#[test]
fn test_no_hedge_class_zeroes_ratio_but_keeps_action() {
    let classifier = RiskClassifier::new(biased_model(0));
    let engine = engine(Arc::new(MockExecutionGateway::new()), Some(classifier));
    let report = engine
        .analyze_exposure(&straddle(1_000_000.0), &snapshot())
        .unwrap();

    let strategy =
        engine.generate_strategy(&report, &MarketConditions::for_underlying("DOGEUSDT", SPOT));
    assert_eq!(strategy.action, HedgeAction::EmergencyHedge);
    assert_eq!(strategy.hedge_ratio, 0.0);
}

#[tokio::test]
async fn test_gateway_failure_on_second_of_three_rolls_back() {
    let execution = Arc::new(MockExecutionGateway::new());
    execution.push_fill();
    execution.push_error(OrderError::GatewayUnavailable("connection reset".to_string()));
    execution.push_fill();
    let engine = engine(execution.clone(), None);

    let report = engine
        .analyze_exposure(&straddle(1_000_000.0), &snapshot())
        .unwrap();
    let conditions = MarketConditions::for_underlying("DOGEUSDT", SPOT)
        .with_regime(VolatilityRegime::Crisis);
    let strategy = engine.generate_strategy(&report, &conditions);
    let kinds: Vec<InstrumentKind> = strategy.instruments.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            InstrumentKind::Futures,
            InstrumentKind::Option,
            InstrumentKind::VolProduct
        ]
    );

    let result = engine
        .execute_strategy(&strategy, &CancellationToken::new())
        .await;

    assert!(!result.executed);
    assert_eq!(result.partial_results.len(), 1);
    assert_eq!(result.partial_results[0].instrument.kind, InstrumentKind::Futures);
    assert!(result
        .failed_symbol
        .as_deref()
        .unwrap()
        .starts_with("DOGEUSDT-"));
    assert_eq!(result.rollbacks.len(), 1);
    assert!(result.rollback_complete());

    let orders = execution.orders();
    assert_eq!(orders.len(), 3);
    assert_eq!(orders[2].symbol, orders[0].symbol);
    assert_eq!(orders[2].side, orders[0].side.opposite());
    assert!(orders[2].reduce_only);
    assert_eq!(orders[0].side, OrderSide::Sell);
}

#[tokio::test]
async fn test_run_cycle_reports_execute_stage_failure() {
    let execution = Arc::new(MockExecutionGateway::new());
    execution.push_error(OrderError::Rejected("insufficient margin".to_string()));
    let engine = engine(execution, None);

    let outcome = engine
        .run_cycle(
            &straddle(1_000_000.0),
            &snapshot(),
            &MarketConditions::for_underlying("DOGEUSDT", SPOT),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.failed_stage, Some(CycleStage::Execute));
    assert!(outcome.report.is_some());
    assert!(outcome.strategy.is_some());
    let execution = outcome.execution.unwrap();
    assert!(!execution.executed);
    assert!(execution.partial_results.is_empty());
    assert!(execution.rollbacks.is_empty());
}

#[test]
fn test_expired_and_invalid_positions_are_isolated() {
    let engine = engine(Arc::new(MockExecutionGateway::new()), None);
    let mut positions = straddle(5_000.0);
    positions.push(Position::new(
        "DOGEUSDT",
        dec!(0.30),
        Utc::now() - Duration::days(1),
        OptionType::Call,
        100.0,
        SPOT,
        0.5,
    ));
    positions.push(Position::new(
        "DOGEUSDT",
        dec!(0.40),
        Utc::now() + Duration::days(10),
        OptionType::Put,
        100.0,
        SPOT,
        0.0,
    ));

    let report = engine.analyze_exposure(&positions, &snapshot()).unwrap();
    assert_eq!(report.expired_count, 1);
    assert_eq!(report.excluded.len(), 1);
    assert_eq!(report.excluded[0].index, 3);
    assert!(report.has_gaps());
    let by_strike: f64 = report.gamma_by_strike.values().sum();
    assert!((by_strike - report.total_gamma).abs() < 1e-6 * report.total_gamma.abs());
}
