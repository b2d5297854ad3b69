//! Feature extraction.

use hedge_core::{ExposureReport, MarketConditions};

pub const FEATURE_COUNT: usize = 8;

const DEFAULT_IMPLIED_VOL: f64 = 0.5;
const DEFAULT_VOLUME_RATIO: f64 = 1.0;
const DEFAULT_TIME_TO_EXPIRY_DAYS: f64 = 30.0;
const DEFAULT_CORRELATION: f64 = 0.5;

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

/// Build the bounded feature vector, in fixed order:
/// log gamma, tanh imbalance, IV, tanh velocity, volume ratio,
/// normalized time to expiry, regime code, correlation.
pub fn extract_features(
    report: &ExposureReport,
    conditions: &MarketConditions,
) -> [f64; FEATURE_COUNT] {
    let tte_days = finite_or(conditions.time_to_expiration_days, DEFAULT_TIME_TO_EXPIRY_DAYS);
    [
        (finite_or(report.total_gamma, 0.0).abs() + 1.0).ln(),
        finite_or(report.delta_imbalance, 0.0).tanh(),
        finite_or(conditions.implied_volatility, DEFAULT_IMPLIED_VOL),
        finite_or(conditions.price_velocity, 0.0).tanh(),
        finite_or(conditions.volume_ratio, DEFAULT_VOLUME_RATIO),
        (tte_days / 365.0).min(1.0),
        conditions.regime.encode(),
        finite_or(conditions.correlation_strength, DEFAULT_CORRELATION),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hedge_core::{Greeks, RiskLevel, VolatilityRegime};
    use std::collections::BTreeMap;

    fn report(gamma: f64, imbalance: f64) -> ExposureReport {
        ExposureReport {
            as_of: Utc::now(),
            total_delta: 0.0,
            total_gamma: gamma,
            totals: Greeks::ZERO,
            gamma_by_strike: BTreeMap::new(),
            gamma_by_expiration: BTreeMap::new(),
            delta_imbalance: imbalance,
            risk_level: RiskLevel::Minimal,
            hedging_urgency: 0.0,
            concentration: 1.0,
            gamma_risk: 0.0,
            position_count: 0,
            expired_count: 0,
            excluded: Vec::new(),
            stale_symbols: Vec::new(),
        }
    }

    #[test]
    fn test_feature_order_and_transforms() {
        let conditions = MarketConditions {
            implied_volatility: 0.7,
            price_velocity: 0.0,
            volume_ratio: 1.5,
            time_to_expiration_days: 730.0,
            correlation_strength: 0.3,
            regime: VolatilityRegime::Crisis,
            ..MarketConditions::default()
        };
        let f = extract_features(&report(-1000.0, 0.0), &conditions);
        assert!((f[0] - 1001.0f64.ln()).abs() < 1e-12);
        assert_eq!(f[1], 0.0);
        assert_eq!(f[2], 0.7);
        assert_eq!(f[3], 0.0);
        assert_eq!(f[4], 1.5);
        assert_eq!(f[5], 1.0);
        assert_eq!(f[6], 1.0);
        assert_eq!(f[7], 0.3);
    }

    #[test]
    fn test_non_finite_inputs_use_defaults() {
        let conditions = MarketConditions {
            implied_volatility: f64::NAN,
            volume_ratio: f64::INFINITY,
            time_to_expiration_days: f64::NAN,
            correlation_strength: f64::NAN,
            ..MarketConditions::default()
        };
        let f = extract_features(&report(f64::NAN, f64::NAN), &conditions);
        assert!(f.iter().all(|v| v.is_finite()));
        assert_eq!(f[2], 0.5);
        assert_eq!(f[4], 1.0);
        assert!((f[5] - 30.0 / 365.0).abs() < 1e-12);
        assert_eq!(f[7], 0.5);
    }
}
