//! Forward pass and class selection.

use crate::error::{ClassifierError, ClassifierResult};
use crate::features::{extract_features, FEATURE_COUNT};
use crate::model::ClassifierModel;
use hedge_core::{ClassifierOutcome, ExposureReport, HedgeClass, MarketConditions};
use std::sync::Arc;
use tracing::debug;

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Max-shifted softmax.
fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.iter().map(|v| v / sum).collect()
}

/// Deterministic inference over a shared, read-only model.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    model: Arc<ClassifierModel>,
}

impl RiskClassifier {
    pub fn new(model: ClassifierModel) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    pub fn model_version(&self) -> u32 {
        self.model.version
    }

    /// Class probabilities for a feature vector, summing to 1.
    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> ClassifierResult<[f64; 3]> {
        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::InvalidFeature { index });
        }

        let (output, hidden) = self
            .model
            .layers
            .split_last()
            .ok_or_else(|| ClassifierError::Unavailable("model has no layers".to_string()))?;

        let mut activation = features.to_vec();
        for layer in hidden {
            activation = layer.affine(&activation).into_iter().map(relu).collect();
        }
        let scores: Vec<f64> = output.affine(&activation).into_iter().map(sigmoid).collect();
        let probs = softmax(&scores);

        let mut out = [0.0; 3];
        for (slot, p) in out.iter_mut().zip(probs) {
            *slot = p;
        }
        Ok(out)
    }

    /// Classify a report under market conditions.
    pub fn classify(
        &self,
        report: &ExposureReport,
        conditions: &MarketConditions,
    ) -> ClassifierResult<ClassifierOutcome> {
        let features = extract_features(report, conditions);
        let probabilities = self.predict(&features)?;

        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = i;
            }
        }
        let outcome = ClassifierOutcome {
            recommended: HedgeClass::ALL[best],
            probabilities,
            confidence: probabilities[best],
            model_version: self.model.version,
        };
        debug!(
            recommended = outcome.recommended.as_str(),
            confidence = outcome.confidence,
            "Classifier prediction"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::seeded_model;
    use crate::model::{DenseLayer, LAYER_SIZES};
    use chrono::Utc;
    use hedge_core::{Greeks, RiskLevel};
    use std::collections::BTreeMap;

    fn zero_model(output_biases: [f64; 3]) -> ClassifierModel {
        let layers = LAYER_SIZES
            .windows(2)
            .enumerate()
            .map(|(i, w)| DenseLayer {
                weights: vec![vec![0.0; w[1]]; w[0]],
                biases: if i == 2 {
                    output_biases.to_vec()
                } else {
                    vec![0.0; w[1]]
                },
            })
            .collect();
        ClassifierModel::new(2, layers).unwrap()
    }

    fn report() -> ExposureReport {
        ExposureReport {
            as_of: Utc::now(),
            total_delta: 10.0,
            total_gamma: 2_500_000.0,
            totals: Greeks::ZERO,
            gamma_by_strike: BTreeMap::new(),
            gamma_by_expiration: BTreeMap::new(),
            delta_imbalance: 0.000_004,
            risk_level: RiskLevel::High,
            hedging_urgency: 0.5,
            concentration: 1.0,
            gamma_risk: 5_000_000.0,
            position_count: 1,
            expired_count: 0,
            excluded: Vec::new(),
            stale_symbols: Vec::new(),
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let classifier = RiskClassifier::new(seeded_model(42));
        let inputs = [
            [0.0; 8],
            [15.0, 0.9, 0.8, -0.5, 3.0, 0.1, 1.0, 0.5],
            [1e6, -1e6, 1e3, 1e-9, 0.0, 1.0, 0.2, -4.0],
            [-7.0, 7.0, -7.0, 7.0, -7.0, 7.0, -7.0, 7.0],
        ];
        for features in &inputs {
            let p = classifier.predict(features).unwrap();
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-6);
            assert!(p.iter().all(|v| *v >= 0.0 && *v <= 1.0));
        }
    }

    #[test]
    fn test_deterministic() {
        let classifier = RiskClassifier::new(seeded_model(9));
        let features = [12.0, 0.3, 0.6, 0.1, 1.2, 0.08, 0.5, 0.5];
        assert_eq!(
            classifier.predict(&features).unwrap(),
            classifier.predict(&features).unwrap()
        );
    }

    #[test]
    fn test_rejects_non_finite_features() {
        let classifier = RiskClassifier::new(seeded_model(1));
        let mut features = [0.0; 8];
        features[3] = f64::NAN;
        assert!(matches!(
            classifier.predict(&features),
            Err(ClassifierError::InvalidFeature { index: 3 })
        ));
    }

    #[test]
    fn test_argmax_selects_class() {
        let classifier = RiskClassifier::new(zero_model([-5.0, 0.0, 5.0]));
        let outcome = classifier
            .classify(&report(), &MarketConditions::default())
            .unwrap();
        assert_eq!(outcome.recommended, HedgeClass::AggressiveHedge);
        assert_eq!(outcome.model_version, 2);
        assert_eq!(outcome.confidence, outcome.probabilities[2]);
        assert!(outcome.probabilities[2] > outcome.probabilities[1]);

        let classifier = RiskClassifier::new(zero_model([5.0, -5.0, -5.0]));
        let outcome = classifier
            .classify(&report(), &MarketConditions::default())
            .unwrap();
        assert_eq!(outcome.recommended, HedgeClass::NoHedge);
        assert_eq!(outcome.ratio_adjustment(), 0.0);
    }

    #[test]
    fn test_softmax_stable_for_large_inputs() {
        let p = softmax(&[1000.0, 1000.0, 999.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[0] - p[1]).abs() < 1e-15);
    }
}
