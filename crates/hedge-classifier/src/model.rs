//! Classifier weight artifact.

use crate::error::{ClassifierError, ClassifierResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Network shape: inputs, hidden 1, hidden 2, outputs.
pub const LAYER_SIZES: [usize; 4] = [8, 16, 8, 3];

/// Fully connected layer. `weights[input][neuron]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

impl DenseLayer {
    /// `W^T x + b`
    pub fn affine(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.biases.clone();
        for (x, row) in input.iter().zip(&self.weights) {
            for (acc, w) in out.iter_mut().zip(row) {
                *acc += x * w;
            }
        }
        out
    }

    fn check_shape(&self, index: usize, inputs: usize, outputs: usize) -> ClassifierResult<()> {
        if self.weights.len() != inputs
            || self.weights.iter().any(|row| row.len() != outputs)
            || self.biases.len() != outputs
        {
            return Err(ClassifierError::InvalidShape(format!(
                "layer {index}: expected {inputs}x{outputs} weights and {outputs} biases"
            )));
        }
        let finite = self
            .weights
            .iter()
            .flatten()
            .chain(&self.biases)
            .all(|v| v.is_finite());
        if !finite {
            return Err(ClassifierError::NonFiniteParameter { layer: index });
        }
        Ok(())
    }
}

/// Versioned weights for the 8 -> 16 -> 8 -> 3 network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub version: u32,
    pub layers: Vec<DenseLayer>,
}

impl ClassifierModel {
    /// Build and validate a model.
    pub fn new(version: u32, layers: Vec<DenseLayer>) -> ClassifierResult<Self> {
        let model = Self { version, layers };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json_str(json: &str) -> ClassifierResult<Self> {
        let model: ClassifierModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Load a JSON artifact from disk.
    pub fn load(path: impl AsRef<Path>) -> ClassifierResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let model = Self::from_json_str(&content)?;
        info!(path = %path.display(), version = model.version, "Classifier model loaded");
        Ok(model)
    }

    /// Check layer count, shapes and finiteness.
    pub fn validate(&self) -> ClassifierResult<()> {
        if self.layers.len() != LAYER_SIZES.len() - 1 {
            return Err(ClassifierError::InvalidShape(format!(
                "expected {} layers, got {}",
                LAYER_SIZES.len() - 1,
                self.layers.len()
            )));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            layer.check_shape(i, LAYER_SIZES[i], LAYER_SIZES[i + 1])?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic model with small pseudo-random weights.
    pub(crate) fn seeded_model(seed: u64) -> ClassifierModel {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        };
        let layers = LAYER_SIZES
            .windows(2)
            .map(|w| DenseLayer {
                weights: (0..w[0]).map(|_| (0..w[1]).map(|_| next()).collect()).collect(),
                biases: (0..w[1]).map(|_| next() * 0.1).collect(),
            })
            .collect();
        ClassifierModel::new(1, layers).unwrap()
    }

    #[test]
    fn test_seeded_model_is_valid() {
        assert!(seeded_model(7).validate().is_ok());
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let mut model = seeded_model(1);
        model.layers[1].biases.pop();
        assert!(matches!(
            model.validate(),
            Err(ClassifierError::InvalidShape(_))
        ));

        let mut model = seeded_model(1);
        model.layers.pop();
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut model = seeded_model(1);
        model.layers[2].weights[0][0] = f64::NAN;
        assert!(matches!(
            model.validate(),
            Err(ClassifierError::NonFiniteParameter { layer: 2 })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let model = seeded_model(3);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(ClassifierModel::from_json_str(&json).unwrap(), model);
        assert!(ClassifierModel::from_json_str("{\"version\":1,\"layers\":[]}").is_err());
    }

    #[test]
    fn test_affine() {
        let layer = DenseLayer {
            weights: vec![vec![1.0, 0.0], vec![2.0, -1.0]],
            biases: vec![0.5, 0.0],
        };
        assert_eq!(layer.affine(&[1.0, 3.0]), vec![7.5, -3.0]);
    }
}
