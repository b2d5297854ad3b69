//! Hedge urgency classifier.
//!
//! A fixed-shape 8 -> 16 -> 8 -> 3 feed-forward network scoring exposure
//! and market features into {NO_HEDGE, CONSERVATIVE_HEDGE, AGGRESSIVE_HEDGE}.
//! Weights come from a versioned JSON artifact and are never mutated.

pub mod classifier;
pub mod error;
pub mod features;
pub mod model;

pub use classifier::RiskClassifier;
pub use error::{ClassifierError, ClassifierResult};
pub use features::{extract_features, FEATURE_COUNT};
pub use model::{ClassifierModel, DenseLayer, LAYER_SIZES};
