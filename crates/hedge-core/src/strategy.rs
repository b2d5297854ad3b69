//! Hedging strategy types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::execution::OrderSide;

/// Hedge action, ordered by intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HedgeAction {
    NoHedgeNeeded,
    ConservativeHedge,
    StandardHedge,
    AggressiveHedge,
    EmergencyHedge,
}

impl HedgeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoHedgeNeeded => "NO_HEDGE_NEEDED",
            Self::ConservativeHedge => "CONSERVATIVE_HEDGE",
            Self::StandardHedge => "STANDARD_HEDGE",
            Self::AggressiveHedge => "AGGRESSIVE_HEDGE",
            Self::EmergencyHedge => "EMERGENCY_HEDGE",
        }
    }

    /// AGGRESSIVE_HEDGE or EMERGENCY_HEDGE.
    pub fn is_aggressive(&self) -> bool {
        matches!(self, Self::AggressiveHedge | Self::EmergencyHedge)
    }
}

impl fmt::Display for HedgeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HedgeClass {
    NoHedge,
    ConservativeHedge,
    AggressiveHedge,
}

impl HedgeClass {
    /// Classes in output-vector order.
    pub const ALL: [HedgeClass; 3] = [
        HedgeClass::NoHedge,
        HedgeClass::ConservativeHedge,
        HedgeClass::AggressiveHedge,
    ];

    /// Multiplier applied to the rule-based hedge ratio.
    pub fn ratio_adjustment(&self) -> f64 {
        match self {
            Self::NoHedge => 0.0,
            Self::ConservativeHedge => 0.8,
            Self::AggressiveHedge => 1.2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoHedge => "NO_HEDGE",
            Self::ConservativeHedge => "CONSERVATIVE_HEDGE",
            Self::AggressiveHedge => "AGGRESSIVE_HEDGE",
        }
    }
}

/// Classifier refinement attached to a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutcome {
    pub recommended: HedgeClass,
    pub probabilities: [f64; 3],
    /// Highest class probability.
    pub confidence: f64,
    pub model_version: u32,
}

impl ClassifierOutcome {
    pub fn ratio_adjustment(&self) -> f64 {
        self.recommended.ratio_adjustment()
    }
}

/// Hedge instrument type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentKind {
    Futures,
    Option,
    VolProduct,
}

impl InstrumentKind {
    /// Execution priority: 1 = delta, 2 = gamma, 3 = vol.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Futures => 1,
            Self::Option => 2,
            Self::VolProduct => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Futures => "FUTURES",
            Self::Option => "OPTION",
            Self::VolProduct => "VOL_PRODUCT",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an instrument is meant to neutralize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HedgePurpose {
    DeltaHedge,
    GammaHedge,
    VolatilityHedge,
}

/// One leg of a hedge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub kind: InstrumentKind,
    pub symbol: String,
    /// Signed full-offset quantity. The executor scales it by the hedge ratio.
    pub quantity: f64,
    pub purpose: HedgePurpose,
    pub priority: u8,
    /// Modeled delta contributed per unit.
    pub delta_per_unit: f64,
    /// Modeled gamma contributed per unit.
    pub gamma_per_unit: f64,
}

impl Instrument {
    pub fn new(
        kind: InstrumentKind,
        symbol: impl Into<String>,
        quantity: f64,
        purpose: HedgePurpose,
    ) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
            quantity,
            purpose,
            priority: kind.priority(),
            delta_per_unit: 0.0,
            gamma_per_unit: 0.0,
        }
    }

    #[must_use]
    pub fn with_unit_exposure(mut self, delta: f64, gamma: f64) -> Self {
        self.delta_per_unit = delta;
        self.gamma_per_unit = gamma;
        self
    }

    pub fn side(&self) -> OrderSide {
        if self.quantity >= 0.0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }
}

/// Order type for hedge orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
        }
    }
}

/// When and how to send the hedge orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub execute_at: DateTime<Utc>,
    pub order_type: OrderType,
    pub slices: u32,
    pub inter_order_delay_ms: u64,
}

/// A complete hedge decision for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgingStrategy {
    pub underlying: String,
    pub action: HedgeAction,
    /// Clamped to [0, 1.5].
    pub hedge_ratio: f64,
    /// Sorted by priority.
    pub instruments: Vec<Instrument>,
    pub plan: ExecutionPlan,
    /// Expected cost as a fraction of notional.
    pub expected_cost: f64,
    /// Classifier confidence; 0 when the classifier was unavailable.
    pub confidence: f64,
    pub classifier: Option<ClassifierOutcome>,
    pub exposure_delta: f64,
    pub exposure_gamma: f64,
    pub risk_reduction: f64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl HedgingStrategy {
    /// Whether there is anything to send to the execution gateway.
    pub fn requires_execution(&self) -> bool {
        self.action != HedgeAction::NoHedgeNeeded && !self.instruments.is_empty()
    }
}
