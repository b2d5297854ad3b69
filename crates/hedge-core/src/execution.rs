//! Order and execution result types.

use crate::strategy::{HedgeAction, Instrument, InstrumentKind, OrderType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1.0 for buy, -1.0 for sell.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Client order ID.
///
/// Format: `hedge_{timestamp_ms}_{uuid_short}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("hedge_{ts}_{uuid_short}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order sent to the execution gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: ClientOrderId,
    pub symbol: String,
    pub kind: InstrumentKind,
    pub side: OrderSide,
    /// Unsigned size.
    pub quantity: f64,
    pub order_type: OrderType,
    pub reduce_only: bool,
}

impl OrderRequest {
    /// Signed size: positive for buys.
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }
}

/// Gateway acknowledgement of a filled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFill {
    pub order_id: String,
    pub fill_price: Decimal,
    /// Fees and slippage paid, in quote currency.
    pub cost: Decimal,
}

/// One filled hedge leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentExecution {
    pub instrument: Instrument,
    pub request: OrderRequest,
    pub fill: OrderFill,
}

/// Outcome of reversing one filled leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackRecord {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub order_id: Option<String>,
    /// Zero when the reversal failed.
    pub cost: Decimal,
    pub error: Option<String>,
}

impl RollbackRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Structured result of executing one strategy.
///
/// On success `fills` holds every leg. On failure or cancellation
/// `executed` is false, `partial_results` holds the legs filled before
/// the stop and `rollbacks` records the reversal attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub action: HedgeAction,
    pub executed: bool,
    pub fills: Vec<InstrumentExecution>,
    pub partial_results: Vec<InstrumentExecution>,
    /// Symbols skipped because the scaled size was zero.
    pub skipped: Vec<String>,
    pub failed_symbol: Option<String>,
    pub error: Option<String>,
    pub cancelled: bool,
    pub rollbacks: Vec<RollbackRecord>,
    pub total_cost: Decimal,
    /// Modeled portfolio delta after the hedge.
    pub new_delta: f64,
    /// Modeled portfolio gamma after the hedge.
    pub new_gamma: f64,
    /// Fraction of |gamma| and |delta| neutralized, in [0, 1].
    pub hedge_effectiveness: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Result for a strategy with nothing to execute.
    pub fn nothing_to_do(action: HedgeAction, delta: f64, gamma: f64, at: DateTime<Utc>) -> Self {
        Self {
            action,
            executed: true,
            fills: Vec::new(),
            partial_results: Vec::new(),
            skipped: Vec::new(),
            failed_symbol: None,
            error: None,
            cancelled: false,
            rollbacks: Vec::new(),
            total_cost: Decimal::ZERO,
            new_delta: delta,
            new_gamma: gamma,
            hedge_effectiveness: 0.0,
            started_at: at,
            finished_at: at,
        }
    }

    /// Whether every attempted rollback order went through.
    pub fn rollback_complete(&self) -> bool {
        self.rollbacks.iter().all(RollbackRecord::succeeded)
    }
}
