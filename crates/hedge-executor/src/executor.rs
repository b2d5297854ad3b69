//! Hedge executor.
//!
//! Instruments are sent one at a time in priority order with a fixed
//! delay between them. When a leg fails, or the stop signal fires between
//! legs, the already-filled legs are reversed newest first with
//! reduce-only market orders and the result is flagged `executed = false`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hedge_core::{
    ClientOrderId, ExecutionResult, HedgePurpose, HedgingStrategy, Instrument,
    InstrumentExecution, OrderRequest, OrderSide, OrderType, RollbackRecord,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ExecutorError;
use crate::gateway::ExecutionGateway;

// ============================================================================
// ExecutorConfig
// ============================================================================

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Wait until the plan's `execute_at` before the first order.
    /// Off by default: the scheduled delay outlasts a monitoring tick.
    #[serde(default)]
    pub honor_schedule: bool,
    /// Scaled sizes below this are skipped. Default: 1e-9.
    #[serde(default = "default_min_order_quantity")]
    pub min_order_quantity: f64,
}

fn default_min_order_quantity() -> f64 {
    1e-9
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            honor_schedule: false,
            min_order_quantity: default_min_order_quantity(),
        }
    }
}

// ============================================================================
// HedgeExecutor
// ============================================================================

/// Sequences a strategy's orders against the execution gateway.
pub struct HedgeExecutor {
    gateway: Arc<dyn ExecutionGateway>,
    config: ExecutorConfig,
}

enum Stop {
    Failed {
        symbol: String,
        error: ExecutorError,
    },
    Cancelled,
}

impl HedgeExecutor {
    pub fn new(gateway: Arc<dyn ExecutionGateway>, config: ExecutorConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute every instrument of `strategy`.
    ///
    /// Never returns an error: failures, cancellation and rollback
    /// outcomes are all described by the returned `ExecutionResult`.
    pub async fn execute(
        &self,
        strategy: &HedgingStrategy,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let started_at = Utc::now();
        if !strategy.requires_execution() {
            return ExecutionResult::nothing_to_do(
                strategy.action,
                strategy.exposure_delta,
                strategy.exposure_gamma,
                started_at,
            );
        }

        let mut ordered: Vec<&Instrument> = strategy.instruments.iter().collect();
        ordered.sort_by_key(|i| i.priority);

        let delay = Duration::from_millis(strategy.plan.inter_order_delay_ms);
        let mut filled: Vec<InstrumentExecution> = Vec::new();
        let mut skipped: Vec<String> = Vec::new();
        let mut stop: Option<Stop> = None;

        if self.config.honor_schedule && !self.wait_until_scheduled(strategy, cancel).await {
            stop = Some(Stop::Cancelled);
        }

        if stop.is_none() {
            for instrument in ordered {
                if cancel.is_cancelled() {
                    stop = Some(Stop::Cancelled);
                    break;
                }
                if !filled.is_empty() && !delay.is_zero() {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            stop = Some(Stop::Cancelled);
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }

                let Some(request) = self.order_for(instrument, strategy) else {
                    debug!(symbol = %instrument.symbol, "Skipping zero-size leg");
                    skipped.push(instrument.symbol.clone());
                    continue;
                };

                match self.gateway.place_order(request.clone()).await {
                    Ok(fill) => {
                        info!(
                            symbol = %request.symbol,
                            side = %request.side,
                            quantity = request.quantity,
                            order_id = %fill.order_id,
                            fill_price = %fill.fill_price,
                            "Hedge leg filled"
                        );
                        filled.push(InstrumentExecution {
                            instrument: instrument.clone(),
                            request,
                            fill,
                        });
                    }
                    Err(e) => {
                        warn!(
                            symbol = %request.symbol,
                            error = %e,
                            completed = filled.len(),
                            "Hedge leg failed, stopping execution"
                        );
                        stop = Some(Stop::Failed {
                            symbol: request.symbol.clone(),
                            error: ExecutorError::PartialExecution {
                                symbol: request.symbol,
                                completed: filled.len(),
                                source: e,
                            },
                        });
                        break;
                    }
                }
            }
        }

        let mut result = ExecutionResult::nothing_to_do(
            strategy.action,
            strategy.exposure_delta,
            strategy.exposure_gamma,
            started_at,
        );
        result.skipped = skipped;

        let remaining: Vec<&InstrumentExecution> = match stop {
            None => {
                result.fills = filled;
                result.fills.iter().collect()
            }
            Some(stop) => {
                result.executed = false;
                match stop {
                    Stop::Failed { symbol, error } => {
                        result.failed_symbol = Some(symbol);
                        result.error = Some(error.to_string());
                    }
                    Stop::Cancelled => {
                        info!(completed = filled.len(), "Hedge execution cancelled");
                        result.cancelled = true;
                        result.error = Some(
                            ExecutorError::Cancelled {
                                completed: filled.len(),
                            }
                            .to_string(),
                        );
                    }
                }
                result.rollbacks = self.rollback(&filled).await;
                result.partial_results = filled;
                // Rollbacks run newest first; a leg still counts when its
                // reversal failed.
                result
                    .partial_results
                    .iter()
                    .rev()
                    .zip(result.rollbacks.iter())
                    .filter(|(_, r)| !r.succeeded())
                    .map(|(e, _)| e)
                    .collect()
            }
        };

        let (new_delta, new_gamma) = remaining.iter().fold(
            (strategy.exposure_delta, strategy.exposure_gamma),
            |(d, g), e| {
                let q = e.request.signed_quantity();
                (
                    d + q * e.instrument.delta_per_unit,
                    g + q * e.instrument.gamma_per_unit,
                )
            },
        );
        let effectiveness = hedge_effectiveness(strategy, new_delta, new_gamma);

        let fill_cost: Decimal = result
            .fills
            .iter()
            .chain(result.partial_results.iter())
            .map(|e| e.fill.cost)
            .sum();
        let rollback_cost: Decimal = result.rollbacks.iter().map(|r| r.cost).sum();

        result.total_cost = fill_cost + rollback_cost;
        result.new_delta = new_delta;
        result.new_gamma = new_gamma;
        result.hedge_effectiveness = effectiveness;
        result.finished_at = Utc::now();

        if result.executed {
            info!(
                action = strategy.action.as_str(),
                legs = result.fills.len(),
                new_delta,
                new_gamma,
                effectiveness,
                total_cost = %result.total_cost,
                "Hedge executed"
            );
        } else if !result.rollback_complete() {
            error!(
                failed_symbol = ?result.failed_symbol,
                rollbacks = result.rollbacks.len(),
                "Rollback incomplete, book is partially hedged"
            );
        }
        result
    }

    /// Scaled order for one instrument, `None` when the size rounds to zero.
    fn order_for(&self, instrument: &Instrument, strategy: &HedgingStrategy) -> Option<OrderRequest> {
        let quantity = instrument.quantity * strategy.hedge_ratio;
        if !quantity.is_finite() || quantity.abs() < self.config.min_order_quantity {
            return None;
        }
        let side = if quantity >= 0.0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        Some(OrderRequest {
            client_order_id: ClientOrderId::new(),
            symbol: instrument.symbol.clone(),
            kind: instrument.kind,
            side,
            quantity: quantity.abs(),
            order_type: strategy.plan.order_type,
            reduce_only: false,
        })
    }

    /// Reverse filled legs newest first. Best effort: every leg is tried.
    async fn rollback(&self, filled: &[InstrumentExecution]) -> Vec<RollbackRecord> {
        let mut records = Vec::with_capacity(filled.len());
        for execution in filled.iter().rev() {
            let request = OrderRequest {
                client_order_id: ClientOrderId::new(),
                symbol: execution.request.symbol.clone(),
                kind: execution.request.kind,
                side: execution.request.side.opposite(),
                quantity: execution.request.quantity,
                order_type: OrderType::Market,
                reduce_only: true,
            };
            let side = request.side;
            let quantity = request.quantity;
            let symbol = request.symbol.clone();

            let record = match self.gateway.place_order(request).await {
                Ok(fill) => {
                    info!(symbol = %symbol, side = %side, quantity, "Rolled back hedge leg");
                    RollbackRecord {
                        symbol,
                        side,
                        quantity,
                        order_id: Some(fill.order_id),
                        cost: fill.cost,
                        error: None,
                    }
                }
                Err(e) => {
                    error!(symbol = %symbol, error = %e, "Rollback failed");
                    RollbackRecord {
                        symbol,
                        side,
                        quantity,
                        order_id: None,
                        cost: Decimal::ZERO,
                        error: Some(e.to_string()),
                    }
                }
            };
            records.push(record);
        }
        records
    }

    /// Returns false when cancelled while waiting.
    async fn wait_until_scheduled(
        &self,
        strategy: &HedgingStrategy,
        cancel: &CancellationToken,
    ) -> bool {
        let wait = (strategy.plan.execute_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if wait.is_zero() {
            return !cancel.is_cancelled();
        }
        debug!(wait_ms = wait.as_millis() as u64, "Waiting for scheduled execution");
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }
}

/// Fraction of the targeted exposure neutralized, in [0, 1].
///
/// Only the dimensions the strategy hedges count: delta when it carries a
/// delta leg, gamma when it carries a gamma leg.
pub fn hedge_effectiveness(strategy: &HedgingStrategy, new_delta: f64, new_gamma: f64) -> f64 {
    let targets = |purpose: HedgePurpose| strategy.instruments.iter().any(|i| i.purpose == purpose);

    let mut parts = Vec::with_capacity(2);
    if targets(HedgePurpose::DeltaHedge) && strategy.exposure_delta.abs() > f64::EPSILON {
        parts.push(1.0 - new_delta.abs() / strategy.exposure_delta.abs());
    }
    if targets(HedgePurpose::GammaHedge) && strategy.exposure_gamma.abs() > f64::EPSILON {
        parts.push(1.0 - new_gamma.abs() / strategy.exposure_gamma.abs());
    }
    if parts.is_empty() {
        return 0.0;
    }
    let mean = parts.iter().sum::<f64>() / parts.len() as f64;
    if mean.is_finite() {
        mean.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
