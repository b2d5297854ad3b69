//! Paper execution gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hedge_core::{OrderFill, OrderRequest, OrderSide, OrderType};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{OrderError, OrderResult};
use crate::gateway::{BoxFuture, ExecutionGateway};
use crate::price_provider::PriceProvider;

/// Simulated fill parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Market orders fill this fraction away from the reference. Default: 0.001.
    #[serde(default = "default_slippage")]
    pub slippage: f64,
    /// Commission as a fraction of notional. Default: 0.0005.
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
}

fn default_slippage() -> f64 {
    0.001
}

fn default_commission_rate() -> f64 {
    0.0005
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            slippage: default_slippage(),
            commission_rate: default_commission_rate(),
        }
    }
}

/// Fills every order immediately at the reference price.
///
/// Market orders pay slippage against the taker; limit orders fill at
/// the reference. Cost is the commission on filled notional.
pub struct PaperExecutionGateway {
    prices: Arc<dyn PriceProvider>,
    slippage: Decimal,
    commission_rate: Decimal,
    offline: AtomicBool,
}

impl PaperExecutionGateway {
    pub fn new(prices: Arc<dyn PriceProvider>, config: &PaperConfig) -> Self {
        Self {
            prices,
            slippage: Decimal::from_f64(config.slippage).unwrap_or(Decimal::ZERO),
            commission_rate: Decimal::from_f64(config.commission_rate).unwrap_or(Decimal::ZERO),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: every order fails with `GatewayUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn fill(&self, order: &OrderRequest) -> OrderResult<OrderFill> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(OrderError::GatewayUnavailable(
                "paper gateway offline".to_string(),
            ));
        }
        let quantity = Decimal::from_f64(order.quantity)
            .filter(|q| *q > Decimal::ZERO)
            .ok_or_else(|| {
                OrderError::InvalidOrder(format!("quantity {} not positive", order.quantity))
            })?;
        let reference = self.prices.reference_price(&order.symbol).ok_or_else(|| {
            OrderError::Rejected(format!("no reference price for {}", order.symbol))
        })?;

        let fill_price = match (order.order_type, order.side) {
            (OrderType::Limit, _) => reference,
            (OrderType::Market, OrderSide::Buy) => reference * (Decimal::ONE + self.slippage),
            (OrderType::Market, OrderSide::Sell) => reference * (Decimal::ONE - self.slippage),
        };
        let cost = (quantity * fill_price * self.commission_rate).round_dp(8);

        Ok(OrderFill {
            order_id: Uuid::new_v4().to_string(),
            fill_price: fill_price.round_dp(8),
            cost,
        })
    }
}

impl ExecutionGateway for PaperExecutionGateway {
    fn place_order(&self, order: OrderRequest) -> BoxFuture<'_, OrderResult<OrderFill>> {
        Box::pin(async move {
            let result = self.fill(&order);
            debug!(
                client_order_id = %order.client_order_id,
                symbol = %order.symbol,
                side = %order.side,
                quantity = order.quantity,
                ok = result.is_ok(),
                "Paper order"
            );
            result
        })
    }
}
