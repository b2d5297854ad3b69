//! Execution gateway trait.
//!
//! The engine never talks to an exchange directly; every order goes
//! through an injected `ExecutionGateway`.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hedge_core::{OrderFill, OrderRequest};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::error::{OrderError, OrderResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Places one hedge order and reports its fill.
pub trait ExecutionGateway: Send + Sync {
    fn place_order(&self, order: OrderRequest) -> BoxFuture<'_, OrderResult<OrderFill>>;
}

/// Arc wrapper for ExecutionGateway trait objects.
pub type DynExecutionGateway = Arc<dyn ExecutionGateway>;

/// Scripted gateway for tests.
///
/// Returns queued results in order; once the queue is empty every order
/// fills at the default price with zero cost.
#[derive(Debug)]
pub struct MockExecutionGateway {
    /// Recorded orders for verification.
    orders: Mutex<Vec<OrderRequest>>,
    script: Mutex<VecDeque<OrderResult<OrderFill>>>,
    default_price: Decimal,
    next_id: AtomicU64,
}

impl Default for MockExecutionGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutionGateway {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            default_price: Decimal::ONE_HUNDRED,
            next_id: AtomicU64::new(1),
        }
    }

    /// Queue the result of the next unscripted order.
    pub fn push_result(&self, result: OrderResult<OrderFill>) {
        self.script.lock().push_back(result);
    }

    /// Queue a default fill.
    pub fn push_fill(&self) {
        let fill = self.default_fill();
        self.script.lock().push_back(Ok(fill));
    }

    pub fn push_error(&self, error: OrderError) {
        self.script.lock().push_back(Err(error));
    }

    /// Get recorded orders.
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().clone()
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().len()
    }

    fn default_fill(&self) -> OrderFill {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        OrderFill {
            order_id: format!("mock-{id}"),
            fill_price: self.default_price,
            cost: Decimal::ZERO,
        }
    }
}

impl ExecutionGateway for MockExecutionGateway {
    fn place_order(&self, order: OrderRequest) -> BoxFuture<'_, OrderResult<OrderFill>> {
        Box::pin(async move {
            self.orders.lock().push(order);
            let scripted = self.script.lock().pop_front();
            scripted.unwrap_or_else(|| Ok(self.default_fill()))
        })
    }
}
