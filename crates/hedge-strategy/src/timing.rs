//! Execution timing, order type and slicing.

use chrono::{DateTime, Duration, Utc};
use hedge_core::{ExecutionPlan, OrderType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay before execution at low urgency (ms). Default: 60,000.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Delay between instrument orders (ms). Default: 1,000.
    #[serde(default = "default_inter_order_delay_ms")]
    pub inter_order_delay_ms: u64,
    /// Default: 5.
    #[serde(default = "default_max_slices")]
    pub max_slices: u32,
    /// Urgency above which MARKET orders are used. Default: 0.7.
    #[serde(default = "default_market_order_urgency")]
    pub market_order_urgency: f64,
}

fn default_base_delay_ms() -> u64 {
    60_000
}

fn default_inter_order_delay_ms() -> u64 {
    1_000
}

fn default_max_slices() -> u32 {
    5
}

fn default_market_order_urgency() -> f64 {
    0.7
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            inter_order_delay_ms: default_inter_order_delay_ms(),
            max_slices: default_max_slices(),
            market_order_urgency: default_market_order_urgency(),
        }
    }
}

impl TimingConfig {
    /// Delay compression: 10% above 0.8 urgency, 50% above 0.5.
    pub fn urgency_multiplier(urgency: f64) -> f64 {
        if urgency > 0.8 {
            0.1
        } else if urgency > 0.5 {
            0.5
        } else {
            1.0
        }
    }

    pub fn execute_at(&self, now: DateTime<Utc>, urgency: f64) -> DateTime<Utc> {
        let delay_ms = self.base_delay_ms as f64 * Self::urgency_multiplier(urgency);
        now + Duration::milliseconds(delay_ms.round() as i64)
    }

    pub fn order_type(&self, urgency: f64) -> OrderType {
        if urgency > self.market_order_urgency {
            OrderType::Market
        } else {
            OrderType::Limit
        }
    }

    pub fn plan(&self, now: DateTime<Utc>, urgency: f64, instrument_count: usize) -> ExecutionPlan {
        let slices = u32::try_from(instrument_count)
            .unwrap_or(u32::MAX)
            .min(self.max_slices);
        ExecutionPlan {
            execute_at: self.execute_at(now, urgency),
            order_type: self.order_type(urgency),
            slices,
            inter_order_delay_ms: self.inter_order_delay_ms,
        }
    }
}
