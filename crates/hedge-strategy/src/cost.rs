//! Execution cost model.
//!
//! All rates are fractions of notional.

use serde::{Deserialize, Serialize};

/// Fixed fee and impact rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Default: 0.001 (10 bps).
    #[serde(default = "default_slippage")]
    pub slippage: f64,
    /// Per-instrument commission. Default: 0.0005 (5 bps).
    #[serde(default = "default_commission")]
    pub commission: f64,
    /// Default: 0.0008 (8 bps).
    #[serde(default = "default_market_impact")]
    pub market_impact: f64,
}

fn default_slippage() -> f64 {
    0.001
}

fn default_commission() -> f64 {
    0.0005
}

fn default_market_impact() -> f64 {
    0.0008
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            slippage: default_slippage(),
            commission: default_commission(),
            market_impact: default_market_impact(),
        }
    }
}

impl CostModel {
    /// Total friction per unit of notional.
    pub fn total_rate(&self) -> f64 {
        self.slippage + self.commission + self.market_impact
    }

    /// `1 - (slippage + commission + market_impact)`
    pub fn ratio_adjustment(&self) -> f64 {
        1.0 - self.total_rate()
    }

    /// Expected cost: commission per instrument plus market impact,
    /// both scaled by the hedge ratio. Zero when nothing is traded.
    pub fn expected_cost(&self, instrument_count: usize, hedge_ratio: f64) -> f64 {
        if instrument_count == 0 {
            return 0.0;
        }
        instrument_count as f64 * self.commission * hedge_ratio + self.market_impact * hedge_ratio
    }

    pub fn validate(&self) -> Result<(), String> {
        let rates = [self.slippage, self.commission, self.market_impact];
        if rates.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(format!("cost rates must be non-negative: {rates:?}"));
        }
        if self.total_rate() >= 1.0 {
            return Err(format!(
                "total cost rate ({}) must be below 1",
                self.total_rate()
            ));
        }
        Ok(())
    }
}
