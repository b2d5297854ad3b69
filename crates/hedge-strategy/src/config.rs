//! Strategy configuration.

use crate::cost::CostModel;
use crate::error::{StrategyError, StrategyResult};
use crate::instruments::InstrumentConfig;
use crate::timing::TimingConfig;
use hedge_core::VolatilityRegime;
use hedge_risk::{DeltaTolerance, RiskThresholds};
use serde::{Deserialize, Serialize};

/// Hedge ratio adjustment factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioConfig {
    /// Default: 1.0.
    #[serde(default = "default_base_ratio")]
    pub base_ratio: f64,
    /// Upper clamp. Default: 1.5.
    #[serde(default = "default_max_ratio")]
    pub max_ratio: f64,
    /// Applied under HIGH_VOL. Default: 0.8.
    #[serde(default = "default_high_vol_adjustment")]
    pub high_vol_adjustment: f64,
    /// Applied under LOW_VOL. Default: 1.2.
    #[serde(default = "default_low_vol_adjustment")]
    pub low_vol_adjustment: f64,
    /// Liquidity above this is considered deep. Default: 0.7.
    #[serde(default = "default_liquid_threshold")]
    pub liquid_threshold: f64,
    /// Applied when liquidity is at or below the threshold. Default: 0.7.
    #[serde(default = "default_illiquid_adjustment")]
    pub illiquid_adjustment: f64,
}

fn default_base_ratio() -> f64 {
    1.0
}

fn default_max_ratio() -> f64 {
    1.5
}

fn default_high_vol_adjustment() -> f64 {
    0.8
}

fn default_low_vol_adjustment() -> f64 {
    1.2
}

fn default_liquid_threshold() -> f64 {
    0.7
}

fn default_illiquid_adjustment() -> f64 {
    0.7
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            base_ratio: default_base_ratio(),
            max_ratio: default_max_ratio(),
            high_vol_adjustment: default_high_vol_adjustment(),
            low_vol_adjustment: default_low_vol_adjustment(),
            liquid_threshold: default_liquid_threshold(),
            illiquid_adjustment: default_illiquid_adjustment(),
        }
    }
}

impl RatioConfig {
    pub fn market_adjustment(&self, regime: VolatilityRegime) -> f64 {
        match regime {
            VolatilityRegime::HighVol => self.high_vol_adjustment,
            VolatilityRegime::LowVol => self.low_vol_adjustment,
            VolatilityRegime::NormalVol | VolatilityRegime::Crisis => 1.0,
        }
    }

    pub fn liquidity_adjustment(&self, liquidity: f64) -> f64 {
        if liquidity > self.liquid_threshold {
            1.0
        } else {
            self.illiquid_adjustment
        }
    }
}

/// Complete strategy generator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub thresholds: RiskThresholds,
    #[serde(default)]
    pub delta_tolerance: DeltaTolerance,
    #[serde(default)]
    pub costs: CostModel,
    #[serde(default)]
    pub ratio: RatioConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub instruments: InstrumentConfig,
}

impl StrategyConfig {
    pub fn validate(&self) -> StrategyResult<()> {
        self.thresholds.validate()?;
        self.costs.validate().map_err(StrategyError::ConfigError)?;
        if !(self.ratio.max_ratio.is_finite() && self.ratio.max_ratio > 0.0) {
            return Err(StrategyError::ConfigError(format!(
                "max_ratio ({}) must be positive",
                self.ratio.max_ratio
            )));
        }
        if self.timing.max_slices == 0 {
            return Err(StrategyError::ConfigError(
                "max_slices must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
