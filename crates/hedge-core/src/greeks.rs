//! Option Greeks.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Per-contract option sensitivities.
///
/// Units: theta per calendar day, vega per 1 vol point, rho per 1 rate point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// dV/dS
    pub delta: f64,
    /// d²V/dS²
    pub gamma: f64,
    /// dV/dt, per day
    pub theta: f64,
    /// dV/dσ, per 1% of volatility
    pub vega: f64,
    /// dV/dr, per 1% of rate
    pub rho: f64,
}

impl Greeks {
    /// All-zero Greeks (expired contracts).
    pub const ZERO: Greeks = Greeks {
        delta: 0.0,
        gamma: 0.0,
        theta: 0.0,
        vega: 0.0,
        rho: 0.0,
    };

    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64, rho: f64) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
            rho,
        }
    }

    /// Scale by a position size.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
            rho: self.rho * factor,
        }
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.delta.is_finite()
            && self.gamma.is_finite()
            && self.theta.is_finite()
            && self.vega.is_finite()
            && self.rho.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Add for Greeks {
    type Output = Greeks;

    fn add(self, other: Greeks) -> Greeks {
        Greeks {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
            rho: self.rho + other.rho,
        }
    }
}

impl AddAssign for Greeks {
    fn add_assign(&mut self, other: Greeks) {
        *self = *self + other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_and_add() {
        let g = Greeks::new(0.5, 0.01, -10.0, 20.0, 5.0);
        let total = g.scale(2.0) + g.scale(-1.0);
        assert_eq!(total, g);
    }

    #[test]
    fn test_zero() {
        assert!(Greeks::ZERO.is_zero());
        assert!(Greeks::ZERO.is_finite());
        assert!(!Greeks::new(f64::NAN, 0.0, 0.0, 0.0, 0.0).is_finite());
    }
}
