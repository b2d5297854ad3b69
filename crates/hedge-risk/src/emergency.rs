//! Hard-threshold breach detection.
//!
//! EmergencyCheck: evaluates a report against the EXTREME limits.
//! EmergencyLatch: remembers an active breach so out-of-band price updates
//! trigger one emergency run per breach, not one per update.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use hedge_core::ExposureReport;
use parking_lot::RwLock;
use tracing::{error, info};

use crate::thresholds::RiskThresholds;

// ============================================================================
// EmergencyBreach
// ============================================================================

/// Which hard limit was crossed.
#[derive(Debug, Clone, PartialEq)]
pub enum EmergencyBreach {
    /// |total gamma| at or above the extreme threshold.
    GammaLimit { gamma: f64, limit: f64 },
    /// Delta imbalance above the emergency imbalance.
    DeltaImbalance { imbalance: f64, limit: f64 },
}

impl std::fmt::Display for EmergencyBreach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GammaLimit { gamma, limit } => {
                write!(f, "gamma {gamma:.0} >= limit {limit:.0}")
            }
            Self::DeltaImbalance { imbalance, limit } => {
                write!(f, "delta imbalance {imbalance:.4} > limit {limit:.4}")
            }
        }
    }
}

// ============================================================================
// EmergencyCheck
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct EmergencyCheck {
    thresholds: RiskThresholds,
}

impl EmergencyCheck {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    /// First breached hard limit, gamma before delta.
    pub fn evaluate(&self, report: &ExposureReport) -> Option<EmergencyBreach> {
        let gamma = report.total_gamma.abs();
        if gamma >= self.thresholds.extreme {
            return Some(EmergencyBreach::GammaLimit {
                gamma,
                limit: self.thresholds.extreme,
            });
        }
        if report.delta_imbalance > self.thresholds.emergency_imbalance {
            return Some(EmergencyBreach::DeltaImbalance {
                imbalance: report.delta_imbalance,
                limit: self.thresholds.emergency_imbalance,
            });
        }
        None
    }
}

// ============================================================================
// EmergencyLatch
// ============================================================================

/// Latch for an active emergency.
///
/// Thread-safe: share via `Arc<EmergencyLatch>`.
pub struct EmergencyLatch {
    triggered: AtomicBool,
    /// Unix milliseconds, 0 if not triggered.
    triggered_at: AtomicI64,
    breach: RwLock<Option<EmergencyBreach>>,
}

impl Default for EmergencyLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyLatch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            triggered: AtomicBool::new(false),
            triggered_at: AtomicI64::new(0),
            breach: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Trigger the latch. Returns `true` only for the call that set it.
    pub fn trigger(&self, breach: EmergencyBreach, now: DateTime<Utc>) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.triggered_at
                .store(now.timestamp_millis(), Ordering::SeqCst);
            error!(breach = %breach, "EMERGENCY THRESHOLD BREACHED");
            *self.breach.write() = Some(breach);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn triggered_at(&self) -> Option<DateTime<Utc>> {
        if !self.is_triggered() {
            return None;
        }
        match self.triggered_at.load(Ordering::SeqCst) {
            0 => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        }
    }

    #[must_use]
    pub fn breach(&self) -> Option<EmergencyBreach> {
        if self.is_triggered() {
            self.breach.read().clone()
        } else {
            None
        }
    }

    /// Clear the latch once exposure is back inside the hard limits.
    pub fn reset(&self) {
        if self.is_triggered() {
            let breach = self.breach.write().take();
            info!(previous_breach = ?breach, "Emergency latch cleared");
            self.triggered_at.store(0, Ordering::SeqCst);
            self.triggered.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedge_core::{Greeks, RiskLevel};
    use std::collections::BTreeMap;

    fn report(gamma: f64, imbalance: f64) -> ExposureReport {
        ExposureReport {
            as_of: Utc::now(),
            total_delta: 0.0,
            total_gamma: gamma,
            totals: Greeks::ZERO,
            gamma_by_strike: BTreeMap::new(),
            gamma_by_expiration: BTreeMap::new(),
            delta_imbalance: imbalance,
            risk_level: RiskLevel::Minimal,
            hedging_urgency: 0.0,
            concentration: 1.0,
            gamma_risk: 0.0,
            position_count: 0,
            expired_count: 0,
            excluded: Vec::new(),
            stale_symbols: Vec::new(),
        }
    }

    #[test]
    fn test_evaluate() {
        let check = EmergencyCheck::default();
        assert!(check.evaluate(&report(4_999_999.0, 0.5)).is_none());
        assert!(matches!(
            check.evaluate(&report(-5_000_000.0, 0.0)),
            Some(EmergencyBreach::GammaLimit { .. })
        ));
        assert!(matches!(
            check.evaluate(&report(10.0, 0.51)),
            Some(EmergencyBreach::DeltaImbalance { .. })
        ));
    }

    #[test]
    fn test_latch_triggers_once() {
        let latch = EmergencyLatch::new();
        let breach = EmergencyBreach::DeltaImbalance {
            imbalance: 0.7,
            limit: 0.5,
        };
        let now = Utc::now();
        assert!(latch.trigger(breach.clone(), now));
        assert!(!latch.trigger(breach.clone(), now));
        assert_eq!(latch.breach(), Some(breach));
        assert_eq!(
            latch.triggered_at().map(|t| t.timestamp_millis()),
            Some(now.timestamp_millis())
        );
    }

    #[test]
    fn test_latch_reset() {
        let latch = EmergencyLatch::new();
        latch.trigger(
            EmergencyBreach::GammaLimit {
                gamma: 6e6,
                limit: 5e6,
            },
            Utc::now(),
        );
        latch.reset();
        assert!(!latch.is_triggered());
        assert!(latch.breach().is_none());
        assert!(latch.triggered_at().is_none());
    }
}
