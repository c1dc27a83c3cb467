//! Session defaults with best-effort environment overrides.
//!
//! Invalid override values are ignored and the default is kept.

use crate::domain::{Mechanism, PrivacyBudget};
use crate::Result;

/// Noise-injection session parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrivacyConfig {
    /// Total epsilon budget for the session
    pub epsilon_total: f64,

    /// Failure probability; must be 0 for Laplace
    pub delta: f64,

    pub mechanism: Mechanism,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            epsilon_total: 1.0,
            delta: 1e-5,
            mechanism: Mechanism::Gaussian,
        }
    }
}

impl PrivacyConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported env vars:
    /// - `SYNTHLAB_DP_EPSILON` (f64 > 0)
    /// - `SYNTHLAB_DP_DELTA` (f64 in [0, 1))
    /// - `SYNTHLAB_DP_MECHANISM` (`gaussian` | `laplace`)
    ///
    /// Selecting Laplace without an explicit delta sets delta to 0.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("SYNTHLAB_DP_EPSILON") {
            if let Ok(x) = v.trim().parse::<f64>() {
                if x.is_finite() && x > 0.0 {
                    cfg.epsilon_total = x;
                }
            }
        }

        if let Some(v) = lookup("SYNTHLAB_DP_MECHANISM") {
            if let Ok(mechanism) = v.trim().parse::<Mechanism>() {
                cfg.mechanism = mechanism;
                if mechanism == Mechanism::Laplace {
                    cfg.delta = 0.0;
                }
            }
        }

        if let Some(v) = lookup("SYNTHLAB_DP_DELTA") {
            if let Ok(x) = v.trim().parse::<f64>() {
                if x.is_finite() && (0.0..1.0).contains(&x) {
                    cfg.delta = x;
                }
            }
        }

        cfg
    }

    /// Build a fresh budget from this configuration.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if delta does not suit the mechanism.
    pub fn create_budget(&self) -> Result<PrivacyBudget> {
        PrivacyBudget::new(self.epsilon_total, self.delta, self.mechanism)
    }
}

/// Audit thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuditConfig {
    pub k: usize,
    pub l: usize,
    pub t: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { k: 3, l: 2, t: 0.2 }
    }
}

impl AuditConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported env vars:
    /// - `SYNTHLAB_AUDIT_K` (integer ≥ 1)
    /// - `SYNTHLAB_AUDIT_L` (integer ≥ 1)
    /// - `SYNTHLAB_AUDIT_T` (f64 in [0, 1])
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        let positive = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&x| x >= 1)
        };
        if let Some(k) = positive("SYNTHLAB_AUDIT_K") {
            cfg.k = k;
        }
        if let Some(l) = positive("SYNTHLAB_AUDIT_L") {
            cfg.l = l;
        }

        if let Some(v) = lookup("SYNTHLAB_AUDIT_T") {
            if let Ok(x) = v.trim().parse::<f64>() {
                if (0.0..=1.0).contains(&x) {
                    cfg.t = x;
                }
            }
        }

        cfg
    }
}
