//! Noise mechanisms and their calibration.
//!
//! For a query with sensitivity Δ:
//! - Laplace: `b = Δ / ε` gives pure ε-DP (δ must be 0)
//! - Gaussian: `σ = Δ · √(2·ln(1.25/δ)) / ε` gives (ε,δ)-DP (δ must be > 0)

use serde::{Deserialize, Serialize};

use crate::{PrivacyError, Result};

/// Additive noise mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mechanism {
    Gaussian,
    Laplace,
}

impl Mechanism {
    /// Check that `epsilon` and `delta` are valid for this mechanism.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for ε ≤ 0, δ outside [0, 1), Gaussian with
    /// δ = 0, or Laplace with δ ≠ 0.
    pub fn validate(self, epsilon: f64, delta: f64) -> Result<()> {
        validate_epsilon(epsilon)?;

        if !delta.is_finite() || !(0.0..1.0).contains(&delta) {
            return Err(PrivacyError::InvalidParameter(format!(
                "delta must be in [0, 1), got {delta}"
            )));
        }

        match self {
            Self::Gaussian if delta == 0.0 => Err(PrivacyError::InvalidParameter(
                "gaussian mechanism requires delta > 0".to_string(),
            )),
            Self::Laplace if delta != 0.0 => Err(PrivacyError::InvalidParameter(format!(
                "laplace mechanism is pure ε-DP and requires delta = 0, got {delta}"
            ))),
            _ => Ok(()),
        }
    }

    /// Noise scale for one release: σ for Gaussian, b for Laplace.
    ///
    /// A zero sensitivity yields a zero scale (constant column, no noise).
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the parameters are invalid, the
    /// sensitivity is negative, or the scale overflows `f64`.
    pub fn noise_scale(self, sensitivity: f64, epsilon: f64, delta: f64) -> Result<f64> {
        self.validate(epsilon, delta)?;

        if !sensitivity.is_finite() || sensitivity < 0.0 {
            return Err(PrivacyError::InvalidParameter(format!(
                "sensitivity must be finite and non-negative, got {sensitivity}"
            )));
        }
        if sensitivity == 0.0 {
            return Ok(0.0);
        }

        let scale = match self {
            Self::Laplace => sensitivity / epsilon,
            Self::Gaussian => sensitivity * (2.0 * (1.25 / delta).ln()).sqrt() / epsilon,
        };
        if !scale.is_finite() {
            return Err(PrivacyError::InvalidParameter(format!(
                "noise scale overflows for sensitivity {sensitivity} at epsilon {epsilon}"
            )));
        }
        Ok(scale)
    }
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gaussian => write!(f, "gaussian"),
            Self::Laplace => write!(f, "laplace"),
        }
    }
}

impl std::str::FromStr for Mechanism {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" => Ok(Self::Gaussian),
            "laplace" => Ok(Self::Laplace),
            other => Err(PrivacyError::InvalidParameter(format!(
                "unknown noise mechanism '{other}'"
            ))),
        }
    }
}

pub(crate) fn validate_epsilon(epsilon: f64) -> Result<()> {
    if !epsilon.is_finite() || epsilon <= 0.0 {
        return Err(PrivacyError::InvalidParameter(format!(
            "epsilon must be finite and positive, got {epsilon}"
        )));
    }
    Ok(())
}

/// Qualitative strength of a total epsilon budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    VeryStrong,
    Strong,
    Moderate,
    Weak,
}

impl PrivacyLevel {
    #[must_use]
    pub fn from_epsilon(epsilon: f64) -> Self {
        if epsilon < 0.5 {
            Self::VeryStrong
        } else if epsilon < 1.5 {
            Self::Strong
        } else if epsilon < 5.0 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::VeryStrong => "Very strong privacy - high noise, significant utility loss expected",
            Self::Strong => "Strong privacy - balanced noise and utility (recommended)",
            Self::Moderate => "Moderate privacy - lower noise, better utility",
            Self::Weak => "Weak privacy - minimal noise, guarantees may be insufficient",
        }
    }
}
