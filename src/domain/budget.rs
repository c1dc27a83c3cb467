//! Privacy budget tracking under sequential composition.
//!
//! The total privacy cost of independent DP releases is the sum of their
//! epsilons. A [`PrivacyBudget`] accepts a release only if the running sum
//! stays within `epsilon_total`; there is no refund.
//!
//! # Concurrency
//!
//! The ledger is guarded by a `Mutex` so that the check and the commit of a
//! reservation are one step: two callers can never both observe enough
//! remaining budget and jointly overspend it. A poisoned lock fails closed.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mechanism::{validate_epsilon, Mechanism, PrivacyLevel};
use crate::{PrivacyError, Result};

/// Scale factor for fixed-point epsilon arithmetic.
/// Epsilon is stored as (epsilon * EPSILON_SCALE) so repeated additions do not drift.
const EPSILON_SCALE: f64 = 1_000_000_000.0;

/// Scaled values within this distance of an integer are float noise from
/// the multiplication, not a real fraction of a unit.
const SCALE_SLACK: f64 = 1e-3;

/// Scale a charge, rounding any real fraction of a unit up.
fn to_scaled_charge(epsilon: f64) -> u64 {
    let x = epsilon * EPSILON_SCALE;
    let nearest = x.round();
    let scaled = if (x - nearest).abs() <= SCALE_SLACK {
        nearest
    } else {
        x.ceil()
    };
    scaled.max(0.0) as u64
}

/// Scale a limit, rounding any real fraction of a unit down.
fn to_scaled_limit(epsilon: f64) -> u64 {
    let x = epsilon * EPSILON_SCALE;
    let nearest = x.round();
    let scaled = if (x - nearest).abs() <= SCALE_SLACK {
        nearest
    } else {
        x.floor()
    };
    scaled.max(0.0) as u64
}

fn from_scaled(scaled: u64) -> f64 {
    scaled as f64 / EPSILON_SCALE
}

/// One noise release charged against a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub column_name: String,
    pub epsilon_spent: f64,
    pub sensitivity: f64,
    pub noise_scale: f64,
    pub mechanism: Mechanism,
    pub timestamp: DateTime<Utc>,
}

/// A pending charge, validated and calibrated but not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetRequest {
    pub column_name: String,
    pub epsilon: f64,
    pub sensitivity: f64,
    pub noise_scale: f64,
}

/// Snapshot of a budget for audit and compliance export.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetReport {
    pub epsilon_total: f64,
    pub epsilon_used: f64,
    pub remaining: f64,
    pub utilization_percent: f64,
    pub delta: f64,
    pub mechanism: Mechanism,
    pub privacy_level: PrivacyLevel,
    pub interpretation: &'static str,
    pub operations: Vec<OperationRecord>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Ledger {
    spent_scaled: u64,
    operations: Vec<OperationRecord>,
}

/// An (ε,δ) budget for one noise-injection session.
#[derive(Debug)]
pub struct PrivacyBudget {
    epsilon_total: f64,
    delta: f64,
    mechanism: Mechanism,
    ledger: Mutex<Ledger>,
}

/// Create a budget for a noise-injection session.
///
/// # Errors
/// Returns `InvalidParameter` if the parameters do not suit the mechanism.
pub fn create_budget(epsilon_total: f64, delta: f64, mechanism: Mechanism) -> Result<PrivacyBudget> {
    PrivacyBudget::new(epsilon_total, delta, mechanism)
}

impl PrivacyBudget {
    /// Create a budget.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for ε ≤ 0, δ outside [0, 1), or a δ that
    /// does not match the mechanism.
    pub fn new(epsilon_total: f64, delta: f64, mechanism: Mechanism) -> Result<Self> {
        mechanism.validate(epsilon_total, delta)?;
        tracing::debug!(
            "Created privacy budget ε={epsilon_total}, δ={delta}, mechanism={mechanism}"
        );
        Ok(Self {
            epsilon_total,
            delta,
            mechanism,
            ledger: Mutex::new(Ledger::default()),
        })
    }

    #[must_use]
    pub fn epsilon_total(&self) -> f64 {
        self.epsilon_total
    }

    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    #[must_use]
    pub fn mechanism(&self) -> Mechanism {
        self.mechanism
    }

    /// Noise scale of this budget's mechanism for one release.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for an invalid epsilon or sensitivity.
    pub fn noise_scale(&self, sensitivity: f64, epsilon: f64) -> Result<f64> {
        self.mechanism.noise_scale(sensitivity, epsilon, self.delta)
    }

    fn max_epsilon_scaled(&self) -> u64 {
        to_scaled_limit(self.epsilon_total)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>> {
        self.ledger.lock().map_err(|_| {
            tracing::error!("Privacy budget ledger lock poisoned; refusing to reserve");
            PrivacyError::BudgetUnavailable
        })
    }

    /// Atomically charge one release against the budget.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for a non-positive epsilon and
    /// `BudgetExhausted` if the charge would exceed the total. The budget is
    /// unchanged on error.
    pub fn reserve(&self, request: BudgetRequest) -> Result<OperationRecord> {
        validate_epsilon(request.epsilon)?;
        self.reserve_all(vec![request])?
            .pop()
            .ok_or(PrivacyError::BudgetUnavailable)
    }

    /// Atomically charge a batch of releases: all are committed or none.
    ///
    /// Individual epsilons may be zero (constant columns under a
    /// sensitivity-proportional split) but never negative.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for a malformed request and
    /// `BudgetExhausted` if the batch total would exceed the budget.
    pub fn reserve_all(&self, requests: Vec<BudgetRequest>) -> Result<Vec<OperationRecord>> {
        for request in &requests {
            for (label, value) in [
                ("epsilon", request.epsilon),
                ("sensitivity", request.sensitivity),
                ("noise scale", request.noise_scale),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(PrivacyError::InvalidParameter(format!(
                        "{label} for column '{}' must be finite and non-negative, got {value}",
                        request.column_name
                    )));
                }
            }
        }

        let requested: f64 = requests.iter().map(|r| r.epsilon).sum();
        let requested_scaled = to_scaled_charge(requested);
        if requested > 0.0 && requested_scaled == 0 {
            return Err(PrivacyError::InvalidParameter(format!(
                "epsilon {requested} is below the accounting resolution of {}",
                1.0 / EPSILON_SCALE
            )));
        }
        let max_scaled = self.max_epsilon_scaled();

        let mut ledger = self.lock()?;
        let current = ledger.spent_scaled;
        if current > max_scaled || max_scaled - current < requested_scaled {
            let remaining = from_scaled(max_scaled.saturating_sub(current));
            tracing::warn!(
                "Privacy budget exhausted: need {requested}, remaining {remaining:.9}"
            );
            return Err(PrivacyError::BudgetExhausted {
                requested,
                remaining,
            });
        }

        let timestamp = Utc::now();
        let records: Vec<OperationRecord> = requests
            .into_iter()
            .map(|r| OperationRecord {
                column_name: r.column_name,
                epsilon_spent: r.epsilon,
                sensitivity: r.sensitivity,
                noise_scale: r.noise_scale,
                mechanism: self.mechanism,
                timestamp,
            })
            .collect();

        ledger.spent_scaled = current + requested_scaled;
        ledger.operations.extend(records.iter().cloned());

        tracing::info!(
            "Reserved ε={requested} for {} column(s); used {:.6} / {}",
            records.len(),
            from_scaled(ledger.spent_scaled),
            self.epsilon_total
        );

        Ok(records)
    }

    /// Total epsilon consumed so far.
    #[must_use]
    pub fn epsilon_used(&self) -> f64 {
        match self.ledger.lock() {
            Ok(ledger) => from_scaled(ledger.spent_scaled),
            Err(_) => self.epsilon_total,
        }
    }

    /// Epsilon still available.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        match self.ledger.lock() {
            Ok(ledger) => from_scaled(self.max_epsilon_scaled().saturating_sub(ledger.spent_scaled)),
            Err(_) => 0.0,
        }
    }

    /// Check if a release with the given epsilon would currently be accepted.
    ///
    /// A poisoned ledger accepts nothing.
    #[must_use]
    pub fn can_reserve(&self, epsilon: f64) -> bool {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return false;
        }
        let charge = to_scaled_charge(epsilon);
        if charge == 0 {
            return false;
        }
        match self.ledger.lock() {
            Ok(ledger) => {
                let max_scaled = self.max_epsilon_scaled();
                ledger.spent_scaled <= max_scaled && max_scaled - ledger.spent_scaled >= charge
            }
            Err(_) => false,
        }
    }

    /// Audit trail of committed releases, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<OperationRecord> {
        match self.ledger.lock() {
            Ok(ledger) => ledger.operations.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Build a report of the budget state.
    ///
    /// # Errors
    /// Returns `BudgetUnavailable` if the ledger lock is poisoned.
    pub fn report(&self) -> Result<BudgetReport> {
        let ledger = self.lock()?;
        let epsilon_used = from_scaled(ledger.spent_scaled);
        let remaining = from_scaled(self.max_epsilon_scaled().saturating_sub(ledger.spent_scaled));
        let privacy_level = PrivacyLevel::from_epsilon(self.epsilon_total);

        Ok(BudgetReport {
            epsilon_total: self.epsilon_total,
            epsilon_used,
            remaining,
            utilization_percent: epsilon_used / self.epsilon_total * 100.0,
            delta: self.delta,
            mechanism: self.mechanism,
            privacy_level,
            interpretation: privacy_level.description(),
            operations: ledger.operations.clone(),
            generated_at: Utc::now(),
        })
    }
}
