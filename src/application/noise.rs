//! Noise injection: calibrated Gaussian/Laplace noise on numeric columns.
//!
//! Every release is charged against a [`PrivacyBudget`] before any noise is
//! drawn. A rejected reservation leaves the data and the budget untouched.

use std::collections::HashMap;

use crate::domain::{
    column_sensitivity, estimate_sensitivity, BudgetRequest, Column, ColumnKind, ColumnSensitivity,
    OperationRecord, PrivacyBudget, Table,
};
use crate::ports::NoiseSource;
use crate::{PrivacyError, Result};

/// How a table-wide epsilon is split across numeric columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AllocationPolicy {
    /// `ε / n` for each of the `n` numeric columns.
    #[default]
    Uniform,
    /// Absolute per-column epsilons. Every numeric column must be listed.
    Explicit(HashMap<String, f64>),
    /// `ε · Δ_i / ΣΔ`; uniform when every column is constant.
    SensitivityProportional,
}

/// Options for [`add_noise_to_table`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableNoiseOptions {
    pub allocation: AllocationPolicy,
    /// Total epsilon to spend. Defaults to the budget's remaining epsilon.
    /// Ignored by [`AllocationPolicy::Explicit`].
    pub epsilon: Option<f64>,
    /// Per-column sensitivity bounds, used instead of the observed range.
    pub sensitivity_overrides: HashMap<String, f64>,
}

impl TableNoiseOptions {
    #[must_use]
    pub fn with_allocation(mut self, allocation: AllocationPolicy) -> Self {
        self.allocation = allocation;
        self
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    #[must_use]
    pub fn with_sensitivity(mut self, column: impl Into<String>, sensitivity: f64) -> Self {
        self.sensitivity_overrides.insert(column.into(), sensitivity);
        self
    }
}

/// Add calibrated noise to one numeric column.
///
/// Missing cells stay missing; no clipping is applied. A noised value that
/// overflows `f64` is stored as missing.
///
/// # Errors
/// Returns `InvalidColumn` for a categorical or all-missing column,
/// `InvalidParameter` for an invalid epsilon, and `BudgetExhausted` if the
/// budget cannot cover `epsilon`.
pub fn add_noise_to_column<N: NoiseSource>(
    column: &Column,
    budget: &PrivacyBudget,
    epsilon: f64,
    sensitivity: Option<f64>,
    noise: &mut N,
) -> Result<(Column, OperationRecord)> {
    let values = column.require_numeric()?;
    let sensitivity = estimate_sensitivity(column, sensitivity)?;
    let noise_scale = budget.noise_scale(sensitivity, epsilon)?;

    let record = budget.reserve(BudgetRequest {
        column_name: column.name().to_string(),
        epsilon,
        sensitivity,
        noise_scale,
    })?;

    let noisy = perturb(values, budget, noise_scale, noise);

    tracing::info!(
        column = column.name(),
        "Added {} noise (ε={epsilon}, Δ={sensitivity}, scale={noise_scale:.6})",
        budget.mechanism()
    );

    Ok((Column::numeric_with_missing(column.name(), noisy), record))
}

/// Add calibrated noise to every numeric column of a table.
///
/// Categorical columns pass through unchanged. All columns are calibrated
/// first and reserved as one batch; noise is drawn only after the whole
/// batch is accepted.
///
/// # Errors
/// Returns `InvalidParameter` for an invalid total epsilon or allocation,
/// `InvalidColumn` for a bad override or allocation entry, and
/// `BudgetExhausted` if the batch does not fit.
pub fn add_noise_to_table<N: NoiseSource>(
    table: &Table,
    budget: &PrivacyBudget,
    options: &TableNoiseOptions,
    noise: &mut N,
) -> Result<(Table, Vec<OperationRecord>)> {
    for name in options.sensitivity_overrides.keys() {
        require_numeric_name(table, name, "sensitivity override")?;
    }

    let numeric: Vec<&Column> = table.numeric_columns().collect();
    if numeric.is_empty() {
        tracing::info!("No numeric columns; table passes through without noise");
        return Ok((table.clone(), Vec::new()));
    }

    let sensitivities: Vec<ColumnSensitivity> = numeric
        .iter()
        .map(|c| column_sensitivity(c, options.sensitivity_overrides.get(c.name()).copied()))
        .collect::<Result<_>>()?;

    let epsilons = allocate(table, budget, options, &numeric, &sensitivities)?;

    let requests: Vec<BudgetRequest> = sensitivities
        .into_iter()
        .zip(&epsilons)
        .map(|(calibration, &epsilon)| {
            let noise_scale = if epsilon == 0.0 {
                0.0
            } else {
                budget.noise_scale(calibration.sensitivity, epsilon)?
            };
            tracing::debug!(
                column = calibration.column_name.as_str(),
                "Calibrated Δ={}, ε={epsilon}, scale={noise_scale:.6}",
                calibration.sensitivity
            );
            Ok::<_, PrivacyError>(BudgetRequest {
                column_name: calibration.column_name,
                epsilon,
                sensitivity: calibration.sensitivity,
                noise_scale,
            })
        })
        .collect::<Result<_>>()?;

    let scales: HashMap<String, f64> = requests
        .iter()
        .map(|r| (r.column_name.clone(), r.noise_scale))
        .collect();

    let records = budget.reserve_all(requests)?;

    let columns: Vec<Column> = table
        .columns()
        .iter()
        .map(|column| match (column.as_numeric(), scales.get(column.name())) {
            (Some(values), Some(&scale)) => Column::numeric_with_missing(
                column.name(),
                perturb(values, budget, scale, noise),
            ),
            _ => column.clone(),
        })
        .collect();

    let spent: f64 = records.iter().map(|r| r.epsilon_spent).sum();
    tracing::info!(
        "Added {} noise to {} numeric column(s), ε={spent:.6}",
        budget.mechanism(),
        records.len()
    );

    Ok((Table::new(columns)?, records))
}

fn perturb<N: NoiseSource>(
    values: &[Option<f64>],
    budget: &PrivacyBudget,
    scale: f64,
    noise: &mut N,
) -> Vec<Option<f64>> {
    let mechanism = budget.mechanism();
    values
        .iter()
        .map(|v| v.map(|x| x + noise.sample(mechanism, scale)))
        .collect()
}

fn require_numeric_name(table: &Table, name: &str, what: &str) -> Result<()> {
    let column = table.column(name)?;
    if column.kind() != ColumnKind::Numeric {
        return Err(PrivacyError::InvalidColumn(format!(
            "{what} names {} column '{name}', expected numeric",
            column.kind()
        )));
    }
    Ok(())
}

/// Per-column epsilons, in the order of `numeric`.
fn allocate(
    table: &Table,
    budget: &PrivacyBudget,
    options: &TableNoiseOptions,
    numeric: &[&Column],
    sensitivities: &[ColumnSensitivity],
) -> Result<Vec<f64>> {
    let n = numeric.len() as f64;

    if let AllocationPolicy::Explicit(map) = &options.allocation {
        for (name, &epsilon) in map {
            require_numeric_name(table, name, "epsilon allocation")?;
            if !epsilon.is_finite() || epsilon <= 0.0 {
                return Err(PrivacyError::InvalidParameter(format!(
                    "epsilon for column '{name}' must be finite and positive, got {epsilon}"
                )));
            }
        }
        return numeric
            .iter()
            .map(|c| {
                map.get(c.name()).copied().ok_or_else(|| {
                    PrivacyError::InvalidParameter(format!(
                        "no epsilon allocated for numeric column '{}'",
                        c.name()
                    ))
                })
            })
            .collect();
    }

    let total = match options.epsilon {
        Some(epsilon) => epsilon,
        None => {
            let remaining = budget.remaining();
            if !budget.can_reserve(remaining) {
                return Err(PrivacyError::BudgetExhausted {
                    requested: 0.0,
                    remaining,
                });
            }
            remaining
        }
    };
    budget.mechanism().validate(total, budget.delta())?;

    let sum: f64 = sensitivities.iter().map(|s| s.sensitivity).sum();
    match options.allocation {
        AllocationPolicy::SensitivityProportional if sum > 0.0 => Ok(sensitivities
            .iter()
            .map(|s| total * s.sensitivity / sum)
            .collect()),
        _ => Ok(vec![total / n; numeric.len()]),
    }
}
