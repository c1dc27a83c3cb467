//! Per-column sensitivity estimation.
//!
//! Sensitivity is the observed range `max - min` of a numeric column unless
//! the caller supplies a domain bound (e.g. a known clinical range).

use serde::{Deserialize, Serialize};

use super::table::Column;
use crate::{PrivacyError, Result};

/// Sensitivity used to calibrate noise for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSensitivity {
    pub column_name: String,
    pub sensitivity: f64,
}

/// Estimate the sensitivity of a numeric column.
///
/// A finite, non-negative `override_value` is returned verbatim. Otherwise the
/// range over non-missing values is used.
///
/// # Errors
/// Returns `InvalidColumn` if the column is categorical or has no non-missing
/// value.
pub fn estimate_sensitivity(column: &Column, override_value: Option<f64>) -> Result<f64> {
    let values = column.require_numeric()?;

    if let Some(bound) = override_value {
        if bound.is_finite() && bound >= 0.0 {
            return Ok(bound);
        }
        tracing::warn!(
            column = column.name(),
            "Ignoring invalid sensitivity override {bound}; using observed range"
        );
    }

    observed_range(values).ok_or_else(|| {
        PrivacyError::InvalidColumn(format!(
            "column '{}' has no non-missing numeric values",
            column.name()
        ))
    })
}

/// Like [`estimate_sensitivity`], tagged with the column name.
///
/// # Errors
/// Same as [`estimate_sensitivity`].
pub fn column_sensitivity(
    column: &Column,
    override_value: Option<f64>,
) -> Result<ColumnSensitivity> {
    Ok(ColumnSensitivity {
        column_name: column.name().to_string(),
        sensitivity: estimate_sensitivity(column, override_value)?,
    })
}

fn observed_range(values: &[Option<f64>]) -> Option<f64> {
    let (min, max) = values
        .iter()
        .flatten()
        .fold(None, |acc: Option<(f64, f64)>, &x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })?;
    Some(max - min)
}
