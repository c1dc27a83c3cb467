//! k-anonymity: every equivalence class has at least k rows.

use super::{Metric, MetricResult, ViolatingGroup};
use crate::domain::equivalence::EquivalenceClasses;
use crate::{PrivacyError, Result};

/// Check k-anonymity of the given classes.
///
/// A class violates if its size is below `k`. With `k = 1` every non-empty
/// class passes; with `k` above the row count every row is at risk.
///
/// # Errors
/// Returns `InvalidParameter` if `k < 1`.
pub fn check_k_anonymity(classes: &EquivalenceClasses, k: usize) -> Result<MetricResult> {
    if k < 1 {
        return Err(PrivacyError::InvalidParameter(format!(
            "k must be at least 1, got {k}"
        )));
    }

    let violating: Vec<ViolatingGroup> = classes
        .iter()
        .filter(|class| class.size() < k)
        .map(|class| ViolatingGroup {
            key: class.key.clone(),
            size: class.size(),
            observed: class.size() as f64,
            deficit: (k - class.size()) as f64,
        })
        .collect();

    let unique_records = classes.iter().filter(|c| c.size() == 1).count();
    let result = MetricResult::new(
        Metric::KAnonymity,
        None,
        k as f64,
        classes.total_rows(),
        violating,
    );
    let records_at_risk = result.records_at_risk();

    tracing::info!(
        "k-anonymity (k={k}): {} of {} classes violate, {records_at_risk} of {} records at risk",
        result.violating_groups.len(),
        classes.len(),
        classes.total_rows()
    );

    Ok(result
        .with_detail("total_groups", classes.len())
        .with_detail("smallest_group_size", classes.smallest_class_size())
        .with_detail("records_at_risk", records_at_risk)
        .with_detail("total_records", classes.total_rows())
        .with_detail("unique_records", unique_records))
}
