//! Distinct l-diversity: every equivalence class holds at least l distinct
//! values of the sensitive attribute.
//!
//! Entropy and recursive (c,l)-diversity are not implemented.

use std::collections::HashSet;

use super::{sensitive_column, Metric, MetricResult, ViolatingGroup};
use crate::domain::equivalence::EquivalenceClasses;
use crate::domain::table::{CellKey, Table};
use crate::{PrivacyError, Result};

/// Check distinct l-diversity of one sensitive attribute.
///
/// Missing sensitive values do not count towards diversity.
///
/// # Errors
/// Returns `InvalidParameter` if `l < 1` or the classes were not built from
/// `table`, and `InvalidColumn` if the attribute does not exist.
pub fn check_l_diversity(
    table: &Table,
    classes: &EquivalenceClasses,
    attribute: &str,
    l: usize,
) -> Result<MetricResult> {
    if l < 1 {
        return Err(PrivacyError::InvalidParameter(format!(
            "l must be at least 1, got {l}"
        )));
    }
    let data = sensitive_column(table, classes, attribute)?;

    let mut violating = Vec::new();
    let mut min_distinct: Option<usize> = None;

    for class in classes {
        let distinct = class
            .rows
            .iter()
            .map(|&row| data.key_at(row))
            .filter(|key| *key != CellKey::Missing)
            .collect::<HashSet<_>>()
            .len();

        min_distinct = Some(min_distinct.map_or(distinct, |m| m.min(distinct)));

        if distinct < l {
            violating.push(ViolatingGroup {
                key: class.key.clone(),
                size: class.size(),
                observed: distinct as f64,
                deficit: (l - distinct) as f64,
            });
        }
    }

    let result = MetricResult::new(
        Metric::LDiversity,
        Some(attribute.to_string()),
        l as f64,
        classes.total_rows(),
        violating,
    );
    let records_at_risk = result.records_at_risk();

    tracing::info!(
        attribute,
        "l-diversity (l={l}): {} of {} classes violate",
        result.violating_groups.len(),
        classes.len()
    );

    Ok(result
        .with_detail("total_groups", classes.len())
        .with_detail("records_at_risk", records_at_risk)
        .with_detail("min_distinct_values", min_distinct))
}
