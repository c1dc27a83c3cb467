//! t-closeness: the sensitive-attribute distribution of every equivalence
//! class stays within distance t of the distribution over the whole table.
//!
//! Distance is total variation, `D = Σ|P(v) − Q(v)| / 2`, which equals the
//! Earth Mover's Distance over categories with unit ground distance.

use std::collections::HashMap;

use super::{sensitive_column, Metric, MetricResult, ViolatingGroup};
use crate::domain::equivalence::{EquivalenceClass, EquivalenceClasses};
use crate::domain::table::{CellKey, ColumnData, Table};
use crate::{PrivacyError, Result};

/// Check t-closeness of one sensitive attribute.
///
/// Missing sensitive values are treated as one more category so both
/// distributions sum to one. Singleton classes are checked like any other.
///
/// # Errors
/// Returns `InvalidParameter` if `t` is outside [0, 1] or the classes were
/// not built from `table`, and `InvalidColumn` if the attribute does not exist.
pub fn check_t_closeness(
    table: &Table,
    classes: &EquivalenceClasses,
    attribute: &str,
    t: f64,
) -> Result<MetricResult> {
    if !(0.0..=1.0).contains(&t) {
        return Err(PrivacyError::InvalidParameter(format!(
            "t must be in [0, 1], got {t}"
        )));
    }
    let data = sensitive_column(table, classes, attribute)?;

    let total_rows = table.num_rows();
    let mut global: HashMap<CellKey, usize> = HashMap::new();
    for row in 0..total_rows {
        *global.entry(data.key_at(row)).or_insert(0) += 1;
    }

    let mut violating = Vec::new();
    let mut distances = Vec::with_capacity(classes.len());

    for class in classes {
        let distance = class_distance(class, data, &global, total_rows);
        tracing::debug!(attribute, size = class.size(), "class distance {distance:.4}");

        if distance > t {
            violating.push(ViolatingGroup {
                key: class.key.clone(),
                size: class.size(),
                observed: distance,
                deficit: distance - t,
            });
        }
        distances.push(serde_json::json!({
            "group": class.key,
            "size": class.size(),
            "distance": distance,
        }));
    }

    let values: Vec<f64> = distances
        .iter()
        .filter_map(|d| d["distance"].as_f64())
        .collect();
    let min = values.iter().copied().reduce(f64::min);
    let max = values.iter().copied().reduce(f64::max);
    let mean = if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    };

    let result = MetricResult::new(
        Metric::TCloseness,
        Some(attribute.to_string()),
        t,
        total_rows,
        violating,
    );
    let records_at_risk = result.records_at_risk();

    tracing::info!(
        attribute,
        "t-closeness (t={t}): {} of {} classes violate, max distance {:.4}",
        result.violating_groups.len(),
        classes.len(),
        max.unwrap_or(0.0)
    );

    Ok(result
        .with_detail("total_groups", classes.len())
        .with_detail("records_at_risk", records_at_risk)
        .with_detail("min_distance", min)
        .with_detail("max_distance", max)
        .with_detail("mean_distance", mean)
        .with_detail("distances", distances))
}

/// Total variation distance between a class and the global distribution.
///
/// Only values present in the class are visited; the global mass of values
/// absent from the class is added in one step from integer counts, so
/// identical distributions give exactly zero.
fn class_distance(
    class: &EquivalenceClass,
    data: &ColumnData,
    global: &HashMap<CellKey, usize>,
    total_rows: usize,
) -> f64 {
    let size = class.size();
    if size == 0 || total_rows == 0 {
        return 0.0;
    }

    let mut local: HashMap<CellKey, usize> = HashMap::new();
    for &row in &class.rows {
        *local.entry(data.key_at(row)).or_insert(0) += 1;
    }

    let n = total_rows as f64;
    let mut covered = 0usize;
    let mut sum = 0.0;
    for (value, &count) in &local {
        let global_count = global.get(value).copied().unwrap_or(0);
        covered += global_count;
        sum += (global_count as f64 / n - count as f64 / size as f64).abs();
    }
    sum += total_rows.saturating_sub(covered) as f64 / n;

    (sum / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Column;

    fn build(table: &Table, qis: &[&str]) -> EquivalenceClasses {
        EquivalenceClasses::build(table, qis).expect("Classes build")
    }

    #[test]
    fn test_matching_distributions_have_zero_distance() {
        // Every ZIP group holds one Flu and two Cold, as does the whole table.
        let table = Table::new(vec![
            Column::categorical("ZIP", ["A", "A", "A", "B", "B", "B"]),
            Column::categorical("Dx", ["Flu", "Cold", "Cold", "Cold", "Flu", "Cold"]),
        ])
        .expect("Valid table");

        let result = check_t_closeness(&table, &build(&table, &["ZIP"]), "Dx", 0.0)
            .expect("Valid t");
        assert!(result.satisfied);
        assert_eq!(result.detail["max_distance"], 0.0);
        assert_eq!(result.detail["mean_distance"], 0.0);
    }

    #[test]
    fn test_isolated_category_is_maximally_distant() {
        // One singleton class holds a diagnosis that appears nowhere else.
        let mut zips = vec!["A"; 99];
        zips.push("B");
        let mut dx = vec!["Flu"; 99];
        dx.push("Rare");
        let table = Table::new(vec![Column::categorical("ZIP", zips), Column::categorical("Dx", dx)])
            .expect("Valid table");

        let result = check_t_closeness(&table, &build(&table, &["ZIP"]), "Dx", 0.5)
            .expect("Valid t");
        assert!(!result.satisfied);
        assert_eq!(result.violating_groups.len(), 1);
        let group = &result.violating_groups[0];
        assert_eq!(group.size, 1);
        // D = 1 − (class share of the table)
        assert!((group.observed - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_skewed_group_distance() {
        let table = Table::new(vec![
            Column::categorical("ZIP", ["A", "A", "B", "B"]),
            Column::categorical("Dx", ["Flu", "Flu", "Cold", "Cold"]),
        ])
        .expect("Valid table");
        let result = check_t_closeness(&table, &build(&table, &["ZIP"]), "Dx", 0.2)
            .expect("Valid t");

        // Each group: |0.5 − 1| + |0.5 − 0| over two = 0.5
        assert_eq!(result.violating_groups.len(), 2);
        assert!((result.violating_groups[0].observed - 0.5).abs() < 1e-12);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.detail["distances"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_numeric_attribute_is_treated_by_value() {
        let table = Table::new(vec![
            Column::categorical("ZIP", ["A", "A", "B", "B"]),
            Column::numeric("Salary", [50_000.0, 60_000.0, 50_000.0, 60_000.0]),
        ])
        .expect("Valid table");
        let result = check_t_closeness(&table, &build(&table, &["ZIP"]), "Salary", 0.0)
            .expect("Valid t");
        assert!(result.satisfied);
    }

    #[test]
    fn test_t_out_of_range() {
        let table = Table::new(vec![Column::categorical("Dx", ["Flu"])]).expect("Valid table");
        let classes = build(&table, &["Dx"]);
        for t in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                check_t_closeness(&table, &classes, "Dx", t),
                Err(PrivacyError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(vec![Column::categorical("Dx", Vec::<String>::new())])
            .expect("Valid table");
        let result = check_t_closeness(&table, &build(&table, &["Dx"]), "Dx", 0.2)
            .expect("Valid t");
        assert!(result.satisfied);
        assert_eq!(result.detail["max_distance"], serde_json::Value::Null);
    }
}
