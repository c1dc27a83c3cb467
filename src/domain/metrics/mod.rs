//! Structural re-identification metrics over equivalence classes.
//!
//! Each checker tests one property of the classes and reports a
//! [`MetricResult`] with the violating groups and a coverage score
//! (fraction of rows outside violating groups).

mod k_anonymity;
mod l_diversity;
mod t_closeness;

use std::collections::BTreeMap;

use serde::Serialize;

use super::equivalence::{EquivalenceClasses, GroupKey};
use super::table::{ColumnData, Table};
use crate::{PrivacyError, Result};

pub use k_anonymity::check_k_anonymity;
pub use l_diversity::check_l_diversity;
pub use t_closeness::check_t_closeness;

/// Which structural property a result describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    KAnonymity,
    LDiversity,
    TCloseness,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KAnonymity => write!(f, "k-anonymity"),
            Self::LDiversity => write!(f, "l-diversity"),
            Self::TCloseness => write!(f, "t-closeness"),
        }
    }
}

/// An equivalence class that fails a metric.
///
/// `observed` is the class's value for the metric (size, distinct sensitive
/// values, or distance) and `deficit` how far it misses the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolatingGroup {
    pub key: GroupKey,
    pub size: usize,
    pub observed: f64,
    pub deficit: f64,
}

/// Outcome of one metric check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub metric: Metric,
    /// Sensitive attribute checked; `None` for k-anonymity.
    pub attribute: Option<String>,
    pub threshold: f64,
    pub satisfied: bool,
    pub violating_groups: Vec<ViolatingGroup>,
    pub score: f64,
    pub detail: BTreeMap<String, serde_json::Value>,
}

impl MetricResult {
    fn new(
        metric: Metric,
        attribute: Option<String>,
        threshold: f64,
        total_rows: usize,
        violating_groups: Vec<ViolatingGroup>,
    ) -> Self {
        let at_risk: usize = violating_groups.iter().map(|g| g.size).sum();
        let score = if total_rows == 0 {
            1.0
        } else {
            (total_rows - at_risk) as f64 / total_rows as f64
        };

        Self {
            metric,
            attribute,
            threshold,
            satisfied: violating_groups.is_empty(),
            violating_groups,
            score,
            detail: BTreeMap::new(),
        }
    }

    fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self
    }

    /// Number of rows in violating groups.
    #[must_use]
    pub fn records_at_risk(&self) -> usize {
        self.violating_groups.iter().map(|g| g.size).sum()
    }
}

/// Results of one metric across several sensitive attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeResults {
    pub metric: Metric,
    /// True only if every attribute satisfies the metric.
    pub satisfied: bool,
    pub per_attribute: Vec<MetricResult>,
}

impl AttributeResults {
    #[must_use]
    pub fn new(metric: Metric, per_attribute: Vec<MetricResult>) -> Self {
        Self {
            metric,
            satisfied: per_attribute.iter().all(|r| r.satisfied),
            per_attribute,
        }
    }

    /// Result for one sensitive attribute.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&MetricResult> {
        self.per_attribute
            .iter()
            .find(|r| r.attribute.as_deref() == Some(attribute))
    }
}

/// Sensitive column data, checked against the classes it will be read with.
fn sensitive_column<'a>(
    table: &'a Table,
    classes: &EquivalenceClasses,
    attribute: &str,
) -> Result<&'a ColumnData> {
    if classes.total_rows() != table.num_rows() {
        return Err(PrivacyError::InvalidParameter(format!(
            "equivalence classes cover {} rows but table has {}",
            classes.total_rows(),
            table.num_rows()
        )));
    }
    Ok(table.column(attribute)?.data())
}
