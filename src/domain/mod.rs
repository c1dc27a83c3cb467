//! Domain layer: Core types and pure algorithms.
//!
//! Nothing here performs I/O or owns a random source; noise draws are
//! injected through the `ports` layer.

mod budget;
mod equivalence;
mod mechanism;
pub mod metrics;
mod report;
mod sensitivity;
mod table;

pub use budget::{create_budget, BudgetReport, BudgetRequest, OperationRecord, PrivacyBudget};
pub use equivalence::{EquivalenceClass, EquivalenceClasses, GroupKey};
pub use mechanism::{Mechanism, PrivacyLevel};
pub use metrics::{AttributeResults, Metric, MetricResult, ViolatingGroup};
pub use report::{recommendation, AuditReport, RiskLevel};
pub use sensitivity::{column_sensitivity, estimate_sensitivity, ColumnSensitivity};
pub use table::{CellKey, Column, ColumnData, ColumnKind, Table};
