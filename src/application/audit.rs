//! Re-identification audit: k-anonymity, l-diversity and t-closeness over
//! caller-chosen quasi-identifiers and sensitive attributes.

use crate::config::AuditConfig;
use crate::domain::metrics::{self, Metric};
use crate::domain::{AttributeResults, AuditReport, EquivalenceClasses, MetricResult, Table};
use crate::{PrivacyError, Result};

/// Parameters of a comprehensive audit.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRequest {
    pub quasi_identifiers: Vec<String>,
    pub sensitive_attributes: Vec<String>,
    pub k: usize,
    pub l: usize,
    pub t: f64,
}

impl AuditRequest {
    /// Create a request with the default thresholds (k=3, l=2, t=0.2).
    #[must_use]
    pub fn new<Q, S>(quasi_identifiers: Q, sensitive_attributes: S) -> Self
    where
        Q: IntoIterator,
        Q::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            quasi_identifiers: quasi_identifiers.into_iter().map(Into::into).collect(),
            sensitive_attributes: sensitive_attributes.into_iter().map(Into::into).collect(),
            k: AuditConfig::default().k,
            l: AuditConfig::default().l,
            t: AuditConfig::default().t,
        }
    }

    /// Take the thresholds from `config`.
    #[must_use]
    pub fn with_config(mut self, config: AuditConfig) -> Self {
        self.k = config.k;
        self.l = config.l;
        self.t = config.t;
        self
    }

    /// Check every parameter against `table` without computing anything.
    fn validate(&self, table: &Table) -> Result<()> {
        validate_k(self.k)?;
        validate_l(self.l)?;
        validate_t(self.t)?;
        validate_columns(table, &self.quasi_identifiers, "quasi-identifier")?;
        validate_columns(table, &self.sensitive_attributes, "sensitive attribute")
    }
}

/// Check k-anonymity of `table` under the given quasi-identifiers.
///
/// # Errors
/// Returns `InvalidParameter` for `k < 1` or an empty quasi-identifier list,
/// and `InvalidColumn` for an unknown column.
pub fn check_k_anonymity<S: AsRef<str>>(
    table: &Table,
    quasi_identifiers: &[S],
    k: usize,
) -> Result<MetricResult> {
    validate_k(k)?;
    let classes = EquivalenceClasses::build(table, quasi_identifiers)?;
    metrics::check_k_anonymity(&classes, k)
}

/// Check distinct l-diversity of each sensitive attribute.
///
/// # Errors
/// Returns `InvalidParameter` for `l < 1` or an empty column list, and
/// `InvalidColumn` for an unknown column.
pub fn check_l_diversity<Q: AsRef<str>, S: AsRef<str>>(
    table: &Table,
    quasi_identifiers: &[Q],
    sensitive_attributes: &[S],
    l: usize,
) -> Result<AttributeResults> {
    validate_l(l)?;
    validate_columns(table, sensitive_attributes, "sensitive attribute")?;
    let classes = EquivalenceClasses::build(table, quasi_identifiers)?;
    l_diversity(table, &classes, sensitive_attributes, l)
}

/// Check t-closeness of each sensitive attribute.
///
/// # Errors
/// Returns `InvalidParameter` for `t` outside [0, 1] or an empty column
/// list, and `InvalidColumn` for an unknown column.
pub fn check_t_closeness<Q: AsRef<str>, S: AsRef<str>>(
    table: &Table,
    quasi_identifiers: &[Q],
    sensitive_attributes: &[S],
    t: f64,
) -> Result<AttributeResults> {
    validate_t(t)?;
    validate_columns(table, sensitive_attributes, "sensitive attribute")?;
    let classes = EquivalenceClasses::build(table, quasi_identifiers)?;
    t_closeness(table, &classes, sensitive_attributes, t)
}

/// Run all three checks over one set of equivalence classes and combine
/// them into a risk assessment.
///
/// All parameters are validated before any metric is computed.
///
/// # Errors
/// Returns `InvalidParameter` or `InvalidColumn` for an invalid request.
pub fn comprehensive_audit(table: &Table, request: &AuditRequest) -> Result<AuditReport> {
    request.validate(table)?;
    let classes = EquivalenceClasses::build(table, &request.quasi_identifiers)?;
    let attributes = &request.sensitive_attributes;

    #[cfg(feature = "parallel")]
    let (k_result, (l_result, t_result)) = rayon::join(
        || metrics::check_k_anonymity(&classes, request.k),
        || {
            rayon::join(
                || l_diversity(table, &classes, attributes, request.l),
                || t_closeness(table, &classes, attributes, request.t),
            )
        },
    );

    #[cfg(not(feature = "parallel"))]
    let (k_result, (l_result, t_result)) = (
        metrics::check_k_anonymity(&classes, request.k),
        (
            l_diversity(table, &classes, attributes, request.l),
            t_closeness(table, &classes, attributes, request.t),
        ),
    );

    let report = AuditReport::new(k_result?, l_result?, t_result?);

    tracing::info!(
        "Audit of {} rows in {} equivalence classes: {}/3 metrics satisfied, risk {}",
        table.num_rows(),
        classes.len(),
        report.metrics_satisfied,
        report.risk_level
    );

    Ok(report)
}

fn l_diversity<S: AsRef<str>>(
    table: &Table,
    classes: &EquivalenceClasses,
    attributes: &[S],
    l: usize,
) -> Result<AttributeResults> {
    let per_attribute = attributes
        .iter()
        .map(|a| metrics::check_l_diversity(table, classes, a.as_ref(), l))
        .collect::<Result<_>>()?;
    Ok(AttributeResults::new(Metric::LDiversity, per_attribute))
}

fn t_closeness<S: AsRef<str>>(
    table: &Table,
    classes: &EquivalenceClasses,
    attributes: &[S],
    t: f64,
) -> Result<AttributeResults> {
    let per_attribute = attributes
        .iter()
        .map(|a| metrics::check_t_closeness(table, classes, a.as_ref(), t))
        .collect::<Result<_>>()?;
    Ok(AttributeResults::new(Metric::TCloseness, per_attribute))
}

fn validate_k(k: usize) -> Result<()> {
    if k < 1 {
        return Err(PrivacyError::InvalidParameter(format!(
            "k must be at least 1, got {k}"
        )));
    }
    Ok(())
}

fn validate_l(l: usize) -> Result<()> {
    if l < 1 {
        return Err(PrivacyError::InvalidParameter(format!(
            "l must be at least 1, got {l}"
        )));
    }
    Ok(())
}

fn validate_t(t: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&t) {
        return Err(PrivacyError::InvalidParameter(format!(
            "t must be in [0, 1], got {t}"
        )));
    }
    Ok(())
}

fn validate_columns<S: AsRef<str>>(table: &Table, names: &[S], what: &str) -> Result<()> {
    if names.is_empty() {
        return Err(PrivacyError::InvalidParameter(format!(
            "at least one {what} is required"
        )));
    }
    for name in names {
        table.column(name.as_ref())?;
    }
    Ok(())
}
