//! Combined re-identification risk assessment.

use serde::{Deserialize, Serialize};

use super::metrics::{AttributeResults, MetricResult};

/// Overall re-identification risk, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// All metrics hold
    Low,
    /// Two of three metrics hold
    Medium,
    /// One metric holds
    High,
    /// No metric holds
    Critical,
}

impl RiskLevel {
    /// Map the number of satisfied metrics (out of three) to a risk level.
    #[must_use]
    pub fn from_metrics_satisfied(satisfied: usize) -> Self {
        match satisfied {
            0 => Self::Critical,
            1 => Self::High,
            2 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Get the recommended action for this level.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Safe to share",
            Self::Medium => "Review violations and consider regenerating with stricter parameters",
            Self::High => "Regenerate data with stronger privacy settings",
            Self::Critical => "Do not share - multiple severe privacy violations detected",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Result of a comprehensive audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub k_anonymity: MetricResult,
    pub l_diversity: AttributeResults,
    pub t_closeness: AttributeResults,
    pub metrics_satisfied: usize,
    pub risk_level: RiskLevel,
    pub recommendation: String,
}

impl AuditReport {
    #[must_use]
    pub fn new(
        k_anonymity: MetricResult,
        l_diversity: AttributeResults,
        t_closeness: AttributeResults,
    ) -> Self {
        let passed = [
            k_anonymity.satisfied,
            l_diversity.satisfied,
            t_closeness.satisfied,
        ];
        let metrics_satisfied = passed.iter().filter(|ok| **ok).count();
        let risk_level = RiskLevel::from_metrics_satisfied(metrics_satisfied);
        let recommendation = recommendation(passed[0], passed[1], passed[2]);

        Self {
            k_anonymity,
            l_diversity,
            t_closeness,
            metrics_satisfied,
            risk_level,
            recommendation,
        }
    }
}

/// Deterministic advice keyed off which metrics failed.
#[must_use]
pub fn recommendation(k_satisfied: bool, l_satisfied: bool, t_satisfied: bool) -> String {
    let satisfied = [k_satisfied, l_satisfied, t_satisfied];
    let level = RiskLevel::from_metrics_satisfied(satisfied.iter().filter(|ok| **ok).count());

    if level == RiskLevel::Low {
        return format!(
            "{}: every equivalence class meets k-anonymity, l-diversity and t-closeness",
            level.description()
        );
    }

    let mut actions = Vec::new();
    if !k_satisfied {
        actions.push("increase k by generalizing quasi-identifiers or suppressing rare combinations");
    }
    if !l_satisfied {
        actions.push("increase the number of distinct sensitive values within each equivalence class");
    }
    if !t_satisfied {
        actions.push("reduce the skew of sensitive-attribute distributions within equivalence classes");
    }

    format!("{}: {}", level.description(), actions.join("; "))
}
