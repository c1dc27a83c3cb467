//! # SynthLab Privacy
//!
//! Privacy analysis core for synthetic health data.
//!
//! This crate provides:
//! - Calibrated Gaussian/Laplace noise injection with (ε,δ)-DP guarantees
//! - Sequential-composition privacy budget accounting
//! - Re-identification risk auditing via k-anonymity, l-diversity and t-closeness
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types and pure algorithms (tables, budgets, metrics, reports)
//! - `ports`: Trait definitions for external collaborators (randomness)
//! - `adapters`: Concrete implementations (ChaCha20 noise, log sanitization)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Defaults and environment overrides

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{
    add_noise_to_column, add_noise_to_table, check_k_anonymity, check_l_diversity,
    check_t_closeness, comprehensive_audit, AllocationPolicy, AuditRequest, TableNoiseOptions,
};
pub use domain::{
    create_budget, estimate_sensitivity, AuditReport, BudgetReport, Column, ColumnData,
    Mechanism, MetricResult, OperationRecord, PrivacyBudget, RiskLevel, Table,
};

/// Result type for privacy core operations
pub type Result<T> = std::result::Result<T, PrivacyError>;

/// Main error type for the privacy core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PrivacyError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("Privacy budget exhausted: requested ε={requested:.6}, remaining ε={remaining:.6}")]
    BudgetExhausted { requested: f64, remaining: f64 },

    #[error("Privacy budget ledger unavailable")]
    BudgetUnavailable,
}
