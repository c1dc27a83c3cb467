//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! noise injection and re-identification auditing.

mod audit;
mod noise;

pub use audit::{
    check_k_anonymity, check_l_diversity, check_t_closeness, comprehensive_audit, AuditRequest,
};
pub use noise::{add_noise_to_column, add_noise_to_table, AllocationPolicy, TableNoiseOptions};
