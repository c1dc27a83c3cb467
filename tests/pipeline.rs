//! End-to-end runs over the public API.

use std::sync::Arc;
use std::thread;

use synthlab_privacy::adapters::ChaChaNoise;
use synthlab_privacy::config::AuditConfig;
use synthlab_privacy::{
    add_noise_to_column, add_noise_to_table, comprehensive_audit, create_budget,
    estimate_sensitivity, AllocationPolicy, AuditRequest, Column, Mechanism, PrivacyError,
    RiskLevel, Table, TableNoiseOptions,
};

fn demo_table() -> Table {
    Table::new(vec![
        Column::numeric("Age", [25.0, 25.0, 25.0, 30.0, 30.0, 30.0, 45.0, 45.0, 60.0]),
        Column::categorical("Gender", ["M", "M", "M", "F", "F", "F", "M", "M", "F"]),
        Column::categorical(
            "ZipCode",
            ["94101", "94101", "94101", "94102", "94102", "94102", "94103", "94103", "94104"],
        ),
        Column::categorical(
            "Diagnosis",
            [
                "Diabetes", "Asthma", "Healthy", "Diabetes", "Cancer", "Healthy", "Cancer",
                "Cancer", "Diabetes",
            ],
        ),
        Column::numeric(
            "Salary",
            [50000.0, 55000.0, 60000.0, 65000.0, 70000.0, 75000.0, 80000.0, 85000.0, 90000.0],
        ),
    ])
    .expect("Valid table")
}

#[test]
fn test_demo_audit_is_critical() {
    let request = AuditRequest::new(["Age", "Gender", "ZipCode"], ["Diagnosis", "Salary"])
        .with_config(AuditConfig::default());
    let report = comprehensive_audit(&demo_table(), &request).expect("Audit should run");

    // (45, M, 94103) has two rows and (60, F, 94104) one.
    let k = &report.k_anonymity;
    assert!(!k.satisfied);
    assert_eq!(k.violating_groups.len(), 2);
    assert_eq!(k.records_at_risk(), 3);
    assert!((k.score - 6.0 / 9.0).abs() < 1e-12);
    assert_eq!(k.detail["unique_records"], 1);

    // Both Diagnosis in (45, M, 94103) are Cancer; Salary is unique per row.
    let diagnosis = report.l_diversity.get("Diagnosis").expect("Diagnosis checked");
    assert!(!diagnosis.satisfied);
    assert!(report.l_diversity.get("Salary").is_some_and(|r| r.violating_groups.len() == 1));

    assert!(!report.t_closeness.satisfied);
    assert_eq!(report.metrics_satisfied, 0);
    assert_eq!(report.risk_level, RiskLevel::Critical);

    let json = serde_json::to_value(&report).expect("Report serializes");
    assert_eq!(json["risk_level"], "CRITICAL");
    assert_eq!(json["k_anonymity"]["violating_groups"][1]["key"][0], 60.0);
}

#[test]
fn test_noise_then_audit() {
    let table = demo_table();
    let budget = create_budget(1.0, 1e-5, Mechanism::Gaussian).expect("Valid budget");
    let mut noise = ChaChaNoise::from_seed([42u8; 32]);

    let options = TableNoiseOptions::default()
        .with_allocation(AllocationPolicy::SensitivityProportional)
        .with_sensitivity("Age", 100.0);
    let (noisy, records) =
        add_noise_to_table(&table, &budget, &options, &mut noise).expect("Should add noise");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sensitivity, 100.0);
    assert_eq!(records[1].sensitivity, 40000.0);
    assert!((budget.epsilon_used() - 1.0).abs() < 1e-9);

    // Noised ages are continuous, so every QI tuple becomes unique.
    let request = AuditRequest::new(["Age", "Gender", "ZipCode"], ["Diagnosis"]);
    let report = comprehensive_audit(&noisy, &request).expect("Audit should run");
    assert_eq!(report.k_anonymity.violating_groups.len(), 9);
    assert_eq!(report.k_anonymity.score, 0.0);

    let budget_report = budget.report().expect("Report should build");
    assert_eq!(budget_report.operations.len(), 2);
    assert!((budget_report.utilization_percent - 100.0).abs() < 1e-6);
}

#[test]
fn test_shared_budget_across_threads() {
    let budget = Arc::new(create_budget(1.0, 0.0, Mechanism::Laplace).expect("Valid budget"));
    let column = Arc::new(Column::numeric("Glucose", [85.0, 90.0, 120.0, 140.0]));

    let handles: Vec<_> = (0..8u64)
        .map(|seed| {
            let budget = Arc::clone(&budget);
            let column = Arc::clone(&column);
            thread::spawn(move || {
                let mut noise = ChaChaNoise::seed_from_u64(seed);
                add_noise_to_column(&column, &budget, 0.25, None, &mut noise)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread should not panic"))
        .collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(PrivacyError::BudgetExhausted { .. })))
        .count();
    assert_eq!(accepted, 4);
    assert_eq!(exhausted, 4);
    assert_eq!(budget.remaining(), 0.0);
}

#[test]
fn test_sensitivity_of_demo_columns() {
    let table = demo_table();
    let salary = table.column("Salary").expect("Salary exists");
    assert_eq!(estimate_sensitivity(salary, None), Ok(40000.0));
    assert_eq!(estimate_sensitivity(salary, Some(1000.0)), Ok(1000.0));
    assert!(matches!(
        estimate_sensitivity(table.column("Gender").expect("Gender exists"), None),
        Err(PrivacyError::InvalidColumn(_))
    ));
}

#[test]
fn test_deserialized_table_audits_real_rows() {
    let json = r#"{"num_rows": 5, "columns": [
        {"name": "Age", "data": {"kind": "numeric", "values": [25.0, 25.0]}},
        {"name": "Diagnosis", "data": {"kind": "categorical", "values": ["Flu", "Cold"]}}
    ]}"#;
    let table: Table = serde_json::from_str(json).expect("Valid table");

    let request = AuditRequest::new(["Age"], ["Diagnosis"]);
    let report = comprehensive_audit(&table, &request).expect("Audit should run");
    assert_eq!(report.k_anonymity.detail["total_records"], 2);

    let ragged = r#"{"columns": [
        {"name": "Age", "data": {"kind": "numeric", "values": [25.0, 30.0, 45.0]}},
        {"name": "Glucose", "data": {"kind": "numeric", "values": [85.0]}}
    ]}"#;
    assert!(serde_json::from_str::<Table>(ragged).is_err());
}
