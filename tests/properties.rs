//! Property-based tests for the privacy core.

use proptest::prelude::*;

use synthlab_privacy::adapters::ChaChaNoise;
use synthlab_privacy::domain::{BudgetRequest, EquivalenceClasses, Metric, RiskLevel};
use synthlab_privacy::{
    add_noise_to_table, check_k_anonymity, check_t_closeness, Column, Mechanism, PrivacyBudget,
    Table, TableNoiseOptions,
};

const ZIPS: [&str; 3] = ["94101", "94102", "94103"];
const DIAGNOSES: [&str; 4] = ["Flu", "Cold", "Asthma", "Diabetes"];

type Row = (u8, u8, Option<u8>, u8);

fn rows_strategy() -> impl Strategy<Value = Vec<Row>> {
    proptest::collection::vec(
        (0..4u8, 0..3u8, proptest::option::of(0..2u8), 0..4u8),
        0..60,
    )
}

fn build_table(rows: &[Row]) -> Table {
    Table::new(vec![
        Column::numeric("Age", rows.iter().map(|r| 20.0 + 10.0 * f64::from(r.0))),
        Column::categorical("ZipCode", rows.iter().map(|r| ZIPS[r.1 as usize])),
        Column::categorical_with_missing(
            "Gender",
            rows.iter()
                .map(|r| r.2.map(|g| (if g == 0 { "M" } else { "F" }).to_string())),
        ),
        Column::categorical("Diagnosis", rows.iter().map(|r| DIAGNOSES[r.3 as usize])),
    ])
    .expect("Valid table")
}

proptest! {
    /// Every row lands in exactly one class, and rows of a class share the key.
    #[test]
    fn classes_partition_rows(rows in rows_strategy()) {
        let table = build_table(&rows);
        let classes = EquivalenceClasses::build(&table, &["Age", "ZipCode", "Gender"])
            .expect("Classes should build");

        let mut seen = vec![0usize; rows.len()];
        for class in &classes {
            prop_assert!(!class.rows.is_empty());
            for &row in &class.rows {
                seen[row] += 1;
                let (age, zip, gender, _) = rows[row];
                let (first_age, first_zip, first_gender, _) = rows[class.rows[0]];
                prop_assert_eq!((age, zip, gender), (first_age, first_zip, first_gender));
            }
        }
        prop_assert!(seen.iter().all(|&n| n == 1));
        prop_assert_eq!(classes.total_rows(), rows.len());
    }

    /// A table made of k copies of each distinct tuple is exactly k-anonymous.
    #[test]
    fn k_copies_are_k_anonymous(rows in rows_strategy(), k in 1usize..5) {
        let mut unique = rows.clone();
        unique.sort_unstable();
        unique.dedup_by_key(|r| (r.0, r.1, r.2));
        let copies: Vec<Row> = unique
            .iter()
            .flat_map(|r| std::iter::repeat(*r).take(k))
            .collect();
        let table = build_table(&copies);
        let qis = ["Age", "ZipCode", "Gender"];

        let result = check_k_anonymity(&table, &qis, k).expect("k check");
        prop_assert!(result.satisfied);
        prop_assert_eq!(result.score, 1.0);

        if !unique.is_empty() {
            let stricter = check_k_anonymity(&table, &qis, k + 1).expect("k check");
            prop_assert!(!stricter.satisfied);
            prop_assert_eq!(stricter.score, 0.0);
        }
    }

    /// Distances stay in [0, 1]; satisfaction matches the largest distance.
    #[test]
    fn t_closeness_distances_bounded(rows in rows_strategy(), t in 0.0..=1.0f64) {
        let table = build_table(&rows);
        let results = check_t_closeness(&table, &["ZipCode"], &["Diagnosis"], t)
            .expect("t check");
        prop_assert_eq!(results.metric, Metric::TCloseness);

        let result = &results.per_attribute[0];
        for group in &result.violating_groups {
            prop_assert!(group.observed > t && group.observed <= 1.0);
        }
        if let Some(max) = result.detail.get("max_distance").and_then(|v| v.as_f64()) {
            prop_assert!((0.0..=1.0).contains(&max));
            prop_assert_eq!(result.satisfied, max <= t);
        }
    }

    /// Noise preserves shape and leaves categorical columns untouched.
    #[test]
    fn noise_preserves_shape(rows in rows_strategy(), seed in any::<u64>()) {
        prop_assume!(!rows.is_empty());
        let table = build_table(&rows);
        let budget = PrivacyBudget::new(1.0, 1e-5, Mechanism::Gaussian).expect("Valid budget");
        let mut noise = ChaChaNoise::seed_from_u64(seed);

        let (noisy, records) =
            add_noise_to_table(&table, &budget, &TableNoiseOptions::default(), &mut noise)
                .expect("Should add noise");

        prop_assert_eq!(noisy.num_rows(), table.num_rows());
        prop_assert_eq!(noisy.num_columns(), table.num_columns());
        for name in ["ZipCode", "Gender", "Diagnosis"] {
            prop_assert_eq!(noisy.column(name).ok(), table.column(name).ok());
        }
        prop_assert_eq!(records.len(), 1);
        prop_assert!(budget.epsilon_used() <= budget.epsilon_total());
    }

    /// Accepted reservations sum to the spent budget; rejections change nothing.
    #[test]
    fn reserves_compose_sequentially(
        total in 0.1..10.0f64,
        epsilons in proptest::collection::vec(0.01..2.0f64, 1..40)
    ) {
        let budget = PrivacyBudget::new(total, 0.0, Mechanism::Laplace).expect("Valid budget");
        let mut accepted = 0.0;

        for (i, epsilon) in epsilons.into_iter().enumerate() {
            let before = budget.epsilon_used();
            let request = BudgetRequest {
                column_name: format!("c{i}"),
                epsilon,
                sensitivity: 1.0,
                noise_scale: 1.0 / epsilon,
            };
            match budget.reserve(request) {
                Ok(_) => accepted += epsilon,
                Err(_) => prop_assert_eq!(budget.epsilon_used(), before),
            }
            prop_assert!(budget.epsilon_used() <= total + 1e-9);
            prop_assert!((budget.epsilon_used() - accepted).abs() < 1e-6);
        }
    }

    /// More privacy budget always means less noise.
    #[test]
    fn noise_scale_decreases_in_epsilon(
        sensitivity in 0.01..1000.0f64,
        e1 in 0.01..10.0f64,
        factor in 1.01..10.0f64
    ) {
        let e2 = e1 * factor;
        for (mechanism, delta) in [(Mechanism::Gaussian, 1e-5), (Mechanism::Laplace, 0.0)] {
            let low = mechanism.noise_scale(sensitivity, e1, delta).expect("Valid scale");
            let high = mechanism.noise_scale(sensitivity, e2, delta).expect("Valid scale");
            prop_assert!(high < low);
        }
    }

    /// Satisfying more metrics never raises the risk level.
    #[test]
    fn risk_is_monotone(a in 0usize..=3, b in 0usize..=3) {
        let (fewer, more) = (a.min(b), a.max(b));
        prop_assert!(
            RiskLevel::from_metrics_satisfied(more) <= RiskLevel::from_metrics_satisfied(fewer)
        );
    }
}
