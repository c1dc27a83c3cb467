//! SynthLab Privacy: demonstration run.
//!
//! Adds DP noise to a small medical dataset, audits a second one for
//! re-identification risk and prints both reports as JSON on stdout.

use anyhow::{Context, Result};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use synthlab_privacy::adapters::sanitize::SanitizingMakeWriter;
use synthlab_privacy::adapters::ChaChaNoise;
use synthlab_privacy::config::{AuditConfig, PrivacyConfig};
use synthlab_privacy::{
    add_noise_to_table, comprehensive_audit, AllocationPolicy, AuditRequest, Column, Table,
    TableNoiseOptions,
};

fn main() -> Result<()> {
    // Initialize logging.
    //
    // Reports go to stdout, so logs default to stderr:
    // - SYNTHLAB_LOG_MODE=file: append to SYNTHLAB_LOG_FILE
    // - SYNTHLAB_LOG_MODE=stdout: interleave with the reports
    let log_mode = std::env::var("SYNTHLAB_LOG_MODE").unwrap_or_else(|_| "stderr".to_string());

    let (writer, _guard) = match log_mode.as_str() {
        "file" => {
            let log_file = std::env::var("SYNTHLAB_LOG_FILE")
                .unwrap_or_else(|_| "synthlab-privacy.log".to_string());

            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                // Best-effort: don't fail startup just because the directory is missing.
                let _ = std::fs::create_dir_all(parent);
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)
                .with_context(|| format!("opening log file {log_file}"))?;
            tracing_appender::non_blocking(file)
        }
        "stdout" => tracing_appender::non_blocking(std::io::stdout()),
        _ => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting SynthLab privacy demo...");

    let noise_report = run_noise_session()?;
    let audit_report = run_audit()?;

    let output = json!({
        "differential_privacy": noise_report,
        "reidentification_audit": audit_report,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    tracing::info!("SynthLab privacy demo complete.");
    Ok(())
}

fn run_noise_session() -> Result<serde_json::Value> {
    let config = PrivacyConfig::from_env_or_default();
    let budget = config
        .create_budget()
        .context("invalid privacy configuration")?;

    let table = Table::new(vec![
        Column::numeric("Age", [25.0, 30.0, 45.0, 60.0, 75.0, 50.0, 35.0, 42.0, 55.0, 68.0]),
        Column::numeric(
            "Glucose",
            [85.0, 90.0, 120.0, 140.0, 160.0, 110.0, 95.0, 105.0, 130.0, 145.0],
        ),
        Column::numeric(
            "BloodPressure",
            [70.0, 75.0, 80.0, 85.0, 90.0, 78.0, 72.0, 82.0, 88.0, 92.0],
        ),
        Column::numeric("BMI", [22.5, 24.0, 27.5, 30.0, 32.5, 26.0, 23.5, 28.0, 29.5, 31.0]),
    ])?;

    let options =
        TableNoiseOptions::default().with_allocation(AllocationPolicy::SensitivityProportional);
    let mut noise = ChaChaNoise::from_entropy();
    let (noisy, _) = add_noise_to_table(&table, &budget, &options, &mut noise)?;

    let utility: Vec<serde_json::Value> = table
        .columns()
        .iter()
        .zip(noisy.columns())
        .filter_map(|(original, noisy)| {
            let before = mean(original.as_numeric()?)?;
            let after = mean(noisy.as_numeric()?)?;
            Some(json!({
                "column": original.name(),
                "original_mean": before,
                "noisy_mean": after,
                "difference_percent": (before - after).abs() / before.abs() * 100.0,
            }))
        })
        .collect();

    Ok(json!({
        "budget": budget.report()?,
        "utility": utility,
    }))
}

fn run_audit() -> Result<serde_json::Value> {
    let table = Table::new(vec![
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
    ])?;

    let request = AuditRequest::new(["Age", "Gender", "ZipCode"], ["Diagnosis", "Salary"])
        .with_config(AuditConfig::from_env_or_default());
    let report = comprehensive_audit(&table, &request)?;

    Ok(serde_json::to_value(report)?)
}

fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}
