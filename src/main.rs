//! # Query Exporter (CLI)
//!
//! Runs a single export job described by a YAML/JSON file and/or command line
//! flags, and optionally writes a JSON report of the run.

use clap::Parser;
use log::{error, info};
use query_export::config::{AppConfig, CliArgs};
use query_export::domain::export_models::JobResult;
use query_export::{DriverRegistry, RetryingExportRunner};
use serde_json::json;
use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = if let Some(config_path) = &args.config {
        match AppConfig::from_file(config_path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        }
    } else {
        AppConfig::default()
    };

    // Merge CLI overrides
    config.merge_cli(&args);

    let job = match config.to_job_config() {
        Ok(job) => job,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    // 4. Wire drivers and runner
    let drivers = Arc::new(DriverRegistry::with_default_drivers(job.prefetch_rows));
    let runner = RetryingExportRunner::new(job, drivers);

    let shutdown_flag = runner.shutdown_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, stopping after the current attempt...");
        shutdown_flag.store(true, Ordering::SeqCst);
    }) {
        error!("Failed to set signal handler: {}", e);
    }

    // 5. Run
    info!(
        "Starting export job {} ({}, retry count {})",
        runner.config().job_id,
        runner.config().row_limit,
        runner.config().retry_count
    );
    let result = runner.execute();

    if let Some(report_path) = &args.report {
        if let Err(e) = write_report(report_path, &result) {
            error!("Failed to write report {}: {}", report_path, e);
        }
    }

    if result.status == "SUCCESS" {
        info!(
            "Export finished. {} rows in {} attempt(s), {:.2}s.",
            result.rows, result.attempts, result.duration
        );
    } else {
        error!(
            "Export failed after {} attempt(s): {}",
            result.attempts,
            result.error.as_deref().unwrap_or("unknown error")
        );
        process::exit(1);
    }
}

fn write_report(path: &str, result: &JobResult) -> std::io::Result<()> {
    let report = json!({
        "generated_at": chrono::Local::now().to_rfc3339(),
        "job": result,
    });
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &report)?;
    Ok(())
}
