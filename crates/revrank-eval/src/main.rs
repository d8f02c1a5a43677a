//! Revrank Evaluation Tool
//!
//! Compares reviewer recommendation algorithms against the reviewers who
//! actually took part in each pull request.
//!
//! # Usage
//!
//! ```bash
//! # Evaluate a run file and write artifacts to evaluation_results/
//! cargo run -p revrank-eval --release -- run.json
//!
//! # Output the full report as JSON
//! cargo run -p revrank-eval --release -- run.json --json
//!
//! # Custom project name and results directory
//! cargo run -p revrank-eval --release -- run.json --project acme --results-dir out/
//! ```
//!
//! See [`input`] for the run file format.

mod config;
mod input;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use revrank_core::evaluation::{EvaluationOutcome, Evaluator};
use revrank_core::export::{to_plain_value, ExportConfig, ResultSink};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "revrank-eval", version)]
#[command(about = "Evaluate reviewer recommendation algorithms")]
struct Args {
    /// Run file with requests, reviews and algorithm results
    input: PathBuf,

    /// Project identifier for artifact names (default: from run file)
    #[arg(long)]
    project: Option<String>,

    /// Directory for result artifacts (default: $REVRANK_RESULTS_DIR or evaluation_results)
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Output the report as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Do not write result artifacts
    #[arg(long)]
    no_export: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let input = input::load_run(&args.input)?;
    let project = config::resolve_project(
        args.project.as_deref(),
        input.project.as_deref(),
        &args.input,
    );
    info!(
        project = %project,
        requests = input.requests.len(),
        algorithms = input.algorithms.len(),
        "Loaded run file"
    );

    let evaluator = Evaluator::new(input.ground_truth(), input.config.clone());

    let pb = ProgressBar::new(input.algorithms.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{msg} [{bar:40}] {pos}/{len}")?);
    pb.set_message("Algorithms");

    let outcome = evaluator.evaluate_with(&input.algorithms, |progress| {
        pb.set_message(progress.algorithm);
        pb.set_position(progress.completed as u64);
    });
    pb.finish_and_clear();

    let report = match outcome {
        EvaluationOutcome::Completed(report) => report,
        EvaluationOutcome::NothingToEvaluate { reason } => {
            eprintln!("Nothing to evaluate: {}", reason);
            return Ok(());
        }
    };

    if args.json {
        let value = to_plain_value(&report)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        report::print_report(&project, &report);
    }

    if !args.no_export {
        let results_dir = config::resolve_results_dir(args.results_dir.as_deref());
        let sink = ResultSink::new(ExportConfig::new(results_dir, project));
        let summary = sink
            .write(&report)
            .context("Failed to write evaluation artifacts")?;

        eprintln!("\nResults saved:");
        eprintln!("  Detailed JSON: {}", summary.structured.display());
        match &summary.tabular {
            Some(path) => eprintln!("  Summary CSV: {}", path.display()),
            None => eprintln!("  (CSV export not available in this build)"),
        }
    }

    Ok(())
}
