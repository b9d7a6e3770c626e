//! carbon-forecast - command-line entry point.
//!
//! Prepares the grid dataset, grid-searches the regressor and prints
//! validation and test metrics.

use anyhow::Context;
use carbon_forecast::pipeline::{run, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "carbon-forecast", version, about = "Carbon intensity forecasting pipeline")]
struct Cli {
    /// Raw hourly grid data (delimited, with header)
    #[arg(long, default_value = "data/DK-DK2.csv")]
    data_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carbon_forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::default();

    let summary = run(&cli.data_path, &config)
        .with_context(|| format!("pipeline failed for {}", cli.data_path.display()))?;
    let report = &summary.report;

    println!(
        "Splits{}: train = {}, validation = {}, test = {}",
        if summary.from_cache { " (cached)" } else { "" },
        summary.sizes.train,
        summary.sizes.validation,
        summary.sizes.test
    );
    println!("Grid search:");
    for trial in &report.tuning.trials {
        println!(
            "  [{}] {} -> validation MSE = {:.4}",
            trial.trial.index, trial.trial.params, trial.mse
        );
    }
    println!("Best hyperparameters: {}", report.params);
    println!("Best validation MSE: {:.4}", report.tuning.best.mse);
    println!("Validation: {}", report.validation);
    println!("Test: {}", report.evaluation.metrics);
    if report.evaluation.substituted_predictions + report.evaluation.substituted_actuals > 0 {
        println!(
            "Zero-substituted cells: {} predictions, {} actuals",
            report.evaluation.substituted_predictions, report.evaluation.substituted_actuals
        );
    }

    Ok(())
}
