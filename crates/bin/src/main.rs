//! claimcost CLI binary.
//!
//! Runs the dataset build, training and explanation stages individually or
//! in sequence.

use claimcost::data::BuildSummary;
use claimcost::model::TrainingOutcome;
use claimcost::{ClaimCostPipeline, ExplainabilityReport, PipelineConfig};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "claimcost")]
#[command(about = "Claim-cost prediction pipeline with compliance reporting", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file (partial files override only what they name)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at DEBUG level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the analytical base table from the raw extracts
    BuildDataset,

    /// Train and evaluate the model on the ABT, then save it
    Train,

    /// Write the compliance report, summary plot and feature ranking
    Explain,

    /// Run all three stages in order
    Run,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = ClaimCostPipeline::new(config);

    match cli.command {
        Commands::BuildDataset => {
            let summary = pipeline.run_build_dataset()?;
            print_build(&summary, &pipeline);
        }
        Commands::Train => {
            let outcome = train(&pipeline)?;
            print_training(&outcome, &pipeline);
        }
        Commands::Explain => {
            let explanation = pipeline.run_explain()?;
            print_explanation(&explanation, &pipeline);
        }
        Commands::Run => {
            let summary = pipeline.run_build_dataset()?;
            print_build(&summary, &pipeline);
            let outcome = train(&pipeline)?;
            print_training(&outcome, &pipeline);
            let explanation = pipeline.run_explain()?;
            print_explanation(&explanation, &pipeline);
        }
    }

    Ok(())
}

/// Training stage with a progress bar over boosting rounds.
fn train(pipeline: &ClaimCostPipeline) -> Result<TrainingOutcome, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(pipeline.config().trainer.gbdt.n_estimators as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} trees {msg}")?
            .progress_chars("█▓░"),
    );

    match pipeline.run_train(|done, _| pb.set_position(done as u64)) {
        Ok(outcome) => {
            pb.finish_with_message("done");
            Ok(outcome)
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            Err(e.into())
        }
    }
}

fn print_build(summary: &BuildSummary, pipeline: &ClaimCostPipeline) {
    println!("\n=== Dataset ===");
    println!("Claims read:            {}", summary.input_claims);
    println!("Without policy match:   {}", summary.unmatched_claims);
    println!("Without third party:    {}", summary.claims_without_third_party);
    println!("Dropped (no target):    {}", summary.dropped_missing_target);
    println!("ABT rows:               {}", summary.output_rows);
    println!("Saved to {}", pipeline.config().paths.abt.display());
}

fn print_training(outcome: &TrainingOutcome, pipeline: &ClaimCostPipeline) {
    println!("\n=== Model ===");
    println!("Train rows: {}", outcome.split.train.len());
    println!("Test rows:  {}", outcome.split.test.len());
    println!("{}", outcome.metrics);
    println!("Saved to {}", pipeline.config().paths.model.display());
}

fn print_explanation(explanation: &ExplainabilityReport, pipeline: &ClaimCostPipeline) {
    let paths = &pipeline.config().paths;
    println!("\n=== Compliance ===");
    println!("Verdict: {}", explanation.verdict());
    for (rank, driver) in explanation.top_drivers().iter().enumerate() {
        println!("{:>2}. {}", rank + 1, driver);
    }
    println!("Report saved to {}", paths.report.display());
    println!("Summary plot saved to {}", paths.figure.display());
}
