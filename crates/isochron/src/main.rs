//! isochron: resumable travel-time sampling and contour reconstruction.
//!
//! # Usage
//!
//! ```text
//! isochron [--config isochron.toml] [--verbose] <COMMAND>
//! ```
//!
//! `sample` appends measurements to the sampling log until stopped; it
//! can be killed at any moment and restarted. `status` reports where the
//! next run will resume. `contours` turns numbered point subsets into
//! closed boundary contours.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use isochron_io::{CheckpointLog, Config, ContourPipeline, EXAMPLE_CONFIG, LogSummary, SamplingLoop};

#[derive(Parser)]
#[command(name = "isochron", version)]
#[command(about = "Resumable travel-time sampling over a bounding box, and contour reconstruction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults are used if it does not exist)
    #[arg(short, long, global = true, default_value = "isochron.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample travel times, resuming from the end of the log
    Sample {
        /// Stop after this many samples instead of running forever
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Show the resume position and log statistics
    Status {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Reconstruct a contour for every subset file, highest identifier first
    Contours {
        /// Also write an SVG preview next to each contour
        #[arg(long)]
        svg: bool,
    },

    /// Print an example configuration file
    ExampleConfig,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn load_config(path: &Path) -> Result<Config> {
    let config = Config::from_file_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config in {}", path.display()))?;
    Ok(config)
}

fn print_summary(summary: &LogSummary) {
    println!("Log:         {}", summary.path.display());
    println!("Next index:  {}", summary.next_index);
    println!("Records:     {}", summary.records);
    println!("Incomplete:  {}", summary.incomplete);
    for (reference, missing) in &summary.missing_by_reference {
        println!("  {reference}: {missing} missing");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::ExampleConfig => {
            print!("{EXAMPLE_CONFIG}");
        }

        Commands::Sample { limit } => {
            let config = load_config(&cli.config)?;
            let sampling = SamplingLoop::from_config(&config.sampling, config.estimator);
            match limit {
                Some(limit) => {
                    let committed = sampling.run(Some(limit)).await.context("Sampling stopped")?;
                    info!(committed, "sampling finished");
                }
                None => {
                    let Err(e) = sampling.run_forever().await;
                    return Err(e).context("Sampling stopped");
                }
            }
        }

        Commands::Status { json } => {
            let config = load_config(&cli.config)?;
            let log = CheckpointLog::new(&config.sampling.log_file, config.sampling.schema());
            let summary = log
                .summary()
                .with_context(|| format!("Failed to read {}", log.path().display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }

        Commands::Contours { svg } => {
            let config = load_config(&cli.config)?;
            let pipeline = ContourPipeline::from_config(&config.contours).with_svg(svg);
            let ids = pipeline.discover().context("Failed to list subset files")?;
            if ids.is_empty() {
                info!(
                    dir = %config.contours.input_dir.display(),
                    "no subset files found"
                );
            }

            let outcomes = pipeline.process_all(ids);
            let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
            println!("\n=== Contours ===");
            println!("Subsets:  {}", outcomes.len());
            println!("Written:  {}", outcomes.len() - failed);
            println!("Failed:   {failed}");
            if failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
