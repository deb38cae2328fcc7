//! CLI entry point for the grabber tool.

use anyhow::{Context, Result};
use clap::Parser;
use grabber_core::{Orchestrator, ResultsFile, RunConfig, config};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let results = ResultsFile::load(&args.results)?;

    let file_config = config::load_config(args.config.as_deref())?;
    let mut run_config = RunConfig::default();
    if let Some(file_config) = &file_config {
        run_config = run_config.with_file_config(file_config);
    }
    if let Some(label) = results.label() {
        run_config.set_label_from(label);
    } else if let Some(stem) = args.results.file_stem() {
        run_config.set_label_from(&stem.to_string_lossy());
    }
    let run_config = args.apply_to(run_config);
    run_config.validate().context("Invalid configuration")?;

    info!(
        results = %args.results.display(),
        output_dir = %run_config.output_dir.display(),
        label = %run_config.label,
        "Grabber starting"
    );

    let orchestrator = Orchestrator::new(run_config)?;
    let report = orchestrator.run(&results.results).await?;
    let summary = &report.summary;

    if !args.quiet {
        println!(
            "Saved {} of {} PDFs ({} DOI failures, {} PDF failures)",
            summary.written, summary.total, summary.doi_failures, summary.pdf_failures
        );
        if let Some(path) = &report.summary_path {
            println!("Summary written to {}", path.display());
        }
    }

    Ok(())
}
