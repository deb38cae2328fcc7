//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use grabber_core::RunConfig;

/// Download the PDFs behind a literature search results file.
///
/// Each result is resolved through its DOI or URL to a publisher landing
/// page, a publisher-specific strategy finds the PDF link, and the PDF is
/// saved next to a JSON copy of its metadata. Failures are appended to
/// per-run logs under `<output>/logs/`.
#[derive(Parser, Debug)]
#[command(name = "grabber")]
#[command(author, version, about)]
pub struct Args {
    /// Search results JSON (bare array or `{metadata, results}` envelope)
    pub results: PathBuf,

    /// Output directory for PDFs, sidecars, and logs
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Run label used to name failure logs (default: results metadata label, then file stem)
    #[arg(long)]
    pub label: Option<String>,

    /// Config file (default: <config dir>/grabber/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Items processed at once (1-16)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: Option<u8>,

    /// Minimum delay between requests to the same host in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit: Option<u64>,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Read timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// DOI proxy used for bare DOIs
    #[arg(long)]
    pub doi_base_url: Option<String>,

    /// Write logs/summary_<label>.json after the run
    #[arg(long)]
    pub summary: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Applies flags that were given on top of `config`.
    #[must_use]
    pub fn apply_to(&self, mut config: RunConfig) -> RunConfig {
        if let Some(output_dir) = &self.output_dir {
            config.output_dir.clone_from(output_dir);
        }
        if let Some(label) = &self.label {
            config.label.clone_from(label);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = usize::from(concurrency);
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit_ms = rate_limit;
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout_secs = secs;
        }
        if let Some(secs) = self.read_timeout {
            config.read_timeout_secs = secs;
        }
        if let Some(url) = &self.doi_base_url {
            config.doi_base_url.clone_from(url);
        }
        if self.summary {
            config.write_summary = true;
        }
        if self.no_progress || self.quiet {
            config.show_progress = false;
        }
        config
    }
}
