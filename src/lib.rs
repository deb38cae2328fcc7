//! Grabber core library.
//!
//! Turns literature search results into downloaded publisher PDFs: DOIs are
//! resolved to landing pages, a publisher-specific strategy finds the PDF
//! link, and the PDF is written next to a JSON copy of its bib record.
//! Anything that goes wrong for an item is appended to a per-run failure log.
//!
//! # Example
//!
//! ```no_run
//! use grabber_core::{Orchestrator, ResultsFile, RunConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let results = ResultsFile::load(std::path::Path::new("results.json"))?;
//! let config = RunConfig {
//!     output_dir: "papers".into(),
//!     label: "scoping".to_string(),
//!     ..RunConfig::default()
//! };
//! let report = Orchestrator::new(config)?.run(&results.results).await?;
//! println!("{} of {} saved", report.summary.written, report.summary.total);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod failure;
pub mod fetch;
pub mod orchestrator;
pub mod record;
pub mod resolver;
pub mod sidecar;
pub mod strategy;
pub mod user_agent;

pub use config::RunConfig;
pub use download::{DownloadOutcome, FailureStage, PdfFetcher};
pub use failure::{FailureCategory, FailureLogError, FailureLogger, FailureRecord, read_failure_log};
pub use fetch::{FetchError, FetchRequest, FetchResponse, Fetcher, HttpFetcher};
pub use orchestrator::{
    BatchReport, ItemReport, ItemResult, ItemState, Orchestrator, OrchestratorError,
    ResolvedTarget, RunSummary,
};
pub use record::{RecordError, ResultsFile, SearchResult};
pub use resolver::{DoiResolver, DoiTarget, ResolveError};
pub use sidecar::SidecarError;
pub use strategy::{PublisherClassifier, Strategy, StrategyKind, StrategyMiss};
