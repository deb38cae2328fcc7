//! Batch orchestrator.
//!
//! Drives every search result through DOI resolution, strategy dispatch, PDF
//! download, and persistence. Each item ends in exactly one of two states: a
//! PDF + JSON pair on disk, or one entry in a failure log. Item failures are
//! data; only setup problems (unwritable output directory, HTTP client
//! construction) abort a run.

mod item;
mod progress;
mod summary;

pub use item::{ItemReport, ItemResult, ItemState, ResolvedTarget};
pub use summary::RunSummary;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{Instrument, debug, error, field, info, info_span};

use crate::config::RunConfig;
use crate::download::{self, DownloadOutcome, FailureStage, PdfFetcher};
use crate::failure::{FailureCategory, FailureLogger};
use crate::fetch::{FetchError, FetchSettings, Fetcher, HttpFetcher, RateLimiter};
use crate::record::{Locator, SearchResult};
use crate::resolver::{DoiResolver, DoiTarget};
use crate::sidecar;
use crate::strategy::{PublisherClassifier, StrategyMiss};
use progress::BatchProgress;

/// Fatal, run-level errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot set up HTTP client: {0}")]
    Client(#[from] FetchError),

    #[error("cannot write run summary {path}: {source}")]
    Summary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a whole batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub summary: RunSummary,
    /// One report per input record, in input order.
    pub items: Vec<ItemReport>,
    pub summary_path: Option<PathBuf>,
}

/// Runs batches of search results.
pub struct Orchestrator {
    config: RunConfig,
    fetcher: Arc<dyn Fetcher>,
    resolver: DoiResolver,
    classifier: PublisherClassifier,
    pdf_fetcher: PdfFetcher,
    failures: FailureLogger,
}

impl Orchestrator {
    /// Builds the production HTTP stack from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Client`] if the HTTP client cannot be built.
    pub fn new(config: RunConfig) -> Result<Self, OrchestratorError> {
        let settings =
            FetchSettings::from_secs(config.connect_timeout_secs, config.read_timeout_secs);
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(config.rate_limit_ms)));
        let fetcher = HttpFetcher::with_rate_limiter(settings, limiter)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Builds an orchestrator on top of any [`Fetcher`].
    #[must_use]
    pub fn with_fetcher(config: RunConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let failures = FailureLogger::new(&config.output_dir, config.label.clone());
        Self {
            resolver: DoiResolver::new(Arc::clone(&fetcher)),
            classifier: PublisherClassifier::new(Arc::clone(&fetcher)),
            pdf_fetcher: PdfFetcher::new(Arc::clone(&fetcher)),
            fetcher,
            failures,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Processes every record and returns per-item reports plus a summary.
    ///
    /// # Errors
    ///
    /// Fails only if the output directory cannot be created or the requested
    /// summary cannot be written.
    pub async fn run(&self, records: &[SearchResult]) -> Result<BatchReport, OrchestratorError> {
        let output_dir = &self.config.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| OrchestratorError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;

        info!(
            items = records.len(),
            label = %self.config.label,
            concurrency = self.config.concurrency,
            "Starting batch"
        );

        let progress = BatchProgress::new(self.config.show_progress, records.len());
        let progress = &progress;
        let mut items: Vec<ItemReport> = stream::iter(records.iter().enumerate())
            .map(|(index, record)| async move {
                let pdf_name = record.pdf_file_name();
                progress.start_item(&pdf_name);
                let report = self.process_item(index, record, pdf_name).await;
                progress.finish_item();
                report
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        progress.finish();
        items.sort_by_key(|report| report.index);

        let summary = RunSummary::from_reports(&self.config.label, &items);
        info!(
            total = summary.total,
            written = summary.written,
            doi_failures = summary.doi_failures,
            pdf_failures = summary.pdf_failures,
            strategy_misses = summary.strategy_misses,
            "Batch complete"
        );

        let summary_path = if self.config.write_summary {
            Some(summary.write(output_dir)?)
        } else {
            None
        };

        Ok(BatchReport {
            summary,
            items,
            summary_path,
        })
    }

    /// Runs one record through the pipeline. Never fails; problems end up in
    /// the failure logs and the returned report.
    pub async fn process_item(
        &self,
        index: usize,
        record: &SearchResult,
        pdf_name: String,
    ) -> ItemReport {
        let span = info_span!("item", index, pdf = %pdf_name, state = field::Empty);
        let mut progress = ItemProgress::default();
        let outcome = self
            .drive(record, &pdf_name, &mut progress)
            .instrument(span.clone())
            .await;

        let result = match outcome {
            Ok(result) => {
                span.record("state", ItemState::Written.as_str());
                result
            }
            Err(Failure {
                category,
                stage,
                reason,
            }) => {
                span.record("state", ItemState::Logged.as_str());
                if let Err(e) = self
                    .failures
                    .append(category, &record.to_bib_value(), &reason)
                    .instrument(span)
                    .await
                {
                    error!(index, error = %e, "Could not write failure log entry");
                }
                ItemResult::Logged { stage, reason }
            }
        };

        ItemReport {
            index,
            pdf_name,
            target: progress.target,
            strategy_miss: progress.miss,
            result,
        }
    }

    async fn drive(
        &self,
        record: &SearchResult,
        pdf_name: &str,
        progress: &mut ItemProgress,
    ) -> Result<ItemResult, Failure> {
        let span = tracing::Span::current();
        let enter = |state: ItemState| {
            span.record("state", state.as_str());
            debug!(state = %state, "Item state");
        };
        enter(ItemState::Pending);

        enter(ItemState::DoiResolving);
        let landing_url = match record.locator(&self.config.doi_base_url) {
            Locator::Landing(url) => {
                progress.target.original_url = Some(url.clone());
                url
            }
            locator => {
                let target = match locator {
                    Locator::DoiUri(uri) => {
                        progress.target.original_url = Some(uri.clone());
                        DoiTarget::Uri(uri)
                    }
                    _ => DoiTarget::NoIdentifier,
                };
                self.resolver
                    .resolve(&target)
                    .await
                    .map_err(|e| Failure::doi(e.to_string()))?
                    .landing_url
            }
        };
        progress.target.resolved_landing_url = Some(landing_url.clone());

        enter(ItemState::StrategyDispatch);
        let dispatch = self.classifier.classify(&landing_url).await;
        progress.target.strategy_name = Some(dispatch.strategy.name);
        let (pdf_url, outcome) = if let Some(response) = dispatch.probed_pdf {
            enter(ItemState::Fetching);
            debug!("Reusing probed PDF body");
            let outcome = download::accept_response(&dispatch.url, response);
            (dispatch.url, outcome)
        } else {
            let link = dispatch
                .strategy
                .resolve_link(&dispatch.url, dispatch.landing.as_ref(), self.fetcher.as_ref())
                .await
                .map_err(|miss| Failure::pdf(FailureStage::StrategyFetch, miss.reason))?;
            progress.miss.clone_from(&link.miss);

            enter(ItemState::Fetching);
            let outcome = self.pdf_fetcher.fetch_link(&link).await;
            (link.url, outcome)
        };
        let bytes = match outcome {
            DownloadOutcome::Success { bytes, .. } => bytes,
            DownloadOutcome::Failure { stage, reason } => return Err(Failure::pdf(stage, reason)),
        };

        let pair = sidecar::save_pair(
            self.config.output_dir.clone(),
            pdf_name.to_string(),
            bytes,
            record.to_bib_value(),
        )
        .await
        .map_err(|e| Failure::pdf(FailureStage::Persist, format!("Could not save PDF: {e}")))?;
        progress.target.pdf_url = Some(pdf_url);
        info!(pdf = %pair.pdf_path.display(), "Saved PDF and metadata");

        Ok(ItemResult::Written {
            pdf_path: pair.pdf_path,
            json_path: pair.json_path,
        })
    }
}

#[derive(Default)]
struct ItemProgress {
    target: ResolvedTarget,
    miss: Option<StrategyMiss>,
}

struct Failure {
    category: FailureCategory,
    stage: FailureStage,
    reason: String,
}

impl Failure {
    fn doi(reason: String) -> Self {
        Self {
            category: FailureCategory::DoiResolution,
            stage: FailureStage::DoiResolution,
            reason,
        }
    }

    fn pdf(stage: FailureStage, reason: String) -> Self {
        Self {
            category: FailureCategory::PdfFetch,
            stage,
            reason,
        }
    }
}
