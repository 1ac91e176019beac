/*!
 * The end-to-end breakdown pipeline.
 *
 * text -> Segmenter -> RosterScanner -> ExtractionOrchestrator
 *      -> ResultMerger -> Normalizer -> BreakdownReport
 */

use log::info;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::BreakdownError;

use super::merger::{CharacterMergePolicy, ResultMerger};
use super::model::{MergedTable, Progress, SkeletonEntry};
use super::normalizer::Normalizer;
use super::oracle::ExtractionOracle;
use super::orchestrator::{ExtractionOrchestrator, ProgressCallback, RetryPolicy, RunStats};
use super::roster::RosterScanner;
use super::segmenter::Segmenter;

/// Settings of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_chunk_chars: usize,
    pub overlap_chars: usize,
    pub roster_sample_chars: usize,
    pub enable_roster_scan: bool,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Budget for roster scan and extraction together
    pub deadline: Option<Duration>,
    pub summary_max_chars: usize,
    pub character_merge: CharacterMergePolicy,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        let breakdown = &config.breakdown;
        let common = &config.oracle.common;

        Self {
            max_chunk_chars: breakdown.max_chunk_chars,
            overlap_chars: breakdown.overlap_chars,
            roster_sample_chars: breakdown.roster_sample_chars,
            enable_roster_scan: breakdown.enable_roster_scan,
            concurrency: breakdown.concurrent_requests,
            retry: RetryPolicy::new(common.retry_count, Duration::from_millis(common.retry_backoff_ms)),
            deadline: breakdown.deadline(),
            summary_max_chars: breakdown.summary_max_chars,
            character_merge: breakdown.character_merge,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct BreakdownReport {
    pub table: MergedTable,
    /// Scene headings found by the roster scan, empty when it did not run
    pub skeleton: Vec<SkeletonEntry>,
    pub stats: RunStats,
}

/// Breaks a screenplay down into a scene table
pub struct BreakdownPipeline {
    oracle: Arc<dyn ExtractionOracle>,
    options: PipelineOptions,
    segmenter: Segmenter,
    progress: Option<ProgressCallback>,
}

impl BreakdownPipeline {
    /// Create a pipeline, rejecting unusable chunk settings
    pub fn new(oracle: Arc<dyn ExtractionOracle>, options: PipelineOptions) -> Result<Self, BreakdownError> {
        let segmenter = Segmenter::new(options.max_chunk_chars, options.overlap_chars)?;
        if options.summary_max_chars == 0 {
            return Err(BreakdownError::InvalidConfig(
                "summary length cap must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            oracle,
            options,
            segmenter,
            progress: None,
        })
    }

    /// Report progress after every chunk settles
    pub fn with_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the whole pipeline on plain text
    pub async fn run(&self, text: &str) -> Result<BreakdownReport, BreakdownError> {
        if text.trim().is_empty() {
            return Err(BreakdownError::InputEmpty);
        }

        let started = Instant::now();
        let deadline = self.options.deadline.map(|budget| started + budget);

        let chunks = self.segmenter.split(text)?;

        let roster = if self.options.enable_roster_scan {
            RosterScanner::new(self.oracle.clone(), self.options.roster_sample_chars, self.options.retry)
                .scan(text, deadline)
                .await?
        } else {
            None
        };
        let (hints, skeleton) = match roster {
            Some(scan) => (scan.hints(), scan.skeleton),
            None => (Vec::new(), Vec::new()),
        };

        let orchestrator = ExtractionOrchestrator::new(
            self.oracle.clone(),
            self.options.concurrency,
            self.options.retry,
        );
        let outcome = orchestrator
            .run(&chunks, &hints, deadline, self.progress.as_ref())
            .await?;

        let merged = ResultMerger::new(self.options.character_merge).merge(&outcome.results, &skeleton);
        let table = Normalizer::new(self.options.summary_max_chars).normalize(merged);

        info!(
            "Breakdown finished in {:.1}s: {} scene(s), {} character(s)",
            started.elapsed().as_secs_f64(),
            table.scenes.len(),
            table.characters.len()
        );

        Ok(BreakdownReport {
            table,
            skeleton,
            stats: outcome.stats,
        })
    }
}
