/*!
 * Bounded-concurrency extraction of chunks.
 *
 * Chunks are issued in batches of at most `concurrency` calls; a batch runs
 * concurrently and is awaited as a whole before the next one starts. Each
 * call walks its own retry state machine:
 *
 * ```text
 * Pending -> Attempting(n) -> Succeeded
 *                          -> NotScript
 *                          -> Retrying(n) -> Attempting(n + 1)
 *                          -> Exhausted
 * ```
 *
 * An optional deadline is checked before every batch and every attempt;
 * chunks that never get to run settle as `DeadlineElapsed`. A call that
 * already failed and runs out of time while backing off settles as
 * `Exhausted` with its last error.
 */

use futures::future::join_all;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::BreakdownError;

use super::model::{Chunk, ExtractionResult, Progress};
use super::oracle::ExtractionOracle;
use super::prompts::{ExtractionRequest, RequestKind};
use super::response::{parse_reply, OracleReply};

/// Callback notified after every chunk settles
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Retry budget of a single oracle call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before retry n is `backoff_base * n`
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Total number of attempts a call may make
    pub fn max_attempts(&self) -> u32 {
        1 + self.max_retries
    }

    /// Delay after the given failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// State of one oracle call
#[derive(Debug, Clone)]
pub enum ChunkState {
    Pending,
    /// Attempt n is about to be made
    Attempting(u32),
    /// Attempt n failed with the given error and another one is allowed
    Retrying(u32, BreakdownError),
    Succeeded(ExtractionResult),
    NotScript(String),
    /// The last error once every attempt failed
    Exhausted(BreakdownError),
    DeadlineElapsed,
}

impl ChunkState {
    /// Whether the call has reached a final state
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            Self::Succeeded(_) | Self::NotScript(_) | Self::Exhausted(_) | Self::DeadlineElapsed
        )
    }
}

/// Final state of one call together with the attempts it took
#[derive(Debug, Clone)]
pub struct ChunkReport {
    pub index: usize,
    pub attempts: u32,
    pub state: ChunkState,
}

/// Counters of an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Chunks that exhausted their retries
    pub failed_chunks: Vec<usize>,
    /// Chunks skipped as non-script or cut off by the deadline
    pub skipped_chunks: Vec<usize>,
    pub deadline_elapsed: bool,
}

/// Successful results of a run, ordered by chunk index
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub results: Vec<ExtractionResult>,
    pub stats: RunStats,
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Drive one request through the retry state machine until it settles
pub async fn call_with_retries(
    oracle: &dyn ExtractionOracle,
    request: &ExtractionRequest,
    policy: RetryPolicy,
    deadline: Option<Instant>,
) -> ChunkReport {
    let (index, label) = match request.kind {
        RequestKind::Roster => (0, "roster scan".to_string()),
        RequestKind::Chunk(index) => (index, format!("chunk {}", index)),
    };

    let mut attempts = 0;
    let mut state = ChunkState::Pending;

    while !state.is_settled() {
        state = match state {
            ChunkState::Pending => ChunkState::Attempting(1),

            ChunkState::Retrying(attempt, last_error) => {
                let delay = policy.delay_after(attempt);
                let delay = deadline.map_or(delay, |d| delay.min(d.saturating_duration_since(Instant::now())));
                tokio::time::sleep(delay).await;

                if deadline_passed(deadline) {
                    error!("Deadline elapsed while {} was backing off: {}", label, last_error);
                    ChunkState::Exhausted(last_error)
                } else {
                    ChunkState::Attempting(attempt + 1)
                }
            }

            ChunkState::Attempting(attempt) => {
                if deadline_passed(deadline) {
                    warn!("Deadline elapsed before attempt {} of {}", attempt, label);
                    ChunkState::DeadlineElapsed
                } else {
                    attempts = attempt;
                    debug!("Attempt {}/{} for {}", attempt, policy.max_attempts(), label);

                    let reply = match oracle.extract(request).await {
                        Ok(raw) => parse_reply(index, &raw),
                        Err(e) => Err(BreakdownError::from(e)),
                    };

                    match reply {
                        Ok(OracleReply::Extracted(result)) => ChunkState::Succeeded(result),
                        Ok(OracleReply::NotScript { message }) => ChunkState::NotScript(message),
                        Err(e) if e.is_retryable() && attempt < policy.max_attempts() => {
                            warn!("Attempt {} for {} failed: {}, retrying", attempt, label, e);
                            ChunkState::Retrying(attempt, e)
                        }
                        Err(e) => {
                            error!("Giving up on {} after {} attempt(s): {}", label, attempt, e);
                            ChunkState::Exhausted(e)
                        }
                    }
                }
            }

            settled => settled,
        };
    }

    ChunkReport {
        index,
        attempts,
        state,
    }
}

/// Runs extraction calls for every chunk
pub struct ExtractionOrchestrator {
    oracle: Arc<dyn ExtractionOracle>,
    concurrency: usize,
    retry: RetryPolicy,
}

impl ExtractionOrchestrator {
    pub fn new(oracle: Arc<dyn ExtractionOracle>, concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            oracle,
            concurrency: concurrency.max(1),
            retry,
        }
    }

    /// Extract every chunk, tolerating per-chunk failures.
    ///
    /// Fails with `NotAScript` when chunk 0 is classified as non-script (no
    /// later batch is issued) and with `AllChunksFailed` when no chunk succeeds.
    pub async fn run(
        &self,
        chunks: &[Chunk],
        hints: &[String],
        deadline: Option<Instant>,
        progress: Option<&ProgressCallback>,
    ) -> Result<ExtractionOutcome, BreakdownError> {
        let total = chunks.len();
        let completed = AtomicUsize::new(0);
        let accumulator: Mutex<Vec<ChunkReport>> = Mutex::new(Vec::with_capacity(total));

        let settle = |report: ChunkReport| {
            accumulator.lock().push(report);
            let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(callback) = progress {
                callback(Progress { completed: current, total });
            }
        };

        info!(
            "Extracting {} chunk(s), {} at a time, up to {} attempt(s) each",
            total,
            self.concurrency,
            self.retry.max_attempts()
        );

        let settle = &settle;
        let mut deadline_elapsed = false;
        let mut issued = 0;
        for batch in chunks.chunks(self.concurrency) {
            if deadline_passed(deadline) {
                deadline_elapsed = true;
                warn!("Deadline elapsed, skipping {} remaining chunk(s)", total - issued);
                for chunk in &chunks[issued..] {
                    settle(ChunkReport {
                        index: chunk.index,
                        attempts: 0,
                        state: ChunkState::DeadlineElapsed,
                    });
                }
                break;
            }

            let calls = batch.iter().map(|chunk| async move {
                let request = ExtractionRequest::chunk(chunk.index, chunk.text.clone(), hints.to_vec());
                let report = call_with_retries(self.oracle.as_ref(), &request, self.retry, deadline).await;
                settle(report);
            });
            join_all(calls).await;
            issued += batch.len();

            let first_rejected = accumulator.lock().iter().find_map(|report| match &report.state {
                ChunkState::NotScript(message) if report.index == 0 => Some(message.clone()),
                _ => None,
            });
            if let Some(message) = first_rejected {
                error!("First chunk is not a script: {}", message);
                return Err(BreakdownError::NotAScript(message));
            }
        }

        let mut reports = accumulator.into_inner();
        reports.sort_by_key(|report| report.index);

        let mut stats = RunStats {
            total,
            ..Default::default()
        };
        let mut results = Vec::with_capacity(reports.len());

        for report in reports {
            match report.state {
                ChunkState::Succeeded(result) => {
                    stats.succeeded += 1;
                    results.push(result);
                }
                ChunkState::Exhausted(_) => {
                    stats.failed += 1;
                    stats.failed_chunks.push(report.index);
                }
                ChunkState::NotScript(message) => {
                    warn!("Skipping chunk {}: not script-like ({})", report.index, message);
                    stats.skipped += 1;
                    stats.skipped_chunks.push(report.index);
                }
                ChunkState::DeadlineElapsed => {
                    deadline_elapsed = true;
                    stats.skipped += 1;
                    stats.skipped_chunks.push(report.index);
                }
                ChunkState::Pending | ChunkState::Attempting(_) | ChunkState::Retrying(..) => {
                    // call_with_retries only returns settled states
                    stats.failed += 1;
                    stats.failed_chunks.push(report.index);
                }
            }
        }
        stats.deadline_elapsed = deadline_elapsed;

        info!(
            "Extraction finished: {} succeeded, {} failed, {} skipped",
            stats.succeeded, stats.failed, stats.skipped
        );

        if stats.succeeded == 0 {
            return Err(BreakdownError::AllChunksFailed {
                total,
                failed: stats.failed,
                skipped: stats.skipped,
            });
        }

        Ok(ExtractionOutcome { results, stats })
    }
}
