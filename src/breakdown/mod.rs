/*!
 * Scene breakdown of screenplays.
 *
 * This module is organized into:
 * - `model`: chunks, scenes, results and the final table
 * - `segmenter`: splitting text into bounded chunks
 * - `character`: canonical character identities
 * - `prompts` / `response`: the oracle request and its defensive parsing
 * - `oracle`: the extraction capability and its LLM-backed implementation
 * - `roster`: prefix scan for cast hints and the scene skeleton
 * - `orchestrator`: batched extraction with retries
 * - `merger` / `normalizer`: turning per-chunk results into one table
 * - `pipeline`: the end-to-end entry point
 */

pub mod character;
pub mod merger;
pub mod model;
pub mod normalizer;
pub mod oracle;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod response;
pub mod roster;
pub mod segmenter;

pub use character::CharacterKey;
pub use merger::{CharacterMergePolicy, ResultMerger};
pub use model::{Chunk, ExtractionResult, MergedTable, NormalizedScene, Progress, RawScene, SceneKey, TimeCode};
pub use normalizer::Normalizer;
pub use oracle::{ExtractionOracle, LlmOracle};
pub use orchestrator::{ExtractionOrchestrator, RetryPolicy, RunStats};
pub use pipeline::{BreakdownPipeline, BreakdownReport, PipelineOptions};
pub use roster::{RosterScan, RosterScanner};
pub use segmenter::Segmenter;
