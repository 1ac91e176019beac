/*!
 * # scenebreak - scene breakdowns of screenplays with AI
 *
 * A Rust library that turns a long screenplay into a scene-by-scene
 * breakdown table (location, time of day, summary, character presence,
 * props, notes) using an LLM as the extraction oracle.
 *
 * ## Features
 *
 * - Scene-aware chunking with optional overlap at the seams
 * - A roster scan that seeds every call with the cast and rejects non-scripts early
 * - Bounded-concurrency extraction with per-chunk retries and a deadline
 * - Deterministic merging of duplicate scenes and character-name variants
 * - Providers:
 *   - Ollama (local LLM)
 *   - OpenAI API and LM Studio
 *   - Anthropic API
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `breakdown`: The breakdown pipeline:
 *   - `breakdown::segmenter`: Splitting text into chunks
 *   - `breakdown::roster`: Roster scan of the document opening
 *   - `breakdown::orchestrator`: Batched extraction with retries
 *   - `breakdown::merger`: Scene deduplication and character reconciliation
 *   - `breakdown::normalizer`: Time codes, summary caps and presence matrix
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod breakdown;
pub mod errors;
pub mod file_utils;
pub mod providers;

// Re-export main types for easier usage
pub use app_config::Config;
pub use breakdown::{BreakdownPipeline, BreakdownReport, ExtractionOracle, MergedTable, PipelineOptions};
pub use errors::{AppError, BreakdownError, ProviderError};
