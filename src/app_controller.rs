use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::breakdown::oracle::{ExtractionOracle, LlmOracle};
use crate::breakdown::pipeline::{BreakdownPipeline, BreakdownReport, PipelineOptions};
use crate::file_utils::FileManager;

// @module: Application controller for script breakdowns

/// Suffix of breakdown output files, e.g. `ep01.breakdown.json`
pub const OUTPUT_SUFFIX: &str = "breakdown";

/// Main application controller for scene breakdowns
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Oracle shared by every file of a run
    oracle: Arc<dyn ExtractionOracle>,
    // @field: The same oracle when it is provider-backed, for connection checks
    llm: Option<Arc<LlmOracle>>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let llm = Arc::new(LlmOracle::from_config(&config.oracle)
            .context("Failed to create oracle from configuration")?);
        Ok(Self {
            config,
            oracle: llm.clone(),
            llm: Some(llm),
        })
    }

    /// Create a controller around an existing oracle
    pub fn with_oracle(config: Config, oracle: Arc<dyn ExtractionOracle>) -> Self {
        Self {
            config,
            oracle,
            llm: None,
        }
    }

    /// Check the configured provider once; an unreachable provider is only logged
    pub async fn check_connection(&self) -> bool {
        let Some(llm) = &self.llm else {
            return true;
        };

        match llm.test_connection().await {
            Ok(()) => {
                info!("Connected to {}", self.config.oracle.provider.display_name());
                true
            }
            Err(e) => {
                warn!(
                    "Could not reach {} at {}: {}",
                    self.config.oracle.provider.display_name(),
                    self.config.oracle.get_endpoint(),
                    e
                );
                false
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Default output path for an input file
    pub fn output_path_for(input_file: &Path, output_dir: &Path) -> PathBuf {
        FileManager::generate_output_path(input_file, output_dir, OUTPUT_SUFFIX, "json")
    }

    /// Break one script file down and write the report as JSON.
    ///
    /// Returns the output path, or `None` when the file was skipped because the
    /// output already exists.
    pub async fn run(&self, input_file: PathBuf, output: Option<PathBuf>, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, output, &multi_progress, force_overwrite).await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output: Option<PathBuf>,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        let start_time = Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let output_path = output.unwrap_or_else(|| {
            let output_dir = input_file.parent().unwrap_or(Path::new("."));
            Self::output_path_for(input_file, output_dir)
        });

        if output_path.exists() && !force_overwrite {
            warn!("Skipping {:?}, breakdown already exists (use -f to force overwrite)", input_file);
            return Ok(None);
        }

        let text = FileManager::read_script(input_file)?;
        let report = self.breakdown_text(&text, multi_progress).await
            .with_context(|| format!("Failed to break down {:?}", input_file))?;

        self.save_report(&report, &output_path)?;

        let stats = &report.stats;
        if stats.failed > 0 || stats.skipped > 0 {
            warn!(
                "{} of {} chunk(s) missing from the breakdown (failed: {:?}, skipped: {:?})",
                stats.failed + stats.skipped,
                stats.total,
                stats.failed_chunks,
                stats.skipped_chunks
            );
        }
        if stats.deadline_elapsed {
            warn!("Deadline elapsed, the breakdown is partial");
        }

        info!(
            "Breakdown complete in {}: {} scene(s), {} character(s) -> {:?}",
            Self::format_duration(start_time.elapsed()),
            report.table.scenes.len(),
            report.table.characters.len(),
            output_path
        );

        Ok(Some(output_path))
    }

    /// Run the pipeline on text with a chunk progress bar
    pub async fn breakdown_text(&self, text: &str, multi_progress: &MultiProgress) -> Result<BreakdownReport> {
        let progress_bar = multi_progress.add(ProgressBar::new(0));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Extracting");

        info!(
            "scenebreak: {} - {}",
            self.config.oracle.provider.display_name(),
            self.config.oracle.get_model()
        );

        let pb = progress_bar.clone();
        let pipeline = BreakdownPipeline::new(self.oracle.clone(), PipelineOptions::from_config(&self.config))?
            .with_progress(move |progress| {
                pb.set_length(progress.total as u64);
                pb.set_position(progress.completed as u64);
            });

        let result = pipeline.run(text).await;
        progress_bar.finish_and_clear();

        Ok(result?)
    }

    /// Break down every script file in a directory (recursive)
    pub async fn run_folder(&self, input_dir: PathBuf, force_overwrite: bool) -> Result<()> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let script_files = FileManager::find_script_files(&input_dir)?;
        if script_files.is_empty() {
            return Err(anyhow!("No script files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(script_files.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing files");

        let mut success_count = 0;
        let mut error_count = 0;
        let mut skip_count = 0;

        for script_file in &script_files {
            let file_name = script_file.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match self.run_with_progress(script_file, None, &multi_progress, force_overwrite).await {
                Ok(Some(_)) => success_count += 1,
                Ok(None) => skip_count += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    error_count += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        info!(
            "Folder processing completed in {}: {} processed, {} skipped, {} errors",
            Self::format_duration(start_time.elapsed()),
            success_count,
            skip_count,
            error_count
        );

        Ok(())
    }

    /// Write a report as pretty JSON
    pub fn save_report(&self, report: &BreakdownReport, output_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(report)
            .context("Failed to serialize breakdown report")?;
        FileManager::write_to_file(output_path, &json)
    }

    /// Format a duration as `1h 2m 3s`, `2m 3s` or `3.4s`
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{:.1}s", duration.as_secs_f64())
        }
    }
}
