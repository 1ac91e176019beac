// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use scenebreak::app_config::{self, Config, OracleProvider};
use scenebreak::app_controller::Controller;

/// CLI Wrapper for OracleProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliOracleProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliOracleProvider> for OracleProvider {
    fn from(cli_provider: CliOracleProvider) -> Self {
        match cli_provider {
            CliOracleProvider::Ollama => OracleProvider::Ollama,
            CliOracleProvider::OpenAI => OracleProvider::OpenAI,
            CliOracleProvider::Anthropic => OracleProvider::Anthropic,
            CliOracleProvider::LMStudio => OracleProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for scenebreak
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// scenebreak - scene breakdowns of screenplays with AI
///
/// Splits a plain-text screenplay into chunks, extracts every scene with an
/// LLM provider and writes a merged breakdown table as JSON.
#[derive(Parser, Debug)]
#[command(name = "scenebreak")]
#[command(version)]
#[command(about = "AI-powered screenplay scene breakdown tool")]
#[command(long_about = "scenebreak breaks a plain-text screenplay down into a scene table using AI providers.

EXAMPLES:
    scenebreak script.txt                          # Break down using default config
    scenebreak -o out.json script.txt              # Write the table to a specific file
    scenebreak -p openai -m gpt-4o script.txt      # Use specific provider and model
    scenebreak --max-chunk-chars 4000 --overlap 200 script.txt
    scenebreak --no-roster script.txt              # Skip the roster scan
    scenebreak -f /scripts/                        # Process a whole directory
    scenebreak completions bash > scenebreak.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input script file (plain text) or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output file (single input only); defaults to <input>.breakdown.json
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Oracle provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliOracleProvider>,

    /// Model name to use
    #[arg(short, long)]
    model: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Maximum chunk size in characters
    #[arg(long)]
    max_chunk_chars: Option<usize>,

    /// Characters repeated from the previous chunk
    #[arg(long)]
    overlap: Option<usize>,

    /// Skip the roster scan
    #[arg(long)]
    no_roster: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "1;31"),
            Level::Warn => ("WARN ", "1;33"),
            Level::Info => ("INFO ", "1;32"),
            Level::Debug => ("DEBUG", "1;36"),
            Level::Trace => ("TRACE", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, color) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info by default; the level is updated once the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "scenebreak", &mut std::io::stdout());
        return Ok(());
    }

    let input_path = cli.input_path.clone().ok_or_else(|| {
        anyhow!("INPUT_PATH is required when no subcommand is specified")
    })?;

    run_breakdown(input_path, cli).await
}

/// Load the config file, or write a default one when it is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        Ok(config)
    }
}

/// Apply command line overrides on top of the loaded config
fn apply_overrides(config: &mut Config, options: &CommandLineOptions) {
    if let Some(provider) = &options.provider {
        config.oracle.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.oracle.set_model(model.clone());
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(max_chunk_chars) = options.max_chunk_chars {
        config.breakdown.max_chunk_chars = max_chunk_chars;
    }
    if let Some(overlap) = options.overlap {
        config.breakdown.overlap_chars = overlap;
    }
    if options.no_roster {
        config.breakdown.enable_roster_scan = false;
    }
}

async fn run_breakdown(input_path: PathBuf, options: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options);

    config.validate()
        .context("Configuration validation failed")?;

    log::set_max_level(level_filter(&config.log_level));

    let controller = Controller::with_config(config)?;
    controller.check_connection().await;

    if input_path.is_file() {
        controller.run(input_path, options.output, options.force_overwrite).await?;
    } else if input_path.is_dir() {
        if options.output.is_some() {
            warn!("--output is ignored when processing a directory");
        }
        controller.run_folder(input_path, options.force_overwrite).await?;
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    Ok(())
}
