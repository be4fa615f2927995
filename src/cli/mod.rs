//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command modules.

mod analyze;
mod check;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use vis_cli::config::EngineSettings;
use vis_cli::ocr::EngineKind;
use vis_cli::output::OutputFormat;
use vis_cli::services::DEFAULT_WORKERS;

#[derive(Parser)]
#[command(name = "vis")]
#[command(about = "Batch image OCR and label extraction supporting multiple OCR engines")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check for verbose flag before full parsing (used to set up logging early).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text and labels from every image under a directory
    ///
    /// Example: vis analyze ./images ./output --engine tesseract --format json
    Analyze(AnalyzeArgs),

    /// Show which OCR engines are available
    Check {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Engine selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum EngineChoice {
    /// Cloud Vision API (requires API_KEY)
    #[default]
    Vision,
    /// Local Tesseract binary
    Tesseract,
}

impl From<EngineChoice> for EngineKind {
    fn from(choice: EngineChoice) -> Self {
        match choice {
            EngineChoice::Vision => EngineKind::CloudVision,
            EngineChoice::Tesseract => EngineKind::LocalOcr,
        }
    }
}

/// Options shared by every command that constructs engines.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// OCR engine to use
    #[arg(long, value_enum, default_value_t = EngineChoice::Vision)]
    engine: EngineChoice,

    /// Cloud Vision API key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Cloud Vision annotate endpoint
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Cloud Vision request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Maximum number of labels requested from Cloud Vision
    #[arg(long, default_value_t = 5)]
    max_labels: u32,

    /// Language code(s) for Tesseract OCR
    #[arg(long, default_value = "eng")]
    lang: String,

    /// Additional Tesseract configuration options, e.g. "--psm 6"
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    tesseract_config: String,

    /// Tesseract binary name or path
    #[arg(long, default_value = "tesseract")]
    tesseract_bin: PathBuf,
}

impl EngineArgs {
    fn settings(&self) -> EngineSettings {
        EngineSettings::new(self.engine.into())
            .with_api_key(self.api_key.clone())
            .with_endpoint(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs.max(1)))
            .with_max_labels(self.max_labels)
            .with_language(self.lang.clone())
            .with_tesseract_options(self.tesseract_config.clone())
            .with_tesseract_binary(self.tesseract_bin.clone())
    }
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory containing images (searched recursively)
    input_dir: PathBuf,

    /// Directory for output files
    output_dir: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Number of images analyzed concurrently
    #[arg(short = 'j', long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => analyze::cmd_analyze(args, cli.verbose).await,
        Commands::Check { engine } => check::cmd_check(&engine.settings()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::try_parse_from([
            "vis",
            "analyze",
            "in",
            "out",
            "--engine",
            "tesseract",
            "--lang",
            "eng+deu",
            "--tesseract-config",
            "--psm 6",
            "--format",
            "jsonl",
            "-j",
            "8",
        ])
        .unwrap();

        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.input_dir, PathBuf::from("in"));
        assert_eq!(args.format, OutputFormat::Jsonl);
        assert_eq!(args.workers, 8);

        let settings = args.engine.settings();
        assert_eq!(settings.engine, EngineKind::LocalOcr);
        assert_eq!(settings.tesseract.language, "eng+deu");
        assert_eq!(settings.tesseract.options, "--psm 6");
    }
}
