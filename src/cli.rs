//! Command-line interface for codecensus.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use crate::analysis::ExtractorRegistry;
use crate::classify::{Language, LanguageKind};
use crate::config::{AnalysisConfig, ReferenceMatching};
use crate::pipeline::Pipeline;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Multi-language code census.
///
/// Builds a structural model of classes, methods and variables across Java,
/// Python, JavaScript, HTML, CSS and SCSS sources, then reports unused code,
/// class dependency cycles and coding-standard violations.
#[derive(Parser)]
#[command(name = "codecensus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a source tree
    Analyze(AnalyzeArgs),
    /// List known languages and how they are handled
    Languages,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Path to analyze (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Worker threads (default: available parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Match references on whole identifiers instead of substrings
    #[arg(long)]
    pub exact_matching: bool,

    /// Method complexity above which COMPLEX_METHOD is reported
    #[arg(long)]
    pub complexity_threshold: Option<u32>,

    /// Method length above which LONG_METHOD is reported
    #[arg(long)]
    pub method_length_threshold: Option<usize>,

    /// Class length above which CLASS_TOO_LONG is reported
    #[arg(long)]
    pub class_length_threshold: Option<usize>,

    /// Skip test directories and test files
    #[arg(long)]
    pub skip_tests: bool,

    /// Show every row in pretty output; include the full model in JSON
    #[arg(long)]
    pub details: bool,
}

impl AnalyzeArgs {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(workers) = self.workers {
            config.worker_count = Some(workers);
        }
        if self.exact_matching {
            config.reference_matching = ReferenceMatching::ExactToken;
        }
        if let Some(v) = self.complexity_threshold {
            config.complexity_threshold = v;
        }
        if let Some(v) = self.method_length_threshold {
            config.method_length_threshold = v;
        }
        if let Some(v) = self.class_length_threshold {
            config.class_length_threshold = v;
        }
        if self.skip_tests {
            config.include_tests = false;
        }
    }
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let mut config = match AnalysisConfig::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    args.apply(&mut config);

    let pipeline = match Pipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if !args.path.exists() {
        eprintln!("Error: cannot access path {:?}", args.path);
        return Ok(EXIT_ERROR);
    }

    // JSON goes to stdout untouched; keep the spinner for terminal output
    let spinner = if args.format == OutputFormat::Pretty {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(create_spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    } else {
        ProgressBar::hidden()
    };

    spinner.set_message("Discovering source files...");
    let inventory = match pipeline.inventory(&args.path) {
        Ok(i) => i,
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    spinner.set_message(format!("Analyzing {} files...", inventory.analyzable().len()));
    let report = match pipeline.analyze(inventory) {
        Ok(r) => r,
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    spinner.finish_and_clear();

    match args.format {
        OutputFormat::Json => report::write_json(&report, args.details)?,
        OutputFormat::Pretty => report::write_pretty(&report, args.details),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the languages command.
pub fn run_languages() -> anyhow::Result<i32> {
    let registry = ExtractorRegistry::default();

    println!("Structurally analyzed:");
    for language in registry.languages() {
        println!("  {}", language);
    }

    let mut tracked = Vec::new();
    let mut counted = Vec::new();
    for language in Language::ALL {
        match language.kind() {
            LanguageKind::Opaque => tracked.push(language.as_str()),
            LanguageKind::Unsupported => counted.push(language.as_str()),
            LanguageKind::Supported | LanguageKind::Unknown => {}
        }
    }

    println!();
    println!("Counted, not analyzed:");
    println!("  {}", counted.join(", "));
    println!();
    println!("Tracked by size only:");
    println!("  {}", tracked.join(", "));

    Ok(EXIT_SUCCESS)
}

fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "codecensus",
            "-vv",
            "analyze",
            "src",
            "--workers",
            "3",
            "--exact-matching",
            "--complexity-threshold",
            "12",
            "--skip-tests",
            "--format",
            "json",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.format == OutputFormat::Json);

        let mut config = AnalysisConfig::default();
        args.apply(&mut config);
        assert_eq!(config.worker_count, Some(3));
        assert_eq!(config.reference_matching, ReferenceMatching::ExactToken);
        assert_eq!(config.complexity_threshold, 12);
        assert_eq!(config.method_length_threshold, 50);
        assert!(!config.include_tests);
    }
}
