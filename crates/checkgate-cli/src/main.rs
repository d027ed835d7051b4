//! checkgate: evaluate one check against its findings.
//!
//! Exit status is 0 iff the check passed. Configuration and input problems
//! are reported as a failed check, never as a crash.

mod render;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use checkgate_core::{
    evaluate, finding::load_findings, CheckConfig, CheckMode, ClassificationResult,
    ConfigurationError, EvaluationError, OutcomeBuilder,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use render::Report;

#[derive(Parser)]
#[command(name = "checkgate", version, about = "Evaluate checks against findings and waivers")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate findings against a check config and report the result
    Evaluate {
        /// Check config (YAML)
        #[arg(long)]
        config: PathBuf,

        /// Findings file (JSON if it ends in .json, otherwise YAML)
        #[arg(long)]
        findings: PathBuf,

        /// Directory `input_files` are resolved against (default: the config's directory)
        #[arg(long)]
        base_dir: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the check mode a config selects
    Classify {
        #[arg(long)]
        config: PathBuf,
    },

    /// Validate a check config without evaluating it
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Evaluate {
            config,
            findings,
            base_dir,
            format,
            output,
        } => {
            let loaded = CheckConfig::from_yaml_file(&config);
            let base_dir = base_dir.unwrap_or_else(|| config_dir(&config));
            let result = run_evaluate(&loaded, &findings, &base_dir);
            let report = Report::new(loaded.as_ref().ok(), result);

            let rendered = match format {
                Format::Json => serde_json::to_string_pretty(&report)?,
                Format::Text => render::text(&report),
            };
            match output {
                Some(path) => fs::write(&path, rendered + "\n")?,
                None => println!("{}", rendered),
            }

            Ok(exit_code(&report.result))
        }
        Command::Classify { config } => match classify(&config) {
            Ok(mode) => {
                println!("{}", mode);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("error: {}", e);
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Validate { config } => match CheckConfig::from_yaml_file(&config) {
            Ok(_) => {
                println!("OK");
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("error: {}", e);
                for field in e.offending() {
                    eprintln!("  - {}", field);
                }
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

/// Evaluate, short-circuiting to a FAIL result on any config or input error.
fn run_evaluate(
    config: &Result<CheckConfig, ConfigurationError>,
    findings_path: &Path,
    base_dir: &Path,
) -> ClassificationResult {
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Config could not be loaded");
            return OutcomeBuilder::new().failure(&e.to_string(), &e.offending());
        }
    };

    let checked = config
        .require_inputs(base_dir)
        .map_err(EvaluationError::from)
        .and_then(|()| load_findings(findings_path).map_err(EvaluationError::from))
        .and_then(|findings| evaluate(config, &findings));

    match checked {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "Check short-circuited to FAIL");
            e.to_result()
        }
    }
}

fn classify(config: &Path) -> Result<CheckMode, ConfigurationError> {
    let config = CheckConfig::from_yaml_file(config)?;
    CheckMode::detect(&config)
}

fn config_dir(config: &Path) -> PathBuf {
    match config.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn exit_code(result: &ClassificationResult) -> ExitCode {
    if result.is_pass {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
