//! CLI Argument Structures
//!
//! Command definitions for the loki-macie binary. Overrides given on the command line
//! apply to the current run only and are never written back to the configuration file.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use loki_macie_rs::core::config::{validate_wait_minutes, DEFAULT_CONFIG_FILE};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Loki chunk sensitive data scanning with Amazon Macie
#[derive(Parser)]
#[command(name = "loki-macie")]
#[command(version = VERSION)]
#[command(about = "Decode Loki chunks, stage them in S3 and scan them with Amazon Macie")]
#[command(long_about = "
Decode Loki chunk files to text, upload them under a date partition of the scan bucket,
and submit an Amazon Macie classification job over that partition. Once the job has
finished, `analyze` turns its findings into a JSON report and a text summary.

Common Usage:

  # Write a configuration template, then edit it
  loki-macie init-config

  # Check the decoder, the chunk directory, the buckets and Macie
  loki-macie doctor

  # Submit a job and return immediately
  loki-macie submit

  # Submit and wait for the job, then write the report
  loki-macie submit --wait

  # Analyze a finished job
  loki-macie analyze --job-id 0123456789abcdef --region us-east-1
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract, upload and submit a classification job
    Submit(SubmitArgs),

    /// Build the findings report of a classification job
    Analyze(AnalyzeArgs),

    /// Decode chunks to text without touching AWS
    Extract(ExtractArgs),

    /// Run preflight checks against the local setup and AWS
    Doctor(DoctorArgs),

    /// Write a configuration template
    #[command(name = "init-config")]
    InitConfig(InitConfigArgs),

    /// Validate a configuration file, optionally fixing it
    #[command(name = "validate-config")]
    ValidateConfig(ValidateConfigArgs),
}

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Configuration file plus per-run overrides
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigOverrideArgs {
    /// Configuration file path
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Loki chunk directory (default from configuration)
    #[arg(long)]
    pub chunk_dir: Option<PathBuf>,

    /// Extracted text output directory (default from configuration)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Chunk decoder executable (default from configuration)
    #[arg(long)]
    pub decoder: Option<PathBuf>,

    /// AWS region (default from configuration)
    #[arg(long)]
    pub region: Option<String>,

    /// AWS credentials profile (default from configuration)
    #[arg(long)]
    pub profile: Option<String>,

    /// Maximum wait in minutes, 1-300 (default from configuration)
    #[arg(long, value_parser = parse_wait_minutes)]
    pub max_wait: Option<u64>,

    /// Fail on configuration issues instead of prompting
    #[arg(long)]
    pub non_interactive: bool,
}

/// Arguments for `submit`
#[derive(Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrideArgs,

    /// Wait for the job to finish and write the report
    #[arg(long)]
    pub wait: bool,

    /// Directory for the report written by `--wait`
    #[arg(long, default_value = ".")]
    pub report_dir: PathBuf,

    /// Print the submission summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `analyze`
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Classification job id
    #[arg(long)]
    pub job_id: String,

    /// Report file (`*.json`) or directory
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// AWS region
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// AWS credentials profile
    #[arg(long)]
    pub profile: Option<String>,

    /// Configuration file; when given, the report is republished to its results bucket
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Arguments for `extract`
#[derive(Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrideArgs,
}

/// Arguments for `doctor`
#[derive(Args)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrideArgs,
}

/// Arguments for `init-config`
#[derive(Args)]
pub struct InitConfigArgs {
    /// Output configuration file name
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub output: PathBuf,

    /// Overwrite existing configuration file
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for `validate-config`
#[derive(Args)]
pub struct ValidateConfigArgs {
    /// Configuration file to validate
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Correct the configuration and save it
    #[arg(long)]
    pub fix: bool,

    /// Region to use when fixing (prompts when absent)
    #[arg(long, requires = "fix")]
    pub region: Option<String>,

    /// Scan bucket to use when fixing
    #[arg(long, requires = "fix")]
    pub scan_bucket: Option<String>,

    /// Results bucket to use when fixing
    #[arg(long, requires = "fix")]
    pub results_bucket: Option<String>,

    /// Max wait in minutes to use when fixing, 1-300
    #[arg(long, requires = "fix", value_parser = parse_wait_minutes)]
    pub max_wait: Option<u64>,
}

impl ValidateConfigArgs {
    /// Whether `--fix` came with every required value, so no prompt is needed
    pub fn has_scripted_fix(&self) -> bool {
        self.missing_fix_values().is_empty()
    }

    /// Whether any fix value was given on the command line
    pub fn has_any_fix_value(&self) -> bool {
        self.region.is_some()
            || self.scan_bucket.is_some()
            || self.results_bucket.is_some()
            || self.max_wait.is_some()
    }

    /// Fix flags still needed for an unattended correction
    pub fn missing_fix_values(&self) -> Vec<&'static str> {
        [
            ("--region", self.region.is_none()),
            ("--scan-bucket", self.scan_bucket.is_none()),
            ("--results-bucket", self.results_bucket.is_none()),
        ]
        .into_iter()
        .filter_map(|(flag, missing)| missing.then_some(flag))
        .collect()
    }
}

/// `--max-wait` parser sharing the configuration's range rule
fn parse_wait_minutes(value: &str) -> Result<u64, String> {
    let minutes: u64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of minutes"))?;
    validate_wait_minutes(minutes).map_err(|err| err.to_string())?;
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_minutes_follow_the_configuration_range() {
        assert_eq!(parse_wait_minutes("1"), Ok(1));
        assert_eq!(parse_wait_minutes("300"), Ok(300));
        assert!(parse_wait_minutes("0").is_err());
        assert!(parse_wait_minutes("301").is_err());
        assert!(parse_wait_minutes("soon").is_err());
    }

    #[test]
    fn partial_fix_values_are_reported() {
        let cli = Cli::parse_from([
            "loki-macie",
            "validate-config",
            "--fix",
            "--region",
            "eu-west-1",
        ]);
        let Commands::ValidateConfig(args) = cli.command else {
            panic!("expected validate-config");
        };
        assert!(args.has_any_fix_value());
        assert!(!args.has_scripted_fix());
        assert_eq!(args.missing_fix_values(), vec!["--scan-bucket", "--results-bucket"]);
    }
}
