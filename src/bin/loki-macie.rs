//! loki-macie CLI
//!
//! Decodes Loki chunks, stages them in S3, submits Amazon Macie classification jobs
//! and turns their findings into reports.

use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use loki_macie_rs::core::errors::PipelineError;

mod cli;

use cli::{Cli, Commands, LogFormat};

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so stdout stays parseable (`submit --json`)
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn stopped_before_remote_work(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<PipelineError>())
        .any(PipelineError::is_fatal_config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Submit(args) => cli::submit_command(args).await,
        Commands::Analyze(args) => cli::analyze_command(args).await,
        Commands::Extract(args) => cli::extract_command(args).await,
        Commands::Doctor(args) => cli::doctor_command(args).await,
        Commands::InitConfig(args) => cli::init_config(args).await,
        Commands::ValidateConfig(args) => cli::validate_config(args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "❌ Error:".red().bold(), e);
            if stopped_before_remote_work(&e) {
                eprintln!("   {}", "No AWS resources were touched.".dimmed());
            }
            ExitCode::FAILURE
        }
    }
}
