//! `submit`: extract, upload and submit, optionally waiting for the report.

use std::sync::Arc;

use anyhow::bail;
use tokio_util::sync::CancellationToken;
use tracing::info;

use loki_macie_rs::core::errors::PipelineError;
use loki_macie_rs::{
    AwsClients, AwsSettings, CommandDecoder, ExecutionMode, PipelineDriver, PipelineServices,
    RunOutcome, RunStamp,
};

use crate::cli::args::SubmitArgs;
use crate::cli::config_layer::load_configuration;
use crate::cli::display::{display_report, display_submitted, display_unfinished, wait_spinner};

/// Run the pipeline in submit or blocking mode
pub async fn submit_command(args: SubmitArgs) -> anyhow::Result<()> {
    let config = load_configuration(&args.overrides)?;

    let decoder = CommandDecoder::new(&config.processing.decoder_path);
    decoder.check_available()?;

    let clients = AwsClients::connect(AwsSettings::from_config(&config)).await;
    let account_id = clients.account_id().await?;
    info!(account_id = %account_id, region = %config.aws.region, "Resolved caller identity");

    let services = PipelineServices {
        decoder: Arc::new(decoder),
        store: clients.object_store(),
        classification: clients.classification_service(),
        account_id,
    };
    let max_wait_minutes = config.macie.max_wait_minutes;
    let driver = PipelineDriver::new(config, services, &args.report_dir);
    let stamp = RunStamp::now();

    if !args.wait {
        let submitted = driver.submit(&stamp).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&submitted)?);
        } else {
            display_submitted(&submitted);
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let spinner = wait_spinner(format!(
        "Running {} and waiting up to {max_wait_minutes} minutes",
        stamp.job_name()
    ));
    let outcome = driver.run(ExecutionMode::Blocking, &stamp, &cancel).await;
    spinner.finish_and_clear();

    match outcome? {
        RunOutcome::Submitted(submitted) => display_submitted(&submitted),
        RunOutcome::Finished {
            submitted,
            artifacts,
            ..
        } => {
            display_submitted(&submitted);
            println!();
            display_report(&artifacts);
            if artifacts.report.is_incomplete() {
                bail!(
                    "report for job {} is incomplete; re-run `analyze --job-id {}`",
                    artifacts.report.report_metadata.job_id,
                    artifacts.report.report_metadata.job_id
                );
            }
        }
        RunOutcome::TimedOut { submitted, job } => {
            display_unfinished(&submitted, &job, false);
            bail!(
                "job {} did not finish within {max_wait_minutes} minutes",
                job.job_id
            );
        }
        RunOutcome::Cancelled { submitted, job } => {
            display_unfinished(&submitted, &job, true);
            return Err(PipelineError::cancelled(format!("wait for job {}", job.job_id)).into());
        }
    }

    Ok(())
}
