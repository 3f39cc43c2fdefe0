//! `doctor`: preflight checks.

use anyhow::bail;
use chrono::Utc;

use loki_macie_rs::pipeline::run_preflight;
use loki_macie_rs::{AwsClients, AwsSettings};

use crate::cli::args::DoctorArgs;
use crate::cli::config_layer::load_unvalidated;
use crate::cli::display::display_preflight;

/// Run every check and fail when any of them fails
pub async fn doctor_command(args: DoctorArgs) -> anyhow::Result<()> {
    let config = load_unvalidated(&args.overrides)?;
    let clients = AwsClients::connect(AwsSettings::from_config(&config)).await;

    let report = run_preflight(
        &config,
        clients.object_store(),
        clients.classification_service(),
        Utc::now(),
    )
    .await;

    display_preflight(&report);
    if report.has_failures() {
        bail!("preflight checks failed");
    }
    Ok(())
}
