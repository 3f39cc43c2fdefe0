//! `analyze`: build the findings report for a finished job.

use std::path::{Path, PathBuf};

use anyhow::bail;

use loki_macie_rs::core::config::PipelineConfig;
use loki_macie_rs::report::AnalysisReport;
use loki_macie_rs::{AwsClients, AwsSettings, FindingsAggregator};

use crate::cli::args::AnalyzeArgs;
use crate::cli::display::display_report;

/// Fetch findings, write the report files and print the totals
pub async fn analyze_command(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut settings = AwsSettings::new(args.region.clone());
    if let Some(profile) = &args.profile {
        settings = settings.with_profile(profile.clone());
    }

    let results_bucket = match &args.config {
        Some(path) => {
            let config = PipelineConfig::load(path)?;
            if let Some(endpoint) = config.aws.endpoint_url {
                settings = settings.with_endpoint(endpoint);
            }
            Some(config.s3.results_bucket)
        }
        None => None,
    };

    let clients = AwsClients::connect(settings).await;
    let (dir, stem) = report_destination(args.output.as_deref());

    let mut aggregator = FindingsAggregator::new(clients.classification_service(), dir)?;
    if let Some(stem) = stem {
        aggregator = aggregator.with_file_stem(stem);
    }
    if let Some(bucket) = results_bucket {
        aggregator = aggregator.with_publisher(clients.object_store(), bucket);
    }

    let artifacts = aggregator.build_report(&args.job_id).await?;
    display_report(&artifacts);
    ensure_complete(&artifacts.report)
}

/// A report written from partial data still fails the command.
fn ensure_complete(report: &AnalysisReport) -> anyhow::Result<()> {
    if report.is_incomplete() {
        bail!(
            "report for job {} is incomplete ({} remote read(s) failed); re-run analyze",
            report.report_metadata.job_id,
            report.warnings.len()
        );
    }
    Ok(())
}

/// Split `--output` into a directory and an optional file stem.
///
/// A `.json` path names the report file; anything else is a directory.
fn report_destination(output: Option<&Path>) -> (PathBuf, Option<String>) {
    let Some(output) = output else {
        return (PathBuf::from("."), None);
    };

    let is_json = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return (output.to_path_buf(), None);
    }

    let dir = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());
    (dir, stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_output_names_the_report() {
        assert_eq!(
            report_destination(Some(Path::new("out/job.json"))),
            (PathBuf::from("out"), Some("job".to_string()))
        );
        assert_eq!(
            report_destination(Some(Path::new("job.json"))),
            (PathBuf::from("."), Some("job".to_string()))
        );
    }

    #[test]
    fn warnings_fail_the_command() {
        let mut report = AnalysisReport::assemble("job-0001", None, &[], chrono::Utc::now());
        assert!(ensure_complete(&report).is_ok());

        report.warnings.push("macie2 GetFindings failed: InternalServerException".to_string());
        let err = ensure_complete(&report).unwrap_err();
        assert!(err.to_string().contains("job-0001"));
    }

    #[test]
    fn other_output_is_a_directory() {
        assert_eq!(
            report_destination(Some(Path::new("reports"))),
            (PathBuf::from("reports"), None)
        );
        assert_eq!(report_destination(None), (PathBuf::from("."), None));
    }
}
