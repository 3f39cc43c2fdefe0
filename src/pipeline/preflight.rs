//! Read-only checks run by `doctor` before a pipeline run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classification::{ClassificationService, ServiceStatus};
use crate::core::config::PipelineConfig;
use crate::core::partition::DatePartition;
use crate::extract::{CommandDecoder, Extractor};
use crate::storage::ObjectStore;

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Check passed
    Pass,
    /// Run can proceed, but something needs attention
    Warn,
    /// Run would fail
    Fail,
}

/// A named check result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// What was checked
    pub name: String,
    /// Outcome
    pub status: CheckStatus,
    /// Details for the operator
    pub detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

/// All checks of a preflight run, in execution order
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreflightReport {
    /// Individual results
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Whether any check failed
    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    /// Result of the check named `name`
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Check the decoder, chunk directory, configuration, buckets and service state.
///
/// Nothing is written locally or remotely. Remote checks run even when local ones fail
/// so that one invocation reports everything.
pub async fn run_preflight(
    config: &PipelineConfig,
    store: Arc<dyn ObjectStore>,
    service: Arc<dyn ClassificationService>,
    today: DateTime<Utc>,
) -> PreflightReport {
    let mut checks = Vec::new();

    let decoder = CommandDecoder::new(&config.processing.decoder_path);
    checks.push(match decoder.check_available() {
        Ok(()) => CheckResult::new("decoder", CheckStatus::Pass, decoder.program().display().to_string()),
        Err(err) => CheckResult::new("decoder", CheckStatus::Fail, err.to_string()),
    });

    checks.push(match Extractor::discover_chunks(&config.processing.chunk_directory) {
        Ok(chunks) if chunks.is_empty() => CheckResult::new(
            "chunks",
            CheckStatus::Fail,
            format!("no chunk files in {}", config.processing.chunk_directory.display()),
        ),
        Ok(chunks) => CheckResult::new("chunks", CheckStatus::Pass, format!("{} chunk files", chunks.len())),
        Err(err) => CheckResult::new("chunks", CheckStatus::Fail, err.to_string()),
    });

    let issues = config.validate();
    checks.push(if issues.is_empty() {
        CheckResult::new("configuration", CheckStatus::Pass, "valid")
    } else {
        let detail = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        CheckResult::new("configuration", CheckStatus::Fail, detail)
    });

    for (name, bucket) in [
        ("scan bucket", &config.s3.scan_bucket),
        ("results bucket", &config.s3.results_bucket),
    ] {
        checks.push(match store.head_bucket(bucket).await {
            Ok(()) => CheckResult::new(name, CheckStatus::Pass, format!("s3://{bucket}")),
            Err(err) => CheckResult::new(name, CheckStatus::Fail, err.to_string()),
        });
    }

    checks.push(match service.session_status().await {
        Ok(ServiceStatus::Enabled) => CheckResult::new("macie", CheckStatus::Pass, "enabled"),
        Ok(ServiceStatus::Disabled) => CheckResult::new(
            "macie",
            CheckStatus::Warn,
            "disabled, a run will enable it",
        ),
        Err(err) => CheckResult::new("macie", CheckStatus::Fail, err.to_string()),
    });

    let scope = DatePartition::from_datetime(&today).scope_prefix(&config.s3.scan_prefix);
    checks.push(match store.list_objects(&config.s3.scan_bucket, &scope).await {
        Ok(keys) if keys.is_empty() => {
            CheckResult::new("today's partition", CheckStatus::Pass, format!("{scope} is empty"))
        }
        Ok(keys) => CheckResult::new(
            "today's partition",
            CheckStatus::Warn,
            format!("{} objects already under {scope}, a run overwrites matching keys", keys.len()),
        ),
        Err(err) => CheckResult::new("today's partition", CheckStatus::Warn, err.to_string()),
    });

    PreflightReport { checks }
}
