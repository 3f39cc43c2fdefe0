//! Findings aggregation and report generation.
//!
//! [`FindingsAggregator::build_report`] pages through a job's findings, summarizes
//! them, writes `detailed_macie_analysis_<stamp>.json` plus a `_summary.txt` rendered
//! from the same report, and optionally republishes the JSON under
//! `loki-analysis/{YYYY/MM/DD}/` in the results bucket.
//!
//! Describe, list and get failures degrade the report instead of aborting: whatever
//! was gathered is written, with the failures listed under `warnings`.

pub mod analysis;
pub mod error;
pub mod findings;
pub mod recommendations;
pub mod summary;

pub use analysis::{
    summarize_file_distribution, summarize_sensitive_types, summarize_severity, FileDistribution,
    FindingsAnalysis, SeverityDistribution,
};
pub use error::ReportError;
pub use findings::Finding;
pub use recommendations::{mark_incomplete, recommend};
pub use summary::SummaryRenderer;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classification::{ClassificationJob, ClassificationService, JobStatistics};
use crate::core::errors::Result;
use crate::core::partition::DatePartition;
use crate::storage::ObjectStore;

/// Findings embedded verbatim in a report.
pub const SAMPLE_LIMIT: usize = 20;

/// Ids per `get_findings` call.
pub const GET_FINDINGS_BATCH: usize = 50;

/// File name prefix of generated reports.
pub const REPORT_FILE_PREFIX: &str = "detailed_macie_analysis";

/// Version recorded in every report.
pub const ANALYZER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Provenance of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Generation time
    pub generated_at: DateTime<Utc>,
    /// Job the report covers
    pub job_id: String,
    /// Version of this tool
    pub analyzer_version: String,
}

/// Job state at report time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Job name
    pub name: Option<String>,
    /// Job status
    pub status: Option<String>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Time of the latest run
    pub completed_at: Option<DateTime<Utc>>,
    /// Scope prefix of the job
    pub scope_prefix: Option<String>,
    /// Progress counters
    pub statistics: JobStatistics,
}

impl From<&ClassificationJob> for JobSummary {
    fn from(job: &ClassificationJob) -> Self {
        Self {
            name: Some(job.job_name.clone()).filter(|name| !name.is_empty()),
            status: Some(job.status.to_string()),
            created_at: job.created_at,
            completed_at: job.last_run_time,
            scope_prefix: job.scope_prefix.clone(),
            statistics: job.statistics.clone(),
        }
    }
}

/// The persisted analysis of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Provenance
    pub report_metadata: ReportMetadata,
    /// Job state
    pub job_summary: JobSummary,
    /// Severity and category rollups over every finding
    pub findings_analysis: FindingsAnalysis,
    /// Bucket → key → per-object counts
    pub file_distribution: FileDistribution,
    /// First findings, capped at [`SAMPLE_LIMIT`]
    #[serde(rename = "detailed_findings")]
    pub sample_findings: Vec<Finding>,
    /// Ordered recommendations
    pub recommendations: Vec<String>,
    /// Remote reads that failed while assembling the report
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AnalysisReport {
    /// Assemble a report from the full finding set.
    pub fn assemble(
        job_id: &str,
        job: Option<&ClassificationJob>,
        findings: &[Finding],
        generated_at: DateTime<Utc>,
    ) -> Self {
        let findings_analysis = FindingsAnalysis::from_findings(findings);
        let file_distribution = summarize_file_distribution(findings);
        let recommendations = recommend(&findings_analysis, &file_distribution);

        Self {
            report_metadata: ReportMetadata {
                generated_at,
                job_id: job_id.to_string(),
                analyzer_version: ANALYZER_VERSION.to_string(),
            },
            job_summary: job.map(JobSummary::from).unwrap_or_default(),
            findings_analysis,
            file_distribution,
            sample_findings: findings.iter().take(SAMPLE_LIMIT).cloned().collect(),
            recommendations,
            warnings: Vec::new(),
        }
    }

    /// Whether any remote read failed while the report was assembled
    pub fn is_incomplete(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Partition the report is republished under: job creation date, else generation date
    pub fn results_partition(&self) -> DatePartition {
        DatePartition::from_datetime(
            self.job_summary
                .created_at
                .as_ref()
                .unwrap_or(&self.report_metadata.generated_at),
        )
    }
}

/// Files and remote copy produced for a report.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    /// The report as written
    pub report: AnalysisReport,
    /// Local JSON report
    pub json_path: PathBuf,
    /// Local text summary
    pub summary_path: PathBuf,
    /// `s3://bucket/key` of the republished copy, when republishing succeeded
    pub remote_location: Option<String>,
}

/// Where reports are republished.
struct ReportPublisher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

/// Pages findings for a job and turns them into report files.
pub struct FindingsAggregator {
    service: Arc<dyn ClassificationService>,
    output_dir: PathBuf,
    file_stem: Option<String>,
    publisher: Option<ReportPublisher>,
    renderer: SummaryRenderer,
}

impl FindingsAggregator {
    /// Aggregator writing reports into `output_dir`
    pub fn new(service: Arc<dyn ClassificationService>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            service,
            output_dir: output_dir.into(),
            file_stem: None,
            publisher: None,
            renderer: SummaryRenderer::new()?,
        })
    }

    /// Use an explicit report file name stem instead of the timestamped default
    pub fn with_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.file_stem = Some(stem.into());
        self
    }

    /// Republish every report into `bucket`
    pub fn with_publisher(mut self, store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        self.publisher = Some(ReportPublisher {
            store,
            bucket: bucket.into(),
        });
        self
    }

    /// Every finding produced by `job_id`. An empty list is a valid outcome.
    pub async fn fetch_findings(&self, job_id: &str) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        self.collect_findings(job_id, &mut findings).await?;
        Ok(findings)
    }

    async fn collect_findings(&self, job_id: &str, findings: &mut Vec<Finding>) -> Result<()> {
        let mut next_token = None;
        loop {
            let page = self.service.list_finding_ids(job_id, next_token.take()).await?;
            for batch in page.ids.chunks(GET_FINDINGS_BATCH) {
                findings.extend(self.service.get_findings(batch).await?);
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        info!(job_id = %job_id, findings = findings.len(), "Fetched findings");
        Ok(())
    }

    /// Describe the job, then build and write its report.
    pub async fn build_report(&self, job_id: &str) -> Result<ReportArtifacts> {
        match self.service.describe_job(job_id).await {
            Ok(job) => self.build_report_for(job_id, Some(job), Vec::new()).await,
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "Describe failed, report will lack job details");
                self.build_report_for(job_id, None, vec![err.to_string()]).await
            }
        }
    }

    /// Build and write the report for a job already described.
    pub async fn build_report_for_job(&self, job: &ClassificationJob) -> Result<ReportArtifacts> {
        self.build_report_for(&job.job_id, Some(job.clone()), Vec::new()).await
    }

    async fn build_report_for(
        &self,
        job_id: &str,
        job: Option<ClassificationJob>,
        mut warnings: Vec<String>,
    ) -> Result<ReportArtifacts> {
        let mut findings = Vec::new();
        let collected = self.collect_findings(job_id, &mut findings).await;
        if let Err(err) = &collected {
            warn!(
                job_id = %job_id,
                gathered = findings.len(),
                error = %err,
                "Findings incomplete, reporting what was gathered"
            );
            warnings.push(err.to_string());
        }

        let generated_at = Utc::now();
        let mut report = AnalysisReport::assemble(job_id, job.as_ref(), &findings, generated_at);
        report.warnings = warnings;
        if collected.is_err() {
            mark_incomplete(&mut report.recommendations);
        }

        let json_path = self.next_report_path(&generated_at).await?;
        let summary_path = summary_path_for(&json_path);
        let json = serde_json::to_string_pretty(&report).map_err(ReportError::from)?;
        tokio::fs::write(&json_path, json.as_bytes())
            .await
            .map_err(ReportError::from)?;
        info!(path = %json_path.display(), "Report written");

        let summary = self.renderer.render(&report)?;
        tokio::fs::write(&summary_path, summary.as_bytes())
            .await
            .map_err(ReportError::from)?;
        info!(path = %summary_path.display(), "Summary written");

        let remote_location = self.republish(&report, &json_path, json.into_bytes()).await;

        Ok(ReportArtifacts {
            report,
            json_path,
            summary_path,
            remote_location,
        })
    }

    /// A report path that does not exist yet.
    async fn next_report_path(&self, generated_at: &DateTime<Utc>) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(ReportError::from)?;

        let stem = self.file_stem.clone().unwrap_or_else(|| {
            format!(
                "{REPORT_FILE_PREFIX}_{}",
                generated_at.format("%Y%m%d_%H%M%S")
            )
        });
        let mut candidate = self.output_dir.join(format!("{stem}.json"));
        let mut suffix = 1;
        while tokio::fs::try_exists(&candidate).await.map_err(ReportError::from)? {
            candidate = self.output_dir.join(format!("{stem}_{suffix}.json"));
            suffix += 1;
        }
        Ok(candidate)
    }

    async fn republish(&self, report: &AnalysisReport, json_path: &Path, body: Vec<u8>) -> Option<String> {
        let publisher = self.publisher.as_ref()?;
        let file_name = json_path.file_name()?.to_string_lossy().into_owned();
        let key = report.results_partition().results_key(&file_name);
        let metadata = BTreeMap::from([
            ("job-id".to_string(), report.report_metadata.job_id.clone()),
            ("analyzer-version".to_string(), ANALYZER_VERSION.to_string()),
        ]);

        match publisher
            .store
            .put_object(&publisher.bucket, &key, body, "application/json", &metadata)
            .await
        {
            Ok(()) => {
                let location = format!("s3://{}/{}", publisher.bucket, key);
                info!(location = %location, "Report republished");
                Some(location)
            }
            Err(err) => {
                warn!(bucket = %publisher.bucket, key = %key, error = %err, "Report republish failed");
                None
            }
        }
    }
}

/// `<report>_summary.txt` next to `<report>.json`
pub fn summary_path_for(json_path: &Path) -> PathBuf {
    let stem = json_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| REPORT_FILE_PREFIX.to_string());
    json_path.with_file_name(format!("{stem}_summary.txt"))
}
