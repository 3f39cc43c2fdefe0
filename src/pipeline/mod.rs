//! End-to-end run composition.
//!
//! ```text
//! extract ──► upload ──► ensure enabled ──► submit ──┬─► SubmittedJob           (Submit)
//!                                                    └─► await ──► report        (Blocking)
//! ```

pub mod preflight;

pub use preflight::{run_preflight, CheckResult, CheckStatus, PreflightReport};

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aws::macie_console_url;
use crate::classification::{
    ClassificationJob, ClassificationJobManager, ClassificationService, JobRequest, JobStatus,
};
use crate::core::config::PipelineConfig;
use crate::core::errors::{PipelineError, Result};
use crate::core::partition::{RunStamp, RESULTS_PREFIX};
use crate::extract::{ChunkDecoder, Extractor};
use crate::report::{FindingsAggregator, ReportArtifacts};
use crate::storage::{ObjectStore, PartitionedUploader};

/// Binary name used in generated follow-up commands.
pub const CLI_NAME: &str = "loki-macie";

/// How far a run goes after submitting the job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Return the job handle right after submission
    #[default]
    Submit,
    /// Wait for a terminal status, then write the report
    Blocking,
}

/// Remote collaborators and identity for a run.
#[derive(Clone)]
pub struct PipelineServices {
    /// Chunk decoder
    pub decoder: Arc<dyn ChunkDecoder>,
    /// Object store holding scan data and reports
    pub store: Arc<dyn ObjectStore>,
    /// Classification service
    pub classification: Arc<dyn ClassificationService>,
    /// Account owning the scan bucket
    pub account_id: String,
}

/// A submitted job and where to look for its results.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedJob {
    /// Job handle
    pub job: ClassificationJob,
    /// Run start time (RFC 3339)
    pub started_at: String,
    /// Chunks decoded
    pub extracted_files: usize,
    /// Objects uploaded
    pub uploaded_objects: usize,
    /// `s3://{scan}/{prefix}/{partition}/`
    pub scan_location: String,
    /// `s3://{results}/loki-analysis/{partition}/`
    pub results_location: String,
    /// Expected completion budget in minutes
    pub expected_wait_minutes: u64,
    /// Console page listing jobs
    pub console_url: String,
    /// Ready-to-run analyze command
    pub follow_up_command: String,
}

/// Result of a run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Submit mode: the job was created
    Submitted(SubmittedJob),
    /// Blocking mode: the job reached a terminal status and the report was written
    Finished {
        /// Submission details
        submitted: SubmittedJob,
        /// Terminal job state
        job: ClassificationJob,
        /// Written report
        artifacts: ReportArtifacts,
    },
    /// Blocking mode: the wait budget ran out; `job.status` is `TIMED_OUT`
    TimedOut {
        /// Submission details
        submitted: SubmittedJob,
        /// Last observed state, status replaced by `TIMED_OUT`
        job: ClassificationJob,
    },
    /// Blocking mode: the wait was interrupted
    Cancelled {
        /// Submission details
        submitted: SubmittedJob,
        /// Last observed state
        job: ClassificationJob,
    },
}

/// `loki-macie analyze` invocation for a job.
pub fn follow_up_command(job_id: &str, region: &str, profile: Option<&str>) -> String {
    let mut command = format!("{CLI_NAME} analyze --job-id {job_id} --region {region}");
    if let Some(profile) = profile {
        command.push_str(&format!(" --profile {profile}"));
    }
    command
}

/// Composes extraction, upload, submission and, in blocking mode, the report.
pub struct PipelineDriver {
    config: PipelineConfig,
    services: PipelineServices,
    report_dir: PathBuf,
}

impl PipelineDriver {
    /// Driver over a validated configuration
    pub fn new(config: PipelineConfig, services: PipelineServices, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            services,
            report_dir: report_dir.into(),
        }
    }

    fn job_manager(&self) -> ClassificationJobManager {
        ClassificationJobManager::new(
            self.services.classification.clone(),
            self.config.poll_interval(),
        )
    }

    /// Run in the requested mode.
    pub async fn run(&self, mode: ExecutionMode, stamp: &RunStamp, cancel: &CancellationToken) -> Result<RunOutcome> {
        match mode {
            ExecutionMode::Submit => Ok(RunOutcome::Submitted(self.submit(stamp).await?)),
            ExecutionMode::Blocking => self.run_blocking(stamp, cancel).await,
        }
    }

    /// Extract, upload, enable and submit. Nothing is written besides the text files.
    pub async fn submit(&self, stamp: &RunStamp) -> Result<SubmittedJob> {
        let processing = &self.config.processing;
        let s3 = &self.config.s3;
        info!(
            partition = %stamp.partition(),
            job_name = %stamp.job_name(),
            scan_bucket = %s3.scan_bucket,
            results_bucket = %s3.results_bucket,
            "Starting pipeline run"
        );

        let extractor = Extractor::new(self.services.decoder.clone(), processing.workers);
        let extracted = extractor
            .extract(&processing.chunk_directory, &processing.output_directory, stamp.started_at())
            .await?;
        if extracted.is_empty() {
            return Err(PipelineError::pipeline("extract", "no chunk was decoded"));
        }
        let extracted_files = extracted.len();

        let uploader = PartitionedUploader::new(self.services.store.clone(), processing.workers);
        let uploaded = uploader
            .upload(extracted, &s3.scan_bucket, &s3.scan_prefix, stamp)
            .await;
        if uploaded.is_empty() {
            return Err(PipelineError::pipeline("upload", "no file was uploaded"));
        }

        let manager = self.job_manager();
        manager
            .ensure_enabled(&self.config.macie.finding_publishing_frequency)
            .await?;

        let request = JobRequest::for_run(stamp, &s3.scan_bucket, &self.services.account_id, &s3.scan_prefix);
        let job = manager.submit(&request).await?;

        let region = &self.config.aws.region;
        let partition = stamp.partition();
        Ok(SubmittedJob {
            follow_up_command: follow_up_command(&job.job_id, region, self.config.profile()),
            job,
            started_at: stamp.iso_timestamp(),
            extracted_files,
            uploaded_objects: uploaded.len(),
            scan_location: format!("s3://{}/{}", s3.scan_bucket, partition.scope_prefix(&s3.scan_prefix)),
            results_location: format!("s3://{}/{}", s3.results_bucket, partition.scope_prefix(RESULTS_PREFIX)),
            expected_wait_minutes: self.config.macie.max_wait_minutes,
            console_url: macie_console_url(region),
        })
    }

    /// Submit, wait within the configured budget, and report on a terminal status.
    pub async fn run_blocking(&self, stamp: &RunStamp, cancel: &CancellationToken) -> Result<RunOutcome> {
        let submitted = self.submit(stamp).await?;
        let mut job = self
            .job_manager()
            .await_terminal(&submitted.job, self.config.max_wait(), cancel)
            .await;

        if job.status.is_terminal() {
            let aggregator = FindingsAggregator::new(self.services.classification.clone(), &self.report_dir)?
                .with_publisher(self.services.store.clone(), self.config.s3.results_bucket.clone());
            let artifacts = aggregator.build_report_for_job(&job).await?;
            return Ok(RunOutcome::Finished {
                submitted,
                job,
                artifacts,
            });
        }

        if cancel.is_cancelled() {
            warn!(job_id = %job.job_id, "Run cancelled while waiting, job keeps running remotely");
            return Ok(RunOutcome::Cancelled { submitted, job });
        }

        warn!(
            job_id = %job.job_id,
            last_status = %job.status,
            "Job not finished within the wait budget"
        );
        job.status = JobStatus::TimedOut;
        Ok(RunOutcome::TimedOut { submitted, job })
    }
}
