//! Job lifecycle: enable, submit, describe, wait.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ClassificationJob, ClassificationService, JobRequest, JobStatus, ServiceStatus};
use crate::core::errors::{PipelineError, Result};

/// Drives a [`ClassificationService`] through a job's lifecycle.
#[derive(Clone)]
pub struct ClassificationJobManager {
    service: Arc<dyn ClassificationService>,
    poll_interval: Duration,
}

impl ClassificationJobManager {
    /// Create a manager polling every `poll_interval`
    pub fn new(service: Arc<dyn ClassificationService>, poll_interval: Duration) -> Self {
        Self {
            service,
            poll_interval,
        }
    }

    /// Underlying service
    pub fn service(&self) -> &Arc<dyn ClassificationService> {
        &self.service
    }

    /// Enable the service if the probe says it is disabled.
    ///
    /// Returns the status observed before any change. Probe and enable failures are
    /// fatal.
    pub async fn ensure_enabled(&self, finding_publishing_frequency: &str) -> Result<ServiceStatus> {
        let status = self.service.session_status().await?;
        match status {
            ServiceStatus::Enabled => debug!("Classification service already enabled"),
            ServiceStatus::Disabled => {
                info!(frequency = %finding_publishing_frequency, "Enabling classification service");
                self.service.enable(finding_publishing_frequency).await?;
                info!("Classification service enabled");
            }
        }
        Ok(status)
    }

    /// Create the job. Failures are returned as-is; nothing is retried.
    pub async fn submit(&self, request: &JobRequest) -> Result<ClassificationJob> {
        info!(
            name = %request.name,
            bucket = %request.scan_bucket,
            scope = %request.scope_prefix,
            "Submitting classification job"
        );
        let job_id = self.service.create_job(request).await?;
        if job_id.is_empty() {
            return Err(PipelineError::remote(
                "macie2",
                "CreateClassificationJob",
                "no job id in response",
            ));
        }
        info!(job_id = %job_id, name = %request.name, "Classification job created");
        Ok(ClassificationJob::submitted(job_id, request, Utc::now()))
    }

    /// Single read of a job's status and statistics
    pub async fn describe(&self, job_id: &str) -> Result<ClassificationJob> {
        self.service.describe_job(job_id).await
    }

    /// Poll until the job reaches a terminal status, `max_wait` elapses, or `cancel` fires.
    ///
    /// Returns the last observed state of the job (the submitted handle when no describe
    /// succeeded). A non-terminal status in the result means completion was not
    /// confirmed. Describe failures are logged and polling continues.
    pub async fn await_terminal(
        &self,
        job: &ClassificationJob,
        max_wait: Duration,
        cancel: &CancellationToken,
    ) -> ClassificationJob {
        let deadline = Instant::now() + max_wait;
        let mut last = job.clone();

        info!(
            job_id = %job.job_id,
            max_wait_secs = max_wait.as_secs(),
            interval_secs = self.poll_interval.as_secs(),
            "Waiting for classification job"
        );

        loop {
            if cancel.is_cancelled() {
                warn!(job_id = %job.job_id, "Wait cancelled");
                return last;
            }

            let described = tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(job_id = %job.job_id, "Wait cancelled");
                    return last;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(job_id = %job.job_id, status = %last.status, "Wait budget exhausted during describe");
                    return last;
                }
                described = self.service.describe_job(&job.job_id) => described,
            };

            match described {
                Ok(mut observed) => {
                    if observed.scope_prefix.is_none() {
                        observed.scope_prefix = last.scope_prefix.take();
                    }
                    if observed.status.is_terminal() {
                        info!(job_id = %observed.job_id, status = %observed.status, "Job reached terminal status");
                        return observed;
                    }
                    if observed.status == JobStatus::Running {
                        info!(
                            job_id = %observed.job_id,
                            objects_to_process = ?observed.statistics.objects_to_process,
                            "Job running"
                        );
                    } else {
                        info!(job_id = %observed.job_id, status = %observed.status, "Job status");
                    }
                    last = observed;
                }
                Err(err) => warn!(job_id = %job.job_id, error = %err, "Describe failed, will retry"),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(job_id = %job.job_id, status = %last.status, "Wait budget exhausted");
                return last;
            }

            let pause = self.poll_interval.min(deadline - now);
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(job_id = %job.job_id, "Wait cancelled");
                    return last;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}
