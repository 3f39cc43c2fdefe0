//! Sensitive-data classification jobs.
//!
//! [`ClassificationService`] is the remote seam (Macie in production, an in-memory fake
//! in tests). [`ClassificationJobManager`] drives it: enable the service, submit a job
//! scoped to one date partition, describe it, and optionally wait for a terminal state.

pub mod macie;
pub mod manager;

pub use macie::MacieService;
pub use manager::ClassificationJobManager;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::partition::RunStamp;
use crate::report::findings::Finding;

/// Percentage of in-scope objects inspected by every job.
pub const SAMPLING_PERCENTAGE: i32 = 100;

/// Enablement state of the classification service for the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    /// Sessions exist and jobs can be submitted
    Enabled,
    /// No session for this account and region
    Disabled,
}

/// Job status as reported by the service, plus the locally synthesized `TIMED_OUT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Created locally, not yet described
    Submitted,
    /// Scanning
    Running,
    /// Paused by the service (quota)
    Paused,
    /// Recurring job between runs
    Idle,
    /// Finished
    Complete,
    /// Cancelled
    Cancelled,
    /// Paused by a user
    UserPaused,
    /// Wait budget exhausted before a terminal status was observed
    TimedOut,
    /// Any other value the service reports
    Unknown(String),
}

impl JobStatus {
    /// Wire name
    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Idle => "IDLE",
            Self::Complete => "COMPLETE",
            Self::Cancelled => "CANCELLED",
            Self::UserPaused => "USER_PAUSED",
            Self::TimedOut => "TIMED_OUT",
            Self::Unknown(other) => other,
        }
    }

    /// Parse a wire name; unrecognized names are kept verbatim.
    pub fn parse(value: &str) -> Self {
        match value {
            "SUBMITTED" => Self::Submitted,
            "RUNNING" => Self::Running,
            "PAUSED" => Self::Paused,
            "IDLE" => Self::Idle,
            "COMPLETE" => Self::Complete,
            "CANCELLED" => Self::Cancelled,
            "USER_PAUSED" => Self::UserPaused,
            "TIMED_OUT" => Self::TimedOut,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Statuses after which polling stops
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::UserPaused)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress counters of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatistics {
    /// Approximate number of objects the job will inspect
    pub objects_to_process: Option<f64>,
    /// Objects already inspected, when the service reports it
    pub objects_processed: Option<f64>,
    /// Completed runs
    pub number_of_runs: Option<f64>,
}

/// Local view of a remote classification job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationJob {
    /// Service-assigned id
    pub job_id: String,
    /// Deterministic name (`loki-analysis-YYYYMMDD-HHMMSS`)
    pub job_name: String,
    /// Last observed status
    pub status: JobStatus,
    /// Creation time reported by the service
    pub created_at: Option<DateTime<Utc>>,
    /// Time of the latest run
    pub last_run_time: Option<DateTime<Utc>>,
    /// `STARTS_WITH` key prefix the job is scoped to
    pub scope_prefix: Option<String>,
    /// Progress counters
    pub statistics: JobStatistics,
}

impl ClassificationJob {
    /// Handle for a job that was just created
    pub fn submitted(job_id: impl Into<String>, request: &JobRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            job_name: request.name.clone(),
            status: JobStatus::Submitted,
            created_at: Some(created_at),
            last_run_time: None,
            scope_prefix: Some(request.scope_prefix.clone()),
            statistics: JobStatistics::default(),
        }
    }
}

/// Everything needed to create a one-time job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Job name, also used as the idempotency token
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Bucket to scan
    pub scan_bucket: String,
    /// Account owning the bucket
    pub account_id: String,
    /// Only keys starting with this prefix are inspected
    pub scope_prefix: String,
    /// Tags attached to the job
    pub tags: BTreeMap<String, String>,
}

impl JobRequest {
    /// Request scoped to the run's partition under `prefix`.
    pub fn for_run(stamp: &RunStamp, scan_bucket: &str, account_id: &str, prefix: &str) -> Self {
        Self {
            name: stamp.job_name().to_string(),
            description: format!(
                "Loki chunk sensitive data analysis - {}",
                stamp.started_at().format("%Y-%m-%d %H:%M:%S")
            ),
            scan_bucket: scan_bucket.to_string(),
            account_id: account_id.to_string(),
            scope_prefix: stamp.partition().scope_prefix(prefix),
            tags: BTreeMap::from([
                ("Source".to_string(), "loki-chunks".to_string()),
                ("Pipeline".to_string(), "loki-macie-pipeline".to_string()),
                ("Date".to_string(), stamp.partition().as_tag()),
            ]),
        }
    }

    /// Idempotency token sent with the create call
    pub fn client_token(&self) -> &str {
        &self.name
    }
}

/// One page of finding ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingIdPage {
    /// Ids on this page
    pub ids: Vec<String>,
    /// Token for the next page, if any
    pub next_token: Option<String>,
}

/// Remote classification service operations.
#[async_trait]
pub trait ClassificationService: Send + Sync {
    /// Probe whether the service is enabled
    async fn session_status(&self) -> Result<ServiceStatus>;

    /// Enable the service with the given finding publishing frequency
    async fn enable(&self, finding_publishing_frequency: &str) -> Result<()>;

    /// Create a one-time job; returns the job id
    async fn create_job(&self, request: &JobRequest) -> Result<String>;

    /// Current status and statistics of a job
    async fn describe_job(&self, job_id: &str) -> Result<ClassificationJob>;

    /// One page of finding ids produced by `job_id`
    async fn list_finding_ids(&self, job_id: &str, next_token: Option<String>) -> Result<FindingIdPage>;

    /// Full finding records for `ids`
    async fn get_findings(&self, ids: &[String]) -> Result<Vec<Finding>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::UserPaused.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::TimedOut.is_terminal());
        assert!(!JobStatus::parse("SOMETHING_NEW").is_terminal());
    }

    #[test]
    fn status_round_trips_through_json() {
        let json = serde_json::to_string(&JobStatus::UserPaused).unwrap();
        assert_eq!(json, "\"USER_PAUSED\"");
        let parsed: JobStatus = serde_json::from_str("\"ARCHIVED\"").unwrap();
        assert_eq!(parsed, JobStatus::Unknown("ARCHIVED".to_string()));
    }

    #[test]
    fn request_is_scoped_to_the_run_partition() {
        let stamp = RunStamp::at(Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap());
        let request = JobRequest::for_run(&stamp, "scan", "123456789012", "loki-complete");

        assert_eq!(request.name, "loki-analysis-20240307-090501");
        assert_eq!(request.client_token(), request.name);
        assert_eq!(request.scope_prefix, "loki-complete/2024/03/07/");
        assert_eq!(request.tags["Date"], "2024-03-07");
        assert_eq!(request.tags["Source"], "loki-chunks");
        assert!(request.description.ends_with("2024-03-07 09:05:01"));
    }
}
