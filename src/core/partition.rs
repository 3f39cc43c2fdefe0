//! Run timestamp, date partition and object key construction.
//!
//! A run derives its date partition and job name once from its start time. Both the
//! upload prefix and the classification job scope are built from the same partition,
//! so a job only ever scans the objects its own run produced.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every generated classification job name.
pub const JOB_NAME_PREFIX: &str = "loki-analysis";

/// Key prefix under which analysis reports are republished.
pub const RESULTS_PREFIX: &str = "loki-analysis";

/// A `YYYY/MM/DD` key segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatePartition(String);

impl DatePartition {
    /// Partition for the UTC date of `timestamp`
    pub fn from_datetime(timestamp: &DateTime<Utc>) -> Self {
        Self(timestamp.format("%Y/%m/%d").to_string())
    }

    /// The raw segment
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hyphenated form for tags (`YYYY-MM-DD`)
    pub fn as_tag(&self) -> String {
        self.0.replace('/', "-")
    }

    /// Key prefix a run's objects live under: `{prefix}/{partition}/`
    pub fn scope_prefix(&self, prefix: &str) -> String {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/", self.0)
        } else {
            format!("{prefix}/{}/", self.0)
        }
    }

    /// Deterministic object key for a file in this partition
    pub fn object_key(&self, prefix: &str, file_name: &str) -> String {
        format!("{}{}", self.scope_prefix(prefix), file_name)
    }

    /// Key under which a report is republished
    pub fn results_key(&self, report_file_name: &str) -> String {
        self.object_key(RESULTS_PREFIX, report_file_name)
    }
}

impl fmt::Display for DatePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable per-run identity: start time, date partition, job name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    started_at: DateTime<Utc>,
    partition: DatePartition,
    job_name: String,
}

impl RunStamp {
    /// Stamp a run that starts now
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Stamp a run with an explicit start time
    pub fn at(started_at: DateTime<Utc>) -> Self {
        Self {
            partition: DatePartition::from_datetime(&started_at),
            job_name: format!(
                "{JOB_NAME_PREFIX}-{}",
                started_at.format("%Y%m%d-%H%M%S")
            ),
            started_at,
        }
    }

    /// Start time of the run
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Date partition of the run
    pub fn partition(&self) -> &DatePartition {
        &self.partition
    }

    /// Deterministic classification job name (`loki-analysis-YYYYMMDD-HHMMSS`)
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Start time as RFC 3339, used in file headers and object metadata
    pub fn iso_timestamp(&self) -> String {
        self.started_at.to_rfc3339()
    }

    /// Compact stamp for generated file names (`YYYYMMDD_HHMMSS`)
    pub fn file_stamp(&self) -> String {
        self.started_at.format("%Y%m%d_%H%M%S").to_string()
    }
}
