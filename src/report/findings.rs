//! Findings as the aggregator sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detection type inside a sensitive-data category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Detection type, e.g. `AWS_CREDENTIALS` or `EMAIL_ADDRESS`
    #[serde(rename = "type")]
    pub detection_type: String,
    /// Occurrences reported for this type
    pub count: u64,
}

impl Detection {
    /// A detection whose missing or negative count is read as one occurrence.
    pub fn new(detection_type: impl Into<String>, count: Option<i64>) -> Self {
        Self {
            detection_type: detection_type.into(),
            count: count.and_then(|c| u64::try_from(c).ok()).unwrap_or(1),
        }
    }
}

/// A sensitive-data category and its detections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveDataItem {
    /// Category, e.g. `PERSONAL_INFORMATION`, `FINANCIAL_INFORMATION`, `CREDENTIALS`
    pub category: String,
    /// Detections in this category
    pub detections: Vec<Detection>,
}

/// Object a finding points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedObject {
    /// Bucket name
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Object size in bytes
    pub size: Option<i64>,
    /// Last modification time
    pub last_modified: Option<DateTime<Utc>>,
    /// Storage class
    pub storage_class: Option<String>,
}

/// A classification finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Finding id
    pub id: String,
    /// Finding type, e.g. `SensitiveData:S3Object/Personal`
    #[serde(rename = "type")]
    pub finding_type: Option<String>,
    /// Short title
    pub title: Option<String>,
    /// Severity description (`High`, `Medium`, `Low` from the service)
    pub severity: Option<String>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Sensitive-data categories found
    pub sensitive_data: Vec<SensitiveDataItem>,
    /// Affected object
    pub resource: Option<AffectedObject>,
}
