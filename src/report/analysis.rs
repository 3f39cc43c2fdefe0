//! Pure aggregation over a list of findings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::findings::Finding;

/// Finding counts per severity bucket.
///
/// Every finding lands in exactly one bucket, so the buckets always sum to the
/// number of findings summarized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct SeverityDistribution {
    /// `HIGH`
    pub high: u64,
    /// `MEDIUM`
    pub medium: u64,
    /// `LOW`
    pub low: u64,
    /// Missing or unrecognized severity
    pub unknown: u64,
}

impl SeverityDistribution {
    /// Sum of all buckets
    pub fn total(&self) -> u64 {
        self.high + self.medium + self.low + self.unknown
    }

    fn record(&mut self, severity: Option<&str>) {
        match severity.map(str::to_ascii_uppercase).as_deref() {
            Some("HIGH") => self.high += 1,
            Some("MEDIUM") => self.medium += 1,
            Some("LOW") => self.low += 1,
            _ => self.unknown += 1,
        }
    }
}

/// Rollup of one sensitive-data category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Findings that contain the category (once per finding)
    pub count: u64,
    /// Occurrences per detection type
    pub types: BTreeMap<String, u64>,
    /// Occurrences across all detection types
    pub total_occurrences: u64,
}

/// Per-object entry of the file distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Findings that reference the object
    pub findings_count: u64,
    /// Object size in bytes
    pub size: i64,
    /// Last modification time
    pub last_modified: Option<DateTime<Utc>>,
    /// Storage class
    pub storage_class: String,
}

/// Bucket → key → object entry.
pub type FileDistribution = BTreeMap<String, BTreeMap<String, FileSummary>>;

/// Category → rollup.
pub type SensitiveTypeSummary = BTreeMap<String, CategorySummary>;

/// Category rollup and severity distribution of a finding set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsAnalysis {
    /// Per-category rollup
    pub data_types: SensitiveTypeSummary,
    /// Per-severity counts
    pub severity_distribution: SeverityDistribution,
    /// Number of findings analyzed
    pub total_findings: u64,
}

impl FindingsAnalysis {
    /// Analyze the full finding set
    pub fn from_findings(findings: &[Finding]) -> Self {
        Self {
            data_types: summarize_sensitive_types(findings),
            severity_distribution: summarize_severity(findings),
            total_findings: findings.len() as u64,
        }
    }
}

/// Count findings per severity bucket.
pub fn summarize_severity(findings: &[Finding]) -> SeverityDistribution {
    let mut distribution = SeverityDistribution::default();
    for finding in findings {
        distribution.record(finding.severity.as_deref());
    }
    distribution
}

/// Roll findings up per sensitive-data category.
pub fn summarize_sensitive_types(findings: &[Finding]) -> SensitiveTypeSummary {
    let mut summary = SensitiveTypeSummary::new();
    for finding in findings {
        for item in &finding.sensitive_data {
            let category = summary.entry(item.category.clone()).or_default();
            category.count += 1;
            for detection in &item.detections {
                *category
                    .types
                    .entry(detection.detection_type.clone())
                    .or_default() += detection.count;
                category.total_occurrences += detection.count;
            }
        }
    }
    summary
}

/// Group findings by the object they reference.
pub fn summarize_file_distribution(findings: &[Finding]) -> FileDistribution {
    let mut distribution = FileDistribution::new();
    for resource in findings.iter().filter_map(|finding| finding.resource.as_ref()) {
        let entry = distribution
            .entry(resource.bucket.clone())
            .or_default()
            .entry(resource.key.clone())
            .or_insert_with(|| FileSummary {
                findings_count: 0,
                size: resource.size.unwrap_or(0),
                last_modified: resource.last_modified,
                storage_class: resource
                    .storage_class
                    .clone()
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
            });
        entry.findings_count += 1;
    }
    distribution
}

/// Distinct objects across all buckets
pub fn distinct_objects(distribution: &FileDistribution) -> usize {
    distribution.values().map(BTreeMap::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{finding, finding_in, item};
    use proptest::prelude::*;

    #[test]
    fn severity_buckets_are_case_insensitive_and_keep_unknowns() {
        let findings = vec![
            finding("1", Some("High"), vec![]),
            finding("2", Some("HIGH"), vec![]),
            finding("3", Some("Low"), vec![]),
            finding("4", Some("Critical"), vec![]),
            finding("5", None, vec![]),
        ];
        let distribution = summarize_severity(&findings);
        assert_eq!(distribution.high, 2);
        assert_eq!(distribution.medium, 0);
        assert_eq!(distribution.low, 1);
        assert_eq!(distribution.unknown, 2);
        assert_eq!(distribution.total(), 5);
    }

    #[test]
    fn severity_serializes_with_uppercase_keys() {
        let value = serde_json::to_value(SeverityDistribution {
            high: 2,
            low: 1,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["HIGH"], 2);
        assert_eq!(value["MEDIUM"], 0);
        assert_eq!(value["LOW"], 1);
        assert_eq!(value["UNKNOWN"], 0);
    }

    #[test]
    fn category_count_and_occurrences_are_independent() {
        let findings = vec![finding(
            "1",
            Some("Medium"),
            vec![item(
                "PERSONAL_INFORMATION",
                &[("EMAIL_ADDRESS", 3), ("PHONE_NUMBER", 3)],
            )],
        )];
        let summary = summarize_sensitive_types(&findings);
        let personal = &summary["PERSONAL_INFORMATION"];
        assert_eq!(personal.count, 1);
        assert_eq!(personal.total_occurrences, 6);
        assert_eq!(personal.types["EMAIL_ADDRESS"], 3);
    }

    #[test]
    fn category_counts_once_per_finding() {
        let findings = vec![
            finding("1", Some("High"), vec![item("CREDENTIALS", &[("AWS_CREDENTIALS", 2)])]),
            finding("2", Some("High"), vec![item("CREDENTIALS", &[("AWS_CREDENTIALS", 5)])]),
        ];
        let credentials = &summarize_sensitive_types(&findings)["CREDENTIALS"];
        assert_eq!(credentials.count, 2);
        assert_eq!(credentials.types["AWS_CREDENTIALS"], 7);
        assert_eq!(credentials.total_occurrences, 7);
    }

    #[test]
    fn file_distribution_accumulates_per_object() {
        let findings = vec![
            finding_in("1", "scan", "loki-complete/2024/03/07/a.txt"),
            finding_in("2", "scan", "loki-complete/2024/03/07/a.txt"),
            finding_in("3", "scan", "loki-complete/2024/03/07/b.txt"),
            finding_in("4", "other", "x.txt"),
            finding("5", Some("Low"), vec![]),
        ];
        let distribution = summarize_file_distribution(&findings);

        assert_eq!(distribution["scan"]["loki-complete/2024/03/07/a.txt"].findings_count, 2);
        assert_eq!(distribution["scan"]["loki-complete/2024/03/07/b.txt"].findings_count, 1);
        assert_eq!(distribution["other"]["x.txt"].storage_class, "STANDARD");
        assert_eq!(distinct_objects(&distribution), 3);
    }

    #[test]
    fn empty_input_summaries_are_empty() {
        assert_eq!(summarize_severity(&[]).total(), 0);
        assert!(summarize_sensitive_types(&[]).is_empty());
        assert!(summarize_file_distribution(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn severity_total_matches_finding_count(
            severities in proptest::collection::vec(
                proptest::option::of(prop_oneof![
                    Just("High".to_string()),
                    Just("MEDIUM".to_string()),
                    Just("low".to_string()),
                    "[A-Za-z]{0,8}",
                ]),
                0..64,
            )
        ) {
            let findings: Vec<_> = severities
                .iter()
                .enumerate()
                .map(|(i, severity)| finding(&i.to_string(), severity.as_deref(), vec![]))
                .collect();
            prop_assert_eq!(summarize_severity(&findings).total(), findings.len() as u64);
        }
    }
}
