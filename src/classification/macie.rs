//! Amazon Macie implementation of [`ClassificationService`].

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_macie2::primitives::DateTime as SdkDateTime;
use aws_sdk_macie2::types::{
    CriterionAdditionalProperties, FindingCriteria, FindingPublishingFrequency, JobComparator,
    JobScopeTerm, JobScopingBlock, JobType, MacieStatus, S3BucketDefinitionForJob,
    S3JobDefinition, ScopeFilterKey, Scoping, SimpleScopeTerm,
};
use aws_sdk_macie2::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    ClassificationJob, ClassificationService, FindingIdPage, JobRequest, JobStatistics, JobStatus,
    ServiceStatus, SAMPLING_PERCENTAGE,
};
use crate::aws::sdk_message;
use crate::core::errors::{PipelineError, Result};
use crate::report::findings::{AffectedObject, Detection, Finding, SensitiveDataItem};

const SERVICE: &str = "macie2";

/// Finding criterion restricting results to one job.
const JOB_ID_CRITERION: &str = "classificationDetails.jobId";

/// Classification service backed by a Macie client.
#[derive(Debug, Clone)]
pub struct MacieService {
    client: Client,
}

impl MacieService {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn to_chrono(value: Option<&SdkDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
}

fn job_definition(request: &JobRequest) -> S3JobDefinition {
    let buckets = S3BucketDefinitionForJob::builder()
        .account_id(&request.account_id)
        .buckets(&request.scan_bucket)
        .build();

    let prefix_term = SimpleScopeTerm::builder()
        .comparator(JobComparator::StartsWith)
        .key(ScopeFilterKey::ObjectKey)
        .values(&request.scope_prefix)
        .build();

    let scoping = Scoping::builder()
        .includes(
            JobScopingBlock::builder()
                .and(JobScopeTerm::builder().simple_scope_term(prefix_term).build())
                .build(),
        )
        .build();

    S3JobDefinition::builder()
        .bucket_definitions(buckets)
        .scoping(scoping)
        .build()
}

fn convert_finding(finding: &aws_sdk_macie2::types::Finding) -> Finding {
    let sensitive_data = finding
        .classification_details()
        .and_then(|details| details.result())
        .map(|result| {
            result
                .sensitive_data()
                .iter()
                .map(|item| SensitiveDataItem {
                    category: item
                        .category()
                        .map_or_else(|| "UNKNOWN".to_string(), |c| c.as_str().to_string()),
                    detections: item
                        .detections()
                        .iter()
                        .map(|detection| {
                            Detection::new(
                                detection.r#type().unwrap_or("UNKNOWN"),
                                detection.count(),
                            )
                        })
                        .collect(),
                })
                .collect()
        })
        .unwrap_or_default();

    let resource = finding.resources_affected().and_then(|resources| {
        let object = resources.s3_object()?;
        let bucket = resources
            .s3_bucket()
            .and_then(|bucket| bucket.name())
            .or_else(|| {
                object
                    .bucket_arn()
                    .and_then(|arn| arn.rsplit(':').next())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or("UNKNOWN");
        Some(AffectedObject {
            bucket: bucket.to_string(),
            key: object.key().unwrap_or_default().to_string(),
            size: object.size(),
            last_modified: to_chrono(object.last_modified()),
            storage_class: object.storage_class().map(|class| class.as_str().to_string()),
        })
    });

    Finding {
        id: finding.id().unwrap_or_default().to_string(),
        finding_type: finding.r#type().map(|kind| kind.as_str().to_string()),
        title: finding.title().map(str::to_string),
        severity: finding
            .severity()
            .and_then(|severity| severity.description())
            .map(|description| description.as_str().to_string()),
        created_at: to_chrono(finding.created_at()),
        sensitive_data,
        resource,
    }
}

#[async_trait]
impl ClassificationService for MacieService {
    async fn session_status(&self) -> Result<ServiceStatus> {
        match self.client.get_macie_session().send().await {
            Ok(session) => {
                debug!(status = ?session.status(), "Macie session found");
                Ok(ServiceStatus::Enabled)
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(ServiceStatus::Disabled)
            }
            Err(err) => Err(PipelineError::remote(SERVICE, "GetMacieSession", sdk_message(&err))),
        }
    }

    async fn enable(&self, finding_publishing_frequency: &str) -> Result<()> {
        self.client
            .enable_macie()
            .status(MacieStatus::Enabled)
            .finding_publishing_frequency(FindingPublishingFrequency::from(finding_publishing_frequency))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| PipelineError::remote(SERVICE, "EnableMacie", sdk_message(&e)))
    }

    async fn create_job(&self, request: &JobRequest) -> Result<String> {
        let tags: HashMap<String, String> = request
            .tags
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let output = self
            .client
            .create_classification_job()
            .name(&request.name)
            .description(&request.description)
            .job_type(JobType::OneTime)
            .s3_job_definition(job_definition(request))
            .sampling_percentage(SAMPLING_PERCENTAGE)
            .client_token(request.client_token())
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| PipelineError::remote(SERVICE, "CreateClassificationJob", sdk_message(&e)))?;

        Ok(output.job_id().unwrap_or_default().to_string())
    }

    async fn describe_job(&self, job_id: &str) -> Result<ClassificationJob> {
        let output = self
            .client
            .describe_classification_job()
            .job_id(job_id)
            .send()
            .await
            .map_err(|e| PipelineError::remote(SERVICE, "DescribeClassificationJob", sdk_message(&e)))?;

        let scope_prefix = output
            .s3_job_definition()
            .and_then(|definition| definition.scoping())
            .and_then(|scoping| scoping.includes())
            .and_then(|block| {
                block
                    .and()
                    .iter()
                    .filter_map(|term| term.simple_scope_term())
                    .find(|term| term.comparator() == Some(&JobComparator::StartsWith))
                    .and_then(|term| term.values().first().cloned())
            });

        let statistics = output
            .statistics()
            .map(|stats| JobStatistics {
                objects_to_process: stats.approximate_number_of_objects_to_process(),
                objects_processed: None,
                number_of_runs: stats.number_of_runs(),
            })
            .unwrap_or_default();

        Ok(ClassificationJob {
            job_id: output.job_id().unwrap_or(job_id).to_string(),
            job_name: output.name().unwrap_or_default().to_string(),
            status: output
                .job_status()
                .map_or(JobStatus::Unknown("UNKNOWN".to_string()), |status| {
                    JobStatus::parse(status.as_str())
                }),
            created_at: to_chrono(output.created_at()),
            last_run_time: to_chrono(output.last_run_time()),
            scope_prefix,
            statistics,
        })
    }

    async fn list_finding_ids(&self, job_id: &str, next_token: Option<String>) -> Result<FindingIdPage> {
        let criteria = FindingCriteria::builder()
            .criterion(
                JOB_ID_CRITERION,
                CriterionAdditionalProperties::builder().eq(job_id).build(),
            )
            .build();

        let output = self
            .client
            .list_findings()
            .finding_criteria(criteria)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| PipelineError::remote(SERVICE, "ListFindings", sdk_message(&e)))?;

        Ok(FindingIdPage {
            ids: output.finding_ids().to_vec(),
            next_token: output
                .next_token()
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        })
    }

    async fn get_findings(&self, ids: &[String]) -> Result<Vec<Finding>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let output = self
            .client
            .get_findings()
            .set_finding_ids(Some(ids.to_vec()))
            .send()
            .await
            .map_err(|e| PipelineError::remote(SERVICE, "GetFindings", sdk_message(&e)))?;

        Ok(output.findings().iter().map(convert_finding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::partition::RunStamp;

    #[test]
    fn job_definition_scopes_to_the_partition_prefix() {
        let request = JobRequest::for_run(&RunStamp::now(), "scan", "123456789012", "loki-complete");
        let definition = job_definition(&request);

        let buckets = definition.bucket_definitions();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].account_id(), Some("123456789012"));
        assert_eq!(buckets[0].buckets(), ["scan".to_string()]);

        let terms = definition.scoping().unwrap().includes().unwrap().and();
        let term = terms[0].simple_scope_term().unwrap();
        assert_eq!(term.comparator(), Some(&JobComparator::StartsWith));
        assert_eq!(term.key(), Some(&ScopeFilterKey::ObjectKey));
        assert_eq!(term.values(), [request.scope_prefix.clone()]);
    }

    #[test]
    fn sdk_timestamps_convert_to_utc() {
        let sdk = SdkDateTime::from_secs(1_709_802_301);
        let converted = to_chrono(Some(&sdk)).unwrap();
        assert_eq!(converted.to_rfc3339(), "2024-03-07T09:05:01+00:00");
        assert!(to_chrono(None).is_none());
    }
}
