//! In-memory fakes for the remote seams and finding builders shared by unit tests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::classification::{
    ClassificationJob, ClassificationService, FindingIdPage, JobRequest, JobStatistics, JobStatus,
    ServiceStatus,
};
use crate::core::errors::{PipelineError, Result};
use crate::extract::{ChunkDecoder, DecodedChunk};
use crate::report::findings::{AffectedObject, Detection, Finding, SensitiveDataItem};
use crate::storage::ObjectStore;

/// Decoder returning fixed output, failing for selected file names.
pub(crate) struct StaticDecoder {
    output: String,
    fail_on: HashSet<String>,
}

impl StaticDecoder {
    pub(crate) fn new(output: &str) -> Self {
        Self {
            output: output.to_string(),
            fail_on: HashSet::new(),
        }
    }

    pub(crate) fn failing_on<I: IntoIterator<Item = &'static str>>(mut self, names: I) -> Self {
        self.fail_on.extend(names.into_iter().map(str::to_string));
        self
    }
}

#[async_trait]
impl ChunkDecoder for StaticDecoder {
    fn name(&self) -> String {
        "static-decoder".to_string()
    }

    async fn decode(&self, chunk: &Path) -> Result<DecodedChunk> {
        let name = chunk
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_on.contains(&name) {
            return Err(PipelineError::external_tool(self.name(), name, "corrupt chunk"));
        }
        Ok(DecodedChunk::from_output(self.output.clone()))
    }
}

type StoredObject = (Vec<u8>, BTreeMap<String, String>);

/// Object store keeping objects in memory.
#[derive(Default)]
pub(crate) struct MockObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    failing_keys: HashSet<String>,
    missing_buckets: HashSet<String>,
    fail_all_puts: bool,
}

impl MockObjectStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_on(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    pub(crate) fn failing_all_puts(mut self) -> Self {
        self.fail_all_puts = true;
        self
    }

    pub(crate) fn without_bucket(mut self, bucket: &str) -> Self {
        self.missing_buckets.insert(bucket.to_string());
        self
    }

    pub(crate) fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub(crate) fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub(crate) fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<()> {
        if self.fail_all_puts || self.failing_keys.contains(key) {
            return Err(PipelineError::upload(bucket, key, "simulated failure"));
        }
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), (body, metadata.clone()));
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<()> {
        if self.missing_buckets.contains(bucket) {
            return Err(PipelineError::remote("s3", "HeadBucket", "NotFound"));
        }
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .keys(bucket)
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }
}

/// Scripted classification service.
///
/// `describe_job` walks the status script, repeating its last entry; `None` entries
/// fail the call. Findings are served in pages of `page_size`.
pub(crate) struct MockClassificationService {
    status: ServiceStatus,
    fail_create: bool,
    stall_describe: bool,
    fail_get_on_page: Option<usize>,
    statuses: Mutex<VecDeque<Option<JobStatus>>>,
    findings: Vec<Finding>,
    page_size: usize,
    enabled_with: Mutex<Option<String>>,
    created: Mutex<Vec<JobRequest>>,
    describe_calls: AtomicUsize,
}

impl MockClassificationService {
    pub(crate) fn new() -> Self {
        Self {
            status: ServiceStatus::Enabled,
            fail_create: false,
            stall_describe: false,
            fail_get_on_page: None,
            statuses: Mutex::new(VecDeque::from([Some(JobStatus::Complete)])),
            findings: Vec::new(),
            page_size: 2,
            enabled_with: Mutex::new(None),
            created: Mutex::new(Vec::new()),
            describe_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn disabled(mut self) -> Self {
        self.status = ServiceStatus::Disabled;
        self
    }

    pub(crate) fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// `describe_job` never resolves, like a stalled connection
    pub(crate) fn stalling_describe(mut self) -> Self {
        self.stall_describe = true;
        self
    }

    pub(crate) fn failing_get_on_page(mut self, page: usize) -> Self {
        self.fail_get_on_page = Some(page);
        self
    }

    pub(crate) fn with_statuses<I: IntoIterator<Item = Option<JobStatus>>>(self, statuses: I) -> Self {
        *self.statuses.lock().unwrap() = statuses.into_iter().collect();
        self
    }

    pub(crate) fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    pub(crate) fn enabled_with(&self) -> Option<String> {
        self.enabled_with.lock().unwrap().clone()
    }

    pub(crate) fn created_requests(&self) -> Vec<JobRequest> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationService for MockClassificationService {
    async fn session_status(&self) -> Result<ServiceStatus> {
        Ok(self.status)
    }

    async fn enable(&self, finding_publishing_frequency: &str) -> Result<()> {
        *self.enabled_with.lock().unwrap() = Some(finding_publishing_frequency.to_string());
        Ok(())
    }

    async fn create_job(&self, request: &JobRequest) -> Result<String> {
        if self.fail_create {
            return Err(PipelineError::remote(
                "macie2",
                "CreateClassificationJob",
                "AccessDeniedException",
            ));
        }
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        Ok(format!("job-{:04}", created.len()))
    }

    async fn describe_job(&self, job_id: &str) -> Result<ClassificationJob> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_describe {
            std::future::pending::<()>().await;
        }
        let status = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().flatten()
            } else {
                statuses.front().cloned().flatten()
            }
        };
        let status = status.ok_or_else(|| {
            PipelineError::remote("macie2", "DescribeClassificationJob", "ThrottlingException")
        })?;

        let job_name = self
            .created
            .lock()
            .unwrap()
            .first()
            .map_or_else(|| "loki-analysis-20240307-090501".to_string(), |r| r.name.clone());

        Ok(ClassificationJob {
            job_id: job_id.to_string(),
            job_name,
            status,
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 3).unwrap()),
            last_run_time: Some(Utc.with_ymd_and_hms(2024, 3, 7, 9, 20, 0).unwrap()),
            scope_prefix: None,
            statistics: JobStatistics {
                objects_to_process: Some(4.0),
                objects_processed: None,
                number_of_runs: Some(1.0),
            },
        })
    }

    async fn list_finding_ids(&self, _job_id: &str, next_token: Option<String>) -> Result<FindingIdPage> {
        let page: usize = next_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let start = page * self.page_size;
        let ids: Vec<String> = self
            .findings
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|f| f.id.clone())
            .collect();
        let next_token = (start + self.page_size < self.findings.len()).then(|| (page + 1).to_string());
        Ok(FindingIdPage { ids, next_token })
    }

    async fn get_findings(&self, ids: &[String]) -> Result<Vec<Finding>> {
        if let Some(page) = self.fail_get_on_page {
            let first_on_page = self.findings.get(page * self.page_size).map(|f| &f.id);
            if ids.first() == first_on_page {
                return Err(PipelineError::remote("macie2", "GetFindings", "InternalServerException"));
            }
        }
        Ok(self
            .findings
            .iter()
            .filter(|f| ids.contains(&f.id))
            .cloned()
            .collect())
    }
}

/// Sensitive-data item with `(type, count)` detections.
pub(crate) fn item(category: &str, detections: &[(&str, i64)]) -> SensitiveDataItem {
    SensitiveDataItem {
        category: category.to_string(),
        detections: detections
            .iter()
            .map(|(kind, count)| Detection::new(*kind, Some(*count)))
            .collect(),
    }
}

/// Finding without a resource reference.
pub(crate) fn finding(id: &str, severity: Option<&str>, sensitive_data: Vec<SensitiveDataItem>) -> Finding {
    Finding {
        id: id.to_string(),
        finding_type: Some("SensitiveData:S3Object/Multiple".to_string()),
        title: None,
        severity: severity.map(str::to_string),
        created_at: None,
        sensitive_data,
        resource: None,
    }
}

/// Low-severity finding pointing at `bucket/key`.
pub(crate) fn finding_in(id: &str, bucket: &str, key: &str) -> Finding {
    Finding {
        resource: Some(AffectedObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: Some(1024),
            last_modified: None,
            storage_class: Some("STANDARD".to_string()),
        }),
        ..finding(id, Some("Low"), Vec::new())
    }
}
