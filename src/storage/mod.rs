//! Object store seam and the date-partitioned uploader.

pub mod s3;

pub use s3::S3ObjectStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::errors::Result;
use crate::core::partition::RunStamp;
use crate::extract::ExtractedFile;

/// Value of the `source` metadata entry on every uploaded chunk.
pub const SOURCE_TAG: &str = "loki-chunk";

/// Remote object storage operations the pipeline needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `bucket/key`, replacing any existing object
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Succeeds when the bucket exists and is reachable
    async fn head_bucket(&self, bucket: &str) -> Result<()>;

    /// Keys under `prefix`
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;
}

/// Provenance attached to every uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Always [`SOURCE_TAG`]
    pub source: String,
    /// Run timestamp (RFC 3339)
    pub extraction_time: String,
    /// Classification job name of the run
    pub pipeline_job: String,
}

impl ObjectMetadata {
    /// Metadata for objects produced by `stamp`'s run
    pub fn for_run(stamp: &RunStamp) -> Self {
        Self {
            source: SOURCE_TAG.to_string(),
            extraction_time: stamp.iso_timestamp(),
            pipeline_job: stamp.job_name().to_string(),
        }
    }

    /// Wire form (`x-amz-meta-*` names)
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("source".to_string(), self.source.clone()),
            ("extraction-time".to_string(), self.extraction_time.clone()),
            ("pipeline-job".to_string(), self.pipeline_job.clone()),
        ])
    }
}

/// A successfully stored extracted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedObject {
    /// Destination bucket
    pub bucket: String,
    /// Destination key
    pub key: String,
    /// Provenance metadata
    pub metadata: ObjectMetadata,
}

/// Uploads extracted files under `{prefix}/{YYYY/MM/DD}/{file}`.
pub struct PartitionedUploader {
    store: Arc<dyn ObjectStore>,
    workers: usize,
}

impl PartitionedUploader {
    /// Create an uploader with a bounded worker pool
    pub fn new(store: Arc<dyn ObjectStore>, workers: usize) -> Self {
        Self {
            store,
            workers: workers.max(1),
        }
    }

    /// Upload every file into the run's partition.
    ///
    /// Each file is attempted independently; failures are logged and skipped. The
    /// returned objects are sorted by key. Re-running with the same files and the same
    /// stamp writes the same keys.
    pub async fn upload(
        &self,
        files: Vec<ExtractedFile>,
        bucket: &str,
        prefix: &str,
        stamp: &RunStamp,
    ) -> Vec<UploadedObject> {
        let metadata = ObjectMetadata::for_run(stamp);
        let wire_metadata = metadata.to_map();
        let partition = stamp.partition();

        info!(
            files = files.len(),
            bucket = %bucket,
            prefix = %partition.scope_prefix(prefix),
            "Uploading extracted files"
        );

        let outcomes: Vec<Option<UploadedObject>> = stream::iter(files)
            .map(|file| {
                let key = partition.object_key(prefix, &file.file_name());
                let metadata = &metadata;
                let wire_metadata = &wire_metadata;
                async move {
                    let outcome = match tokio::fs::read(&file.local_path).await {
                        Ok(body) => {
                            self.store
                                .put_object(bucket, &key, body, "text/plain; charset=utf-8", wire_metadata)
                                .await
                        }
                        Err(e) => Err(e.into()),
                    };
                    match outcome {
                        Ok(()) => Some(UploadedObject {
                            bucket: bucket.to_string(),
                            key,
                            metadata: metadata.clone(),
                        }),
                        Err(err) => {
                            warn!(file = %file.local_path.display(), key = %key, error = %err, "Skipping upload");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut uploaded: Vec<UploadedObject> = outcomes.into_iter().flatten().collect();
        uploaded.sort_by(|a, b| a.key.cmp(&b.key));

        info!(uploaded = uploaded.len(), bucket = %bucket, "Upload finished");
        uploaded
    }
}
