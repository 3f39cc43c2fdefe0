//! Chunk-to-text extraction.
//!
//! The [`Extractor`] walks a chunk directory (non-recursively), hands every regular,
//! non-hidden file to a [`ChunkDecoder`], and writes one `{chunk}.txt` per decoded chunk
//! with a generated header. Decoding runs on a bounded pool; a failing chunk is logged
//! and skipped.

pub mod decoder;

pub use decoder::{ChunkDecoder, ChunkMetadata, CommandDecoder, DecodedChunk};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::core::errors::{PipelineError, Result, ResultExt};

const HEADER_RULE: &str = "# ==================================================";

/// One successfully decoded chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFile {
    /// File name of the source chunk
    pub source_name: String,
    /// Path of the written text file
    pub local_path: PathBuf,
    /// Size of the written text file
    pub size_bytes: u64,
    /// Size of the source chunk
    pub source_size_bytes: u64,
    /// Run timestamp recorded in the header
    pub extraction_timestamp: DateTime<Utc>,
    /// Header fields reported by the decoder
    #[serde(default, skip_serializing_if = "ChunkMetadata::is_empty")]
    pub metadata: ChunkMetadata,
}

impl ExtractedFile {
    /// Name of the written text file
    pub fn file_name(&self) -> String {
        self.local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.txt", self.source_name))
    }
}

/// A chunk that could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    /// File name of the source chunk
    pub source_name: String,
    /// Reason it was skipped
    pub message: String,
}

/// Full outcome of an extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Chunk directory that was scanned
    pub chunk_directory: PathBuf,
    /// Directory the text files were written to
    pub output_directory: PathBuf,
    /// Successfully decoded chunks, sorted by source name
    pub extracted: Vec<ExtractedFile>,
    /// Skipped chunks, sorted by source name
    pub failures: Vec<ExtractionFailure>,
}

impl ExtractionReport {
    /// Number of chunks attempted
    pub fn total(&self) -> usize {
        self.extracted.len() + self.failures.len()
    }
}

/// Decodes a directory of chunks into text files.
pub struct Extractor {
    decoder: Arc<dyn ChunkDecoder>,
    workers: usize,
}

impl Extractor {
    /// Create an extractor with a bounded worker pool
    pub fn new(decoder: Arc<dyn ChunkDecoder>, workers: usize) -> Self {
        Self {
            decoder,
            workers: workers.max(1),
        }
    }

    /// Regular, non-hidden files directly under `chunk_dir`, sorted by name.
    pub fn discover_chunks(chunk_dir: &Path) -> Result<Vec<PathBuf>> {
        if !chunk_dir.is_dir() {
            return Err(PipelineError::pipeline(
                "extract",
                format!("chunk directory {} does not exist", chunk_dir.display()),
            ));
        }

        let mut chunks = Vec::new();
        for entry in WalkDir::new(chunk_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                PipelineError::pipeline("extract", format!("cannot read chunk directory: {e}"))
            })?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if entry.file_type().is_file() && !hidden {
                chunks.push(entry.into_path());
            }
        }
        chunks.sort();
        Ok(chunks)
    }

    /// Decode every chunk and return the files that succeeded.
    pub async fn extract(
        &self,
        chunk_dir: &Path,
        out_dir: &Path,
        extracted_at: DateTime<Utc>,
    ) -> Result<Vec<ExtractedFile>> {
        Ok(self
            .extract_with_report(chunk_dir, out_dir, extracted_at)
            .await?
            .extracted)
    }

    /// Decode every chunk, keeping the per-file failures alongside the successes.
    pub async fn extract_with_report(
        &self,
        chunk_dir: &Path,
        out_dir: &Path,
        extracted_at: DateTime<Utc>,
    ) -> Result<ExtractionReport> {
        let chunks = Self::discover_chunks(chunk_dir)?;
        tokio::fs::create_dir_all(out_dir)
            .await
            .with_context(|| format!("creating output directory {}", out_dir.display()))?;

        info!(
            chunks = chunks.len(),
            workers = self.workers,
            decoder = %self.decoder.name(),
            "Extracting chunks"
        );

        let outcomes: Vec<(String, Result<ExtractedFile>)> = stream::iter(chunks)
            .map(move |chunk| async move {
                let name = file_name_of(&chunk);
                let outcome = self.extract_one(&chunk, &name, out_dir, extracted_at).await;
                (name, outcome)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut report = ExtractionReport {
            chunk_directory: chunk_dir.to_path_buf(),
            output_directory: out_dir.to_path_buf(),
            ..ExtractionReport::default()
        };
        for (source_name, outcome) in outcomes {
            match outcome {
                Ok(file) => report.extracted.push(file),
                Err(err) => {
                    warn!(chunk = %source_name, error = %err, "Skipping chunk");
                    report.failures.push(ExtractionFailure {
                        source_name,
                        message: err.to_string(),
                    });
                }
            }
        }
        report.extracted.sort_by(|a, b| a.source_name.cmp(&b.source_name));
        report.failures.sort_by(|a, b| a.source_name.cmp(&b.source_name));

        info!(
            extracted = report.extracted.len(),
            failed = report.failures.len(),
            "Extraction finished"
        );
        Ok(report)
    }

    async fn extract_one(
        &self,
        chunk: &Path,
        source_name: &str,
        out_dir: &Path,
        extracted_at: DateTime<Utc>,
    ) -> Result<ExtractedFile> {
        let source_size_bytes = tokio::fs::metadata(chunk).await?.len();
        let decoded = self.decoder.decode(chunk).await?;

        let body = render_text_file(source_name, extracted_at, source_size_bytes, &decoded);
        let local_path = out_dir.join(format!("{source_name}.txt"));
        tokio::fs::write(&local_path, body.as_bytes())
            .await
            .with_context(|| format!("writing {}", local_path.display()))?;

        Ok(ExtractedFile {
            source_name: source_name.to_string(),
            local_path,
            size_bytes: body.len() as u64,
            source_size_bytes,
            extraction_timestamp: extracted_at,
            metadata: decoded.metadata,
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Header plus verbatim decoder output.
fn render_text_file(
    source_name: &str,
    extracted_at: DateTime<Utc>,
    source_size_bytes: u64,
    decoded: &DecodedChunk,
) -> String {
    let mut header = vec![
        format!("# Loki Chunk File: {source_name}"),
        format!("# Extracted at: {}", extracted_at.to_rfc3339()),
        format!("# File size: {source_size_bytes} bytes"),
    ];
    if let Some(user_id) = &decoded.metadata.user_id {
        header.push(format!("# User ID: {user_id}"));
    }
    if let (Some(from), Some(through)) = (&decoded.metadata.from, &decoded.metadata.through) {
        header.push(format!("# Time range: {from} - {through}"));
    }
    header.push(HEADER_RULE.to_string());

    format!("{}\n\n{}", header.join("\n"), decoded.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticDecoder;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap()
    }

    fn write_chunks(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"\x00binary-chunk").unwrap();
        }
    }

    #[tokio::test]
    async fn one_failing_chunk_is_skipped() {
        let chunks = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_chunks(chunks.path(), &["a", "b", "c", "d", "e"]);

        let decoder = Arc::new(StaticDecoder::new("line one\nline two\n").failing_on(["c"]));
        let extractor = Extractor::new(decoder, 2);
        let report = extractor
            .extract_with_report(chunks.path(), out.path(), at())
            .await
            .unwrap();

        let names: Vec<_> = report.extracted.iter().map(|f| f.source_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "d", "e"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source_name, "c");
        assert!(!out.path().join("c.txt").exists());
    }

    #[tokio::test]
    async fn hidden_files_and_directories_are_ignored() {
        let chunks = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_chunks(chunks.path(), &["chunk-1", ".DS_Store"]);
        std::fs::create_dir(chunks.path().join("nested")).unwrap();
        write_chunks(&chunks.path().join("nested"), &["deep"]);

        let extractor = Extractor::new(Arc::new(StaticDecoder::new("x")), 4);
        let files = extractor.extract(chunks.path(), out.path(), at()).await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].source_name, "chunk-1");
        assert_eq!(files[0].file_name(), "chunk-1.txt");
    }

    #[tokio::test]
    async fn text_file_has_header_then_decoder_output() {
        let chunks = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_chunks(chunks.path(), &["chunk-1"]);

        let output = "UserID: fake\nFrom: 09:00\nThrough: 10:00\nlevel=INFO msg=hello\n";
        let extractor = Extractor::new(Arc::new(StaticDecoder::new(output)), 1);
        let files = extractor.extract(chunks.path(), out.path(), at()).await.unwrap();

        let written = std::fs::read_to_string(&files[0].local_path).unwrap();
        assert!(written.starts_with("# Loki Chunk File: chunk-1\n# Extracted at: 2024-03-07T09:05:01+00:00\n# File size: 13 bytes\n"));
        assert!(written.contains("# User ID: fake\n# Time range: 09:00 - 10:00\n"));
        assert!(written.ends_with(&format!("{HEADER_RULE}\n\n{output}")));
        assert_eq!(files[0].size_bytes, written.len() as u64);
        assert_eq!(files[0].source_size_bytes, 13);
        assert_eq!(files[0].metadata.user_id.as_deref(), Some("fake"));
    }

    #[tokio::test]
    async fn empty_directory_yields_no_files() {
        let chunks = tempdir().unwrap();
        let out = tempdir().unwrap();
        let extractor = Extractor::new(Arc::new(StaticDecoder::new("x")), 4);
        assert!(extractor
            .extract(chunks.path(), out.path(), at())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn missing_chunk_directory_is_an_error() {
        let out = tempdir().unwrap();
        let extractor = Extractor::new(Arc::new(StaticDecoder::new("x")), 4);
        let err = extractor
            .extract(&out.path().join("missing"), out.path(), at())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Pipeline { .. }));
    }
}
