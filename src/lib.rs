//! # loki-macie-rs: Loki chunk sensitive data scanning
//!
//! Decodes Loki chunk files to text, stages the text in S3 under a date partition,
//! and runs an Amazon Macie classification job over that partition. Findings are
//! aggregated into a JSON report with a plain-text summary.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     CLI (loki-macie binary)                      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                    Pipeline driver / preflight                   │
//! ├──────────────┬──────────────┬──────────────────┬─────────────────┤
//! │  Extract     │  Storage     │  Classification  │  Report         │
//! │ • Decoder    │ • Partitions │ • Job manager    │ • Analysis      │
//! │ • Workers    │ • Uploader   │ • Macie client   │ • Advice        │
//! ├──────────────┴──────────────┴──────────────────┴─────────────────┤
//! │          Core: config, errors, date partitions  │  AWS clients   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loki_macie_rs::{AwsClients, AwsSettings, FindingsAggregator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let clients = AwsClients::connect(AwsSettings::new("us-east-1")).await;
//!     let aggregator = FindingsAggregator::new(clients.classification_service(), "./reports")?;
//!     let artifacts = aggregator.build_report("0123456789abcdef").await?;
//!
//!     println!("{} findings", artifacts.report.findings_analysis.total_findings);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Configuration, errors and partition naming
pub mod core {
    //! Configuration, error types and date partitioning.

    pub mod config;
    pub mod errors;
    pub mod partition;
}

// Remote clients
pub mod aws;

// Pipeline stages
pub mod classification;
pub mod extract;
pub mod storage;

// Findings and reports
pub mod report;

// Run composition
pub mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary types for convenience
pub use aws::{AwsClients, AwsSettings};
pub use classification::{ClassificationJob, ClassificationJobManager, ClassificationService, JobStatus};
pub use core::config::{ConfigStore, PipelineConfig};
pub use core::errors::{PipelineError, Result, ResultExt};
pub use core::partition::{DatePartition, RunStamp};
pub use extract::{ChunkDecoder, CommandDecoder, Extractor};
pub use pipeline::{ExecutionMode, PipelineDriver, PipelineServices, RunOutcome};
pub use report::{AnalysisReport, FindingsAggregator};
pub use storage::{ObjectStore, PartitionedUploader};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
