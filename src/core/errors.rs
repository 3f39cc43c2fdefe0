//! Error types for the loki-macie pipeline.
//!
//! Every failure the orchestrator can observe maps onto one variant here, grouped the
//! way the pipeline recovers from them: configuration problems stop the process before
//! any remote call, validation problems go through interactive correction, per-file
//! decoder and upload failures are skipped, and remote service failures are either
//! fatal (enable, submit) or degrade the report (describe, list, get).

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::report::error::ReportError;

/// Main result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error type for all pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration file does not exist
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was looked up
        path: String,
    },

    /// Configuration file exists but could not be parsed
    #[error("Malformed configuration file {path}: {message}")]
    ConfigMalformed {
        /// Path of the offending file
        path: String,
        /// Parser diagnostic
        message: String,
    },

    /// A single configuration value is invalid
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field that failed validation
        field: Option<String>,
    },

    /// Interactive correction ran out of attempts for a field
    #[error("Validation failed for '{field}' after {attempts} attempts")]
    ValidationExhausted {
        /// Field being corrected
        field: String,
        /// Attempts consumed
        attempts: usize,
    },

    /// The operator declined the corrected configuration
    #[error("Configuration correction aborted by user")]
    UserAborted,

    /// External chunk decoder failed for one input
    #[error("Decoder '{tool}' failed on {input}: {message}")]
    ExternalTool {
        /// Decoder executable
        tool: String,
        /// Input file being decoded
        input: String,
        /// Captured diagnostic (usually stderr)
        message: String,
    },

    /// Object upload failed
    #[error("Upload to s3://{bucket}/{key} failed: {message}")]
    Upload {
        /// Destination bucket
        bucket: String,
        /// Destination key
        key: String,
        /// Error description
        message: String,
    },

    /// A remote service call failed
    #[error("{service} {operation} failed: {message}")]
    RemoteService {
        /// Service name (s3, macie2, sts)
        service: String,
        /// Operation that failed
        operation: String,
        /// Error description
        message: String,
    },

    /// A pipeline stage produced nothing to hand to the next stage
    #[error("Pipeline stopped at stage '{stage}': {message}")]
    Pipeline {
        /// Stage name
        stage: String,
        /// Error description
        message: String,
    },

    /// The run was cancelled by an external signal
    #[error("Operation cancelled: {message}")]
    Cancelled {
        /// What was interrupted
        message: String,
    },

    /// I/O related errors
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Report rendering errors
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl PipelineError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Configuration file is missing
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    /// Configuration file is not valid JSON for the expected shape
    pub fn config_malformed(path: &Path, message: impl Into<String>) -> Self {
        Self::ConfigMalformed {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new validation error tied to a field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new exhausted-retries error
    pub fn validation_exhausted(field: impl Into<String>, attempts: usize) -> Self {
        Self::ValidationExhausted {
            field: field.into(),
            attempts,
        }
    }

    /// Create a new decoder failure
    pub fn external_tool(
        tool: impl Into<String>,
        input: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a new upload failure
    pub fn upload(
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Upload {
            bucket: bucket.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new remote service failure
    pub fn remote(
        service: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::RemoteService {
            service: service.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a new pipeline stage error
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a new cancellation error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// True when the error was raised before any remote resource was touched.
    pub fn is_fatal_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigMalformed { .. }
                | Self::Validation { .. }
                | Self::ValidationExhausted { .. }
                | Self::UserAborted
        )
    }

    /// Prefix the message of message-carrying variants with extra context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::Io { message, .. }
            | Self::Serialization { message, .. }
            | Self::Pipeline { message, .. }
            | Self::RemoteService { message, .. } => {
                *message = format!("{}: {}", context.into(), message);
            }
            _ => {}
        }
        self
    }
}

impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

/// Result extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add lazily built context to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PipelineError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
