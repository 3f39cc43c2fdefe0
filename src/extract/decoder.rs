//! Chunk decoder seam and the external-command implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::core::errors::{PipelineError, Result};

/// Header fields the decoder prints ahead of the log lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Tenant that owns the chunk
    pub user_id: Option<String>,
    /// First timestamp covered
    pub from: Option<String>,
    /// Last timestamp covered
    pub through: Option<String>,
}

impl ChunkMetadata {
    /// Pick `UserID:`, `From:` and `Through:` header lines out of decoder output.
    pub fn parse(output: &str) -> Self {
        let mut metadata = Self::default();
        for line in output.lines() {
            let Some((label, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match label {
                "UserID" if metadata.user_id.is_none() => metadata.user_id = Some(value.into()),
                "From" if metadata.from.is_none() => metadata.from = Some(value.into()),
                "Through" if metadata.through.is_none() => metadata.through = Some(value.into()),
                _ => {}
            }
        }
        metadata
    }

    /// True when no header field was found
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.from.is_none() && self.through.is_none()
    }
}

/// Text and header metadata recovered from one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChunk {
    /// Verbatim decoder output
    pub text: String,
    /// Parsed header fields
    pub metadata: ChunkMetadata,
}

impl DecodedChunk {
    /// Wrap raw decoder output, parsing its header
    pub fn from_output(text: String) -> Self {
        let metadata = ChunkMetadata::parse(&text);
        Self { text, metadata }
    }
}

/// Turns a binary chunk into text.
#[async_trait]
pub trait ChunkDecoder: Send + Sync {
    /// Human-readable decoder name for logs and errors
    fn name(&self) -> String;

    /// Decode one chunk file
    async fn decode(&self, chunk: &Path) -> Result<DecodedChunk>;
}

/// Decoder backed by an external executable that prints log lines to stdout.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandDecoder {
    /// Decoder invoked as `<program> -l <chunk>`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec!["-l".to_string()],
        }
    }

    /// Replace the arguments placed before the chunk path
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Executable path
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check that the executable exists and can be run.
    pub fn check_available(&self) -> Result<()> {
        let metadata = std::fs::metadata(&self.program).map_err(|e| {
            PipelineError::external_tool(self.name(), "-", format!("not found: {e}"))
        })?;
        if !metadata.is_file() {
            return Err(PipelineError::external_tool(
                self.name(),
                "-",
                "not a regular file",
            ));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 == 0 {
                return Err(PipelineError::external_tool(
                    self.name(),
                    "-",
                    format!("not executable, run: chmod +x {}", self.program.display()),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ChunkDecoder for CommandDecoder {
    fn name(&self) -> String {
        self.program.display().to_string()
    }

    async fn decode(&self, chunk: &Path) -> Result<DecodedChunk> {
        debug!(decoder = %self.program.display(), chunk = %chunk.display(), "Running decoder");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(chunk)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PipelineError::external_tool(self.name(), chunk.display().to_string(), e.to_string())
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::external_tool(
                self.name(),
                chunk.display().to_string(),
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }

        Ok(DecodedChunk::from_output(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }
}
