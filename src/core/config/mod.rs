//! Pipeline configuration: loading, validation, correction and persistence.
//!
//! The persisted file is a JSON document with `aws`, `s3`, `macie` and `processing`
//! sections. [`PipelineConfig::validate`] is a pure check that returns every issue it
//! finds; fixing those issues interactively lives in [`correction`] so that the
//! validation rules can be tested without a terminal.

pub mod correction;
pub mod validation;

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::errors::{PipelineError, Result};

pub use correction::{
    correct_interactively, ConfigPrompter, RefusingPrompter, ScriptedPrompter, MAX_ATTEMPTS,
};
pub use validation::{
    is_missing_region, is_placeholder_bucket, is_valid_bucket_name, looks_like_test_bucket,
    validate_bucket_input, validate_bucket_name, validate_region_input, validate_wait_minutes,
    PLACEHOLDER_REGION, PLACEHOLDER_RESULTS_BUCKET, PLACEHOLDER_SCAN_BUCKET,
};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// AWS session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSection {
    /// Region used for every client
    #[serde(default)]
    pub region: String,
    /// Named credentials profile
    #[serde(default)]
    pub profile: Option<String>,
    /// Custom endpoint (LocalStack and friends)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

/// Object store locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Section {
    /// Bucket that receives extracted text and is scanned by the classification job
    #[serde(default)]
    pub scan_bucket: String,
    /// Bucket that receives analysis reports
    #[serde(default)]
    pub results_bucket: String,
    /// Key prefix placed before the date partition
    #[serde(default = "S3Section::default_scan_prefix")]
    pub scan_prefix: String,
}

impl S3Section {
    fn default_scan_prefix() -> String {
        "loki-complete".to_string()
    }
}

/// Classification service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacieSection {
    /// Wall-clock budget for blocking waits
    #[serde(default = "MacieSection::default_max_wait_minutes")]
    pub max_wait_minutes: u64,
    /// Delay between status polls
    #[serde(default = "MacieSection::default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    /// Publishing frequency requested when the service has to be enabled
    #[serde(default = "MacieSection::default_finding_publishing_frequency")]
    pub finding_publishing_frequency: String,
}

impl Default for MacieSection {
    fn default() -> Self {
        Self {
            max_wait_minutes: Self::default_max_wait_minutes(),
            poll_interval_seconds: Self::default_poll_interval_seconds(),
            finding_publishing_frequency: Self::default_finding_publishing_frequency(),
        }
    }
}

impl MacieSection {
    const fn default_max_wait_minutes() -> u64 {
        60
    }

    const fn default_poll_interval_seconds() -> u64 {
        30
    }

    fn default_finding_publishing_frequency() -> String {
        "FIFTEEN_MINUTES".to_string()
    }
}

/// Local processing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSection {
    /// Directory holding the raw chunk files
    #[serde(default = "ProcessingSection::default_chunk_directory")]
    pub chunk_directory: PathBuf,
    /// Directory that receives extracted text files
    #[serde(default = "ProcessingSection::default_output_directory")]
    pub output_directory: PathBuf,
    /// Chunk decoder executable
    #[serde(default = "ProcessingSection::default_decoder_path")]
    pub decoder_path: PathBuf,
    /// Bounded worker count for extraction and upload
    #[serde(default = "ProcessingSection::default_workers")]
    pub workers: usize,
}

impl Default for ProcessingSection {
    fn default() -> Self {
        Self {
            chunk_directory: Self::default_chunk_directory(),
            output_directory: Self::default_output_directory(),
            decoder_path: Self::default_decoder_path(),
            workers: Self::default_workers(),
        }
    }
}

impl ProcessingSection {
    fn default_chunk_directory() -> PathBuf {
        PathBuf::from("./lokichunk")
    }

    fn default_output_directory() -> PathBuf {
        PathBuf::from("./extracted_texts")
    }

    fn default_decoder_path() -> PathBuf {
        PathBuf::from("./chunks-inspect")
    }

    const fn default_workers() -> usize {
        4
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// AWS session settings
    pub aws: AwsSection,
    /// Object store locations
    pub s3: S3Section,
    /// Classification service settings
    #[serde(default)]
    pub macie: MacieSection,
    /// Local processing settings
    #[serde(default)]
    pub processing: ProcessingSection,
}

impl PipelineConfig {
    /// The configuration template written by `init-config`. Fails validation on purpose.
    pub fn template() -> Self {
        Self {
            aws: AwsSection {
                region: PLACEHOLDER_REGION.to_string(),
                profile: None,
                endpoint_url: None,
            },
            s3: S3Section {
                scan_bucket: PLACEHOLDER_SCAN_BUCKET.to_string(),
                results_bucket: PLACEHOLDER_RESULTS_BUCKET.to_string(),
                scan_prefix: S3Section::default_scan_prefix(),
            },
            macie: MacieSection::default(),
            processing: ProcessingSection::default(),
        }
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PipelineError::config_not_found(path));
            }
            Err(e) => {
                return Err(PipelineError::io(
                    format!("Failed to read config file: {}", path.display()),
                    e,
                ));
            }
        };

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PipelineError::config_malformed(path, e.to_string()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Persist configuration as pretty JSON.
    ///
    /// The document is written to a sibling temp file and renamed over the target,
    /// so readers never observe a partially written file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&tmp_path, content).map_err(|e| {
            PipelineError::io(
                format!("Failed to write config file: {}", tmp_path.display()),
                e,
            )
        })?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(PipelineError::io(
                format!("Failed to replace config file: {}", path.display()),
                e,
            ));
        }
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Return every issue that prevents this configuration from being used.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if is_missing_region(&self.aws.region) {
            issues.push(ConfigIssue::new(ConfigField::Region, IssueKind::MissingOrPlaceholder));
        }

        for (field, bucket) in [
            (ConfigField::ScanBucket, &self.s3.scan_bucket),
            (ConfigField::ResultsBucket, &self.s3.results_bucket),
        ] {
            if bucket.trim().is_empty() || is_placeholder_bucket(bucket) {
                issues.push(ConfigIssue::new(field, IssueKind::MissingOrPlaceholder));
                continue;
            }
            if looks_like_test_bucket(bucket) {
                issues.push(ConfigIssue::new(field, IssueKind::TestLike));
            }
            if !is_valid_bucket_name(bucket) {
                issues.push(ConfigIssue::new(field, IssueKind::InvalidName));
            }
        }

        if !self.s3.scan_bucket.is_empty() && self.s3.scan_bucket == self.s3.results_bucket {
            issues.push(ConfigIssue::new(
                ConfigField::ResultsBucket,
                IssueKind::SameAsScanBucket,
            ));
        }

        if !issues.is_empty() {
            warn!(count = issues.len(), "Configuration has issues");
        }
        issues
    }

    /// Credentials profile, treating an empty string as unset
    pub fn profile(&self) -> Option<&str> {
        self.aws
            .profile
            .as_deref()
            .filter(|profile| !profile.trim().is_empty())
    }

    /// Blocking wait budget
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.macie.max_wait_minutes.saturating_mul(60))
    }

    /// Delay between status polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.macie.poll_interval_seconds.max(1))
    }

    /// Read a field as text, for prompts and summaries
    pub fn field_value(&self, field: ConfigField) -> String {
        match field {
            ConfigField::Region => self.aws.region.clone(),
            ConfigField::ScanBucket => self.s3.scan_bucket.clone(),
            ConfigField::ResultsBucket => self.s3.results_bucket.clone(),
            ConfigField::MaxWaitMinutes => self.macie.max_wait_minutes.to_string(),
        }
    }
}

/// Owns the location of the persisted configuration.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Bind the store to a file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the persisted file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted configuration
    pub fn load(&self) -> Result<PipelineConfig> {
        PipelineConfig::load(&self.path)
    }

    /// Persist a configuration atomically
    pub fn save(&self, config: &PipelineConfig) -> Result<()> {
        config.save(&self.path)
    }

    /// Load, validate, and when needed correct and persist the configuration.
    ///
    /// Nothing is written unless the prompter confirms the corrected values.
    pub fn load_validated<P: ConfigPrompter + ?Sized>(
        &self,
        prompter: &mut P,
    ) -> Result<PipelineConfig> {
        let config = self.load()?;
        let issues = config.validate();
        if issues.is_empty() {
            info!("Configuration check passed");
            return Ok(config);
        }

        let corrected = correct_interactively(&config, &issues, prompter)?;
        self.save(&corrected)?;
        Ok(corrected)
    }
}

/// A configuration field that can be corrected interactively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    /// `aws.region`
    Region,
    /// `s3.scan_bucket`
    ScanBucket,
    /// `s3.results_bucket`
    ResultsBucket,
    /// `macie.max_wait_minutes`
    MaxWaitMinutes,
}

impl ConfigField {
    /// Dotted key of the field in the persisted file
    pub fn key(self) -> &'static str {
        match self {
            Self::Region => "aws.region",
            Self::ScanBucket => "s3.scan_bucket",
            Self::ResultsBucket => "s3.results_bucket",
            Self::MaxWaitMinutes => "macie.max_wait_minutes",
        }
    }

    /// Prompt label shown to the operator
    pub fn label(self) -> &'static str {
        match self {
            Self::Region => "AWS region (e.g. us-east-1, ap-northeast-1)",
            Self::ScanBucket => "Scan bucket (receives extracted text)",
            Self::ResultsBucket => "Results bucket (receives analysis reports)",
            Self::MaxWaitMinutes => "Max wait in minutes (1-300, empty keeps current)",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What is wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Empty or still the template placeholder
    MissingOrPlaceholder,
    /// Name suggests test or example data
    TestLike,
    /// Violates bucket naming rules
    InvalidName,
    /// Results bucket equals the scan bucket
    SameAsScanBucket,
}

/// One reason a configuration cannot be used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Field the issue is about
    pub field: ConfigField,
    /// Nature of the issue
    pub kind: IssueKind,
}

impl ConfigIssue {
    /// Create an issue
    pub const fn new(field: ConfigField, kind: IssueKind) -> Self {
        Self { field, kind }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self.kind {
            IssueKind::MissingOrPlaceholder => "is unset or uses the template default",
            IssueKind::TestLike => "looks like a test or example value",
            IssueKind::InvalidName => "is not a valid bucket name",
            IssueKind::SameAsScanBucket => "must differ from the scan bucket",
        };
        write!(f, "{} {}", self.field.key(), description)
    }
}

#[cfg(test)]
mod tests;
