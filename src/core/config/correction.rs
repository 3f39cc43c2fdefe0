//! Correction of an invalid configuration through a pluggable prompter.
//!
//! [`correct_interactively`] owns the retry budget and the acceptance rules; a
//! [`ConfigPrompter`] only supplies raw answers. The CLI plugs in a terminal prompter,
//! while scripted and refusing prompters cover flag-driven fixes and CI runs.

use std::collections::VecDeque;

use tracing::warn;

use super::validation::{validate_bucket_input, validate_region_input, validate_wait_minutes};
use super::{ConfigField, ConfigIssue, PipelineConfig};
use crate::core::errors::{PipelineError, Result};

/// Attempts allowed per required field.
pub const MAX_ATTEMPTS: usize = 3;

/// Source of corrected values.
pub trait ConfigPrompter {
    /// Present the issues that triggered correction
    fn show_issues(&mut self, config: &PipelineConfig, issues: &[ConfigIssue]);

    /// Ask for a new value of `field`
    fn ask(&mut self, field: ConfigField, current: &str) -> Result<String>;

    /// Report that an answer was rejected; `remaining` attempts are left
    fn reject(&mut self, field: ConfigField, reason: &str, remaining: usize);

    /// Ask the operator to confirm the corrected configuration
    fn confirm(&mut self, config: &PipelineConfig) -> Result<bool>;
}

/// Collect corrected values for every required field and confirm them.
///
/// The input configuration is never modified; the corrected copy is returned only
/// after explicit confirmation, so declining leaves nothing half-applied.
pub fn correct_interactively<P: ConfigPrompter + ?Sized>(
    config: &PipelineConfig,
    issues: &[ConfigIssue],
    prompter: &mut P,
) -> Result<PipelineConfig> {
    prompter.show_issues(config, issues);

    let mut corrected = config.clone();
    corrected.aws.region = prompt_until_valid(
        prompter,
        ConfigField::Region,
        &config.aws.region,
        validate_region_input,
    )?;

    corrected.s3.scan_bucket = prompt_until_valid(
        prompter,
        ConfigField::ScanBucket,
        &config.s3.scan_bucket,
        |value| validate_bucket_input(value, ConfigField::ScanBucket.key()),
    )?;

    let scan_bucket = corrected.s3.scan_bucket.clone();
    corrected.s3.results_bucket = prompt_until_valid(
        prompter,
        ConfigField::ResultsBucket,
        &config.s3.results_bucket,
        |value| {
            validate_bucket_input(value, ConfigField::ResultsBucket.key())?;
            if value == scan_bucket {
                return Err(PipelineError::validation_field(
                    "results bucket must differ from the scan bucket",
                    ConfigField::ResultsBucket.key(),
                ));
            }
            Ok(())
        },
    )?;

    let wait_answer = prompter.ask(
        ConfigField::MaxWaitMinutes,
        &config.macie.max_wait_minutes.to_string(),
    )?;
    let wait_answer = wait_answer.trim();
    if !wait_answer.is_empty() {
        match wait_answer
            .parse::<u64>()
            .ok()
            .filter(|minutes| validate_wait_minutes(*minutes).is_ok())
        {
            Some(minutes) => corrected.macie.max_wait_minutes = minutes,
            None => prompter.reject(
                ConfigField::MaxWaitMinutes,
                "not a number between 1 and 300, keeping the current value",
                0,
            ),
        }
    }

    if !prompter.confirm(&corrected)? {
        warn!("Operator declined the corrected configuration");
        return Err(PipelineError::UserAborted);
    }

    Ok(corrected)
}

fn prompt_until_valid<P, F>(
    prompter: &mut P,
    field: ConfigField,
    current: &str,
    check: F,
) -> Result<String>
where
    P: ConfigPrompter + ?Sized,
    F: Fn(&str) -> Result<()>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let answer = prompter.ask(field, current)?;
        let answer = answer.trim();
        match check(answer) {
            Ok(()) => return Ok(answer.to_string()),
            Err(PipelineError::Validation { message, .. }) => {
                prompter.reject(field, &message, MAX_ATTEMPTS - attempt);
            }
            Err(other) => return Err(other),
        }
    }

    Err(PipelineError::validation_exhausted(field.key(), MAX_ATTEMPTS))
}

/// Prompter that answers from a fixed script.
///
/// Used for flag-driven fixes (`validate-config --fix`) and in tests. Running out of
/// answers aborts the correction.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    approve: bool,
    /// Fields asked, in order
    pub asked: Vec<ConfigField>,
    /// Rejections reported, in order
    pub rejections: Vec<(ConfigField, String)>,
}

impl ScriptedPrompter {
    /// Script the answers and the final confirmation
    pub fn new<I, S>(answers: I, approve: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            approve,
            asked: Vec::new(),
            rejections: Vec::new(),
        }
    }
}

impl ConfigPrompter for ScriptedPrompter {
    fn show_issues(&mut self, _config: &PipelineConfig, issues: &[ConfigIssue]) {
        for issue in issues {
            warn!(%issue, "Configuration issue");
        }
    }

    fn ask(&mut self, field: ConfigField, _current: &str) -> Result<String> {
        self.asked.push(field);
        self.answers.pop_front().ok_or(PipelineError::UserAborted)
    }

    fn reject(&mut self, field: ConfigField, reason: &str, _remaining: usize) {
        self.rejections.push((field, reason.to_string()));
    }

    fn confirm(&mut self, _config: &PipelineConfig) -> Result<bool> {
        Ok(self.approve)
    }
}

/// Prompter for unattended runs: any issue is fatal.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefusingPrompter;

impl ConfigPrompter for RefusingPrompter {
    fn show_issues(&mut self, _config: &PipelineConfig, issues: &[ConfigIssue]) {
        for issue in issues {
            warn!(%issue, "Configuration issue (non-interactive)");
        }
    }

    fn ask(&mut self, field: ConfigField, _current: &str) -> Result<String> {
        Err(PipelineError::validation_exhausted(field.key(), 0))
    }

    fn reject(&mut self, _field: ConfigField, _reason: &str, _remaining: usize) {}

    fn confirm(&mut self, _config: &PipelineConfig) -> Result<bool> {
        Ok(false)
    }
}
