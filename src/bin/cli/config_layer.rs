//! Configuration Layer Management
//!
//! Loads the persisted configuration, runs the correction flow when it has issues, and
//! layers command-line overrides on top for the current run.

use tracing::info;

use loki_macie_rs::core::config::{ConfigPrompter, ConfigStore, PipelineConfig, RefusingPrompter};

use crate::cli::args::ConfigOverrideArgs;
use crate::cli::prompt::TerminalPrompter;

/// Trait for merging configuration layers
pub trait ConfigMerge<T> {
    /// Merge another layer into this one, with the other taking priority
    fn merge_with(&mut self, other: T);
}

impl ConfigMerge<&ConfigOverrideArgs> for PipelineConfig {
    fn merge_with(&mut self, overrides: &ConfigOverrideArgs) {
        if let Some(chunk_dir) = &overrides.chunk_dir {
            self.processing.chunk_directory = chunk_dir.clone();
        }
        if let Some(output_dir) = &overrides.output_dir {
            self.processing.output_directory = output_dir.clone();
        }
        if let Some(decoder) = &overrides.decoder {
            self.processing.decoder_path = decoder.clone();
        }
        if let Some(region) = &overrides.region {
            self.aws.region = region.clone();
        }
        if let Some(profile) = &overrides.profile {
            self.aws.profile = Some(profile.clone());
        }
        if let Some(max_wait) = overrides.max_wait {
            self.macie.max_wait_minutes = max_wait;
        }
    }
}

/// Load, validate (correcting through the terminal when allowed) and apply overrides.
pub fn load_configuration(overrides: &ConfigOverrideArgs) -> anyhow::Result<PipelineConfig> {
    let store = ConfigStore::new(&overrides.config);
    let mut prompter: Box<dyn ConfigPrompter> = if overrides.non_interactive {
        Box::new(RefusingPrompter)
    } else {
        Box::new(TerminalPrompter::new())
    };

    let mut config = store.load_validated(prompter.as_mut())?;
    config.merge_with(overrides);
    Ok(config)
}

/// Load without validation and apply overrides, for read-only commands.
pub fn load_unvalidated(overrides: &ConfigOverrideArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = ConfigStore::new(&overrides.config).load()?;
    config.merge_with(overrides);
    Ok(config)
}

/// Configuration for local-only commands: the file when present, defaults otherwise.
pub fn load_local(overrides: &ConfigOverrideArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = if overrides.config.exists() {
        ConfigStore::new(&overrides.config).load()?
    } else {
        info!(path = %overrides.config.display(), "No configuration file, using defaults");
        PipelineConfig::template()
    };
    config.merge_with(overrides);
    Ok(config)
}
