//! Terminal prompter for interactive configuration correction.

use std::io;

use dialoguer::{theme::ColorfulTheme, Input};
use owo_colors::OwoColorize;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use loki_macie_rs::core::config::{ConfigField, ConfigIssue, ConfigPrompter, PipelineConfig};
use loki_macie_rs::core::errors::{PipelineError, Result};

/// Asks for corrected values on the controlling terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

fn prompt_error(err: dialoguer::Error) -> PipelineError {
    PipelineError::io("Prompt failed", io::Error::new(io::ErrorKind::Other, err.to_string()))
}

#[derive(Tabled)]
struct ConfigRow {
    setting: &'static str,
    value: String,
}

impl ConfigPrompter for TerminalPrompter {
    fn show_issues(&mut self, _config: &PipelineConfig, issues: &[ConfigIssue]) {
        eprintln!("{}", "⚠️  Configuration needs attention:".yellow().bold());
        for issue in issues {
            eprintln!("   • {issue}");
        }
        eprintln!();
    }

    fn ask(&mut self, field: ConfigField, current: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(field.label())
            .with_initial_text(current)
            .allow_empty(field == ConfigField::MaxWaitMinutes)
            .interact_text()
            .map_err(prompt_error)
    }

    fn reject(&mut self, field: ConfigField, reason: &str, remaining: usize) {
        eprintln!(
            "{} {}: {} ({} attempts left)",
            "✗".red(),
            field.key(),
            reason,
            remaining
        );
    }

    fn confirm(&mut self, config: &PipelineConfig) -> Result<bool> {
        let rows = [
            ConfigField::Region,
            ConfigField::ScanBucket,
            ConfigField::ResultsBucket,
            ConfigField::MaxWaitMinutes,
        ]
        .into_iter()
        .map(|field| ConfigRow {
            setting: field.key(),
            value: config.field_value(field),
        });

        let mut table = Table::new(rows);
        table.with(TableStyle::rounded());
        eprintln!("{table}");

        let answer = Input::<String>::with_theme(&self.theme)
            .with_prompt("Type 'yes' to save this configuration")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)?;
        Ok(confirms_save(&answer))
    }
}

/// Only an explicit `yes` saves; a bare Enter does not.
fn confirms_save(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}
