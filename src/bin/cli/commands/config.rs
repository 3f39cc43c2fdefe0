//! Configuration management commands.
//!
//! `init-config` writes the template; `validate-config` reports issues and, with
//! `--fix`, corrects them from flags or prompts and saves the result.

use anyhow::bail;
use owo_colors::OwoColorize;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use loki_macie_rs::core::config::{
    correct_interactively, ConfigField, ConfigStore, PipelineConfig, ScriptedPrompter,
};

use crate::cli::args::{InitConfigArgs, ValidateConfigArgs};
use crate::cli::prompt::TerminalPrompter;

/// Initialize a configuration file from the template
pub async fn init_config(args: InitConfigArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "Configuration file already exists: {}. Use --force to overwrite or choose a different name with --output",
            args.output.display()
        );
    }

    PipelineConfig::template().save(&args.output)?;

    println!(
        "{} {}",
        "✅ Configuration saved to:".bright_green().bold(),
        args.output.display().to_string().cyan()
    );
    println!();
    println!("{}", "📝 Next steps:".bright_blue().bold());
    println!("   1. Replace the placeholder region and bucket names");
    println!(
        "   2. Check the setup with: {}",
        format!("loki-macie doctor --config {}", args.output.display()).cyan()
    );
    println!(
        "   3. Run with: {}",
        format!("loki-macie submit --config {}", args.output.display()).cyan()
    );
    Ok(())
}

/// Validate a configuration file, fixing it on request
pub async fn validate_config(args: ValidateConfigArgs) -> anyhow::Result<()> {
    println!(
        "{} {}",
        "🔍 Validating configuration:".bright_blue().bold(),
        args.config.display().to_string().cyan()
    );
    println!();

    let store = ConfigStore::new(&args.config);
    let config = store.load()?;
    let issues = config.validate();

    if issues.is_empty() {
        println!("{}", "✅ Configuration file is valid!".bright_green().bold());
        println!();
        display_config_summary(&config);
        return Ok(());
    }

    eprintln!("{}", "❌ Configuration has issues:".red().bold());
    for issue in &issues {
        eprintln!("   • {issue}");
    }

    if !args.fix {
        println!();
        println!(
            "{}",
            "💡 Tip: rerun with --fix to correct and save the file".dimmed()
        );
        bail!("Configuration validation failed: {} issue(s)", issues.len());
    }

    if args.has_any_fix_value() && !args.has_scripted_fix() {
        bail!(
            "--fix with values needs all of --region, --scan-bucket and --results-bucket (missing {})",
            args.missing_fix_values().join(", ")
        );
    }

    let corrected = if args.has_scripted_fix() {
        let answers = [
            args.region.clone().unwrap_or_default(),
            args.scan_bucket.clone().unwrap_or_default(),
            args.results_bucket.clone().unwrap_or_default(),
            args.max_wait.map(|m| m.to_string()).unwrap_or_default(),
        ];
        correct_interactively(&config, &issues, &mut ScriptedPrompter::new(answers, true))?
    } else {
        correct_interactively(&config, &issues, &mut TerminalPrompter::new())?
    };
    store.save(&corrected)?;

    println!();
    println!(
        "{} {}",
        "✅ Corrected configuration saved to:".bright_green().bold(),
        args.config.display().to_string().cyan()
    );
    display_config_summary(&corrected);
    Ok(())
}

fn display_config_summary(config: &PipelineConfig) {
    /// Row used when printing the configuration summary.
    #[derive(Tabled)]
    struct SettingRow {
        setting: &'static str,
        value: String,
    }

    let mut rows: Vec<SettingRow> = [
        ConfigField::Region,
        ConfigField::ScanBucket,
        ConfigField::ResultsBucket,
        ConfigField::MaxWaitMinutes,
    ]
    .into_iter()
    .map(|field| SettingRow {
        setting: field.key(),
        value: config.field_value(field),
    })
    .collect();
    rows.push(SettingRow {
        setting: "aws.profile",
        value: config.profile().unwrap_or("-").to_string(),
    });
    rows.push(SettingRow {
        setting: "processing.chunk_directory",
        value: config.processing.chunk_directory.display().to_string(),
    });
    rows.push(SettingRow {
        setting: "processing.decoder_path",
        value: config.processing.decoder_path.display().to_string(),
    });

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");
}
