//! Terminal display functions
//!
//! Colored summaries and tables for submissions, reports, extraction and preflight runs.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use loki_macie_rs::classification::ClassificationJob;
use loki_macie_rs::extract::ExtractionReport;
use loki_macie_rs::pipeline::{CheckStatus, PreflightReport, SubmittedJob};
use loki_macie_rs::report::ReportArtifacts;

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Print the job-created summary and the follow-up command.
pub fn display_submitted(submitted: &SubmittedJob) {
    let job = &submitted.job;
    println!("{}", "✅ Classification job created".bright_green().bold());
    println!();

    #[derive(Tabled)]
    /// Row of the submission summary table.
    struct SummaryRow {
        field: &'static str,
        value: String,
    }

    let rows = vec![
        SummaryRow {
            field: "Job ID",
            value: job.job_id.clone(),
        },
        SummaryRow {
            field: "Job name",
            value: job.job_name.clone(),
        },
        SummaryRow {
            field: "Created",
            value: or_dash(job.created_at.map(|t| t.to_rfc3339())),
        },
        SummaryRow {
            field: "Files extracted",
            value: submitted.extracted_files.to_string(),
        },
        SummaryRow {
            field: "Objects uploaded",
            value: submitted.uploaded_objects.to_string(),
        },
        SummaryRow {
            field: "Scan location",
            value: submitted.scan_location.clone(),
        },
        SummaryRow {
            field: "Results location",
            value: submitted.results_location.clone(),
        },
        SummaryRow {
            field: "Expected wait",
            value: format!("up to {} minutes", submitted.expected_wait_minutes),
        },
    ];

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");
    println!();
    println!("{} {}", "🔗 Console:".bright_blue().bold(), submitted.console_url.cyan());
    display_follow_up(submitted);
}

/// Print the command that analyzes the job later.
pub fn display_follow_up(submitted: &SubmittedJob) {
    println!("{}", "📝 When the job has finished, run:".bright_blue().bold());
    println!("   {}", submitted.follow_up_command.cyan());
}

/// Print why a blocking run stopped without a report.
pub fn display_unfinished(submitted: &SubmittedJob, job: &ClassificationJob, cancelled: bool) {
    if cancelled {
        println!("{}", "⏹  Wait interrupted, the job keeps running".yellow().bold());
    } else {
        println!(
            "{} {}",
            "⏱  Job did not finish in time, status:".yellow().bold(),
            job.status.to_string().yellow()
        );
    }
    println!("   Job ID: {}", job.job_id.cyan());
    display_follow_up(submitted);
}

/// Print the report totals and where the files went.
pub fn display_report(artifacts: &ReportArtifacts) {
    let report = &artifacts.report;
    let analysis = &report.findings_analysis;
    let severity = &analysis.severity_distribution;

    println!("{}", "📊 Findings report".bright_green().bold());
    println!(
        "   Total findings: {}",
        analysis.total_findings.to_string().bold()
    );
    println!(
        "   High: {}  Medium: {}  Low: {}  Unknown: {}",
        severity.high.to_string().red(),
        severity.medium.to_string().yellow(),
        severity.low.to_string().green(),
        severity.unknown.to_string().dimmed()
    );
    println!("   Report: {}", artifacts.json_path.display().to_string().cyan());
    println!("   Summary: {}", artifacts.summary_path.display().to_string().cyan());
    if let Some(location) = &artifacts.remote_location {
        println!("   Published: {}", location.cyan());
    }
    if !report.warnings.is_empty() {
        println!();
        println!("{}", "⚠️  Report is based on incomplete data:".yellow().bold());
        for warning in &report.warnings {
            println!("   • {warning}");
        }
    }
    println!();
    println!("{}", "💡 Recommendations:".bright_blue().bold());
    for (i, recommendation) in report.recommendations.iter().enumerate() {
        println!("   {}. {}", i + 1, recommendation);
    }
}

/// Print one row per chunk plus totals.
pub fn display_extraction(report: &ExtractionReport, report_path: &Path) {
    #[derive(Tabled)]
    /// Row of the extraction table.
    struct ExtractionRow {
        chunk: String,
        status: String,
        text_file: String,
        bytes: String,
    }

    let rows = report
        .extracted
        .iter()
        .map(|file| ExtractionRow {
            chunk: file.source_name.clone(),
            status: "ok".green().to_string(),
            text_file: file.file_name(),
            bytes: file.size_bytes.to_string(),
        })
        .chain(report.failures.iter().map(|failure| ExtractionRow {
            chunk: failure.source_name.clone(),
            status: "failed".red().to_string(),
            text_file: failure.message.clone(),
            bytes: "-".to_string(),
        }));

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");
    println!();
    println!(
        "{} {} of {} chunks extracted, {} failed",
        "📦".bright_blue(),
        report.extracted.len().to_string().bright_green(),
        report.total(),
        report.failures.len().to_string().red()
    );
    println!("   Report: {}", report_path.display().to_string().cyan());
}

/// Print the preflight table.
pub fn display_preflight(report: &PreflightReport) {
    #[derive(Tabled)]
    /// Row of the preflight table.
    struct CheckRow {
        check: String,
        status: String,
        detail: String,
    }

    let rows = report.checks.iter().map(|check| CheckRow {
        check: check.name.clone(),
        status: match check.status {
            CheckStatus::Pass => "pass".green().to_string(),
            CheckStatus::Warn => "warn".yellow().to_string(),
            CheckStatus::Fail => "fail".red().to_string(),
        },
        detail: check.detail.clone(),
    });

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");
    println!();
    if report.has_failures() {
        println!("{}", "❌ Preflight found blocking problems".red().bold());
    } else {
        println!("{}", "✅ Ready to run".bright_green().bold());
    }
}

/// Spinner shown while waiting on the classification job.
pub fn wait_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg} [{elapsed_precise}]") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
