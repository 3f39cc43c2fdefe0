//! `extract`: decode chunks locally without any AWS call.

use std::sync::Arc;

use anyhow::bail;

use loki_macie_rs::{CommandDecoder, Extractor, RunStamp};

use crate::cli::args::ExtractArgs;
use crate::cli::config_layer::load_local;
use crate::cli::display::display_extraction;

/// Decode every chunk and write `extraction_report_<stamp>.json` next to the text files
pub async fn extract_command(args: ExtractArgs) -> anyhow::Result<()> {
    let config = load_local(&args.overrides)?;
    let processing = &config.processing;

    let decoder = CommandDecoder::new(&processing.decoder_path);
    decoder.check_available()?;

    let stamp = RunStamp::now();
    let extractor = Extractor::new(Arc::new(decoder), processing.workers);
    let report = extractor
        .extract_with_report(
            &processing.chunk_directory,
            &processing.output_directory,
            stamp.started_at(),
        )
        .await?;

    let report_path = processing
        .output_directory
        .join(format!("extraction_report_{}.json", stamp.file_stamp()));
    tokio::fs::write(&report_path, serde_json::to_string_pretty(&report)?).await?;

    display_extraction(&report, &report_path);
    if report.extracted.is_empty() {
        bail!("no chunk in {} was decoded", processing.chunk_directory.display());
    }
    Ok(())
}
