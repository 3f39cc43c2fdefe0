use thiserror::Error;

/// Failures while writing the JSON report or rendering its text summary.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Summary template error: {0}")]
    Template(#[from] handlebars::TemplateError),
    #[error("Summary render error: {0}")]
    Render(#[from] handlebars::RenderError),
    #[error("Report IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
