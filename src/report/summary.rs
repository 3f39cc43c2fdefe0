//! Plain-text summary rendered from an already-built report.

use handlebars::{Handlebars, Helper, HelperResult, RenderContext, RenderError};
use serde_json::Value;

use super::error::ReportError;
use super::AnalysisReport;

pub(super) const SUMMARY_TEMPLATE_NAME: &str = "text_summary";

/// Renders [`AnalysisReport`]s as human-readable text.
pub struct SummaryRenderer {
    handlebars: Handlebars<'static>,
}

impl SummaryRenderer {
    /// Register the summary template and its helpers
    pub fn new() -> Result<Self, ReportError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        register_or_dash_helper(&mut handlebars);
        register_inc_helper(&mut handlebars);
        handlebars.register_template_string(SUMMARY_TEMPLATE_NAME, include_str!("./summary.hbs"))?;
        Ok(Self { handlebars })
    }

    /// Render the summary text for `report`
    pub fn render(&self, report: &AnalysisReport) -> Result<String, ReportError> {
        let data = serde_json::to_value(report)?;
        Ok(self.handlebars.render(SUMMARY_TEMPLATE_NAME, &data)?)
    }
}

/// Whole numbers without a fraction, `-` for missing values.
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) if text.is_empty() => "-".to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => format!("{}", float as i64),
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}

/// Register the `or_dash` value helper
fn register_or_dash_helper(handlebars: &mut Handlebars<'static>) {
    handlebars.register_helper(
        "or_dash",
        Box::new(
            |h: &Helper,
             _: &Handlebars,
             _: &handlebars::Context,
             _: &mut RenderContext,
             out: &mut dyn handlebars::Output|
             -> HelperResult {
                let rendered = h
                    .param(0)
                    .map_or_else(|| "-".to_string(), |v| display_value(v.value()));
                out.write(&rendered)?;
                Ok(())
            },
        ),
    );
}

/// Register the `inc` helper for one-based numbering
fn register_inc_helper(handlebars: &mut Handlebars<'static>) {
    handlebars.register_helper(
        "inc",
        Box::new(
            |h: &Helper,
             _: &Handlebars,
             _: &handlebars::Context,
             _: &mut RenderContext,
             out: &mut dyn handlebars::Output|
             -> HelperResult {
                let index = h
                    .param(0)
                    .and_then(|v| v.value().as_u64())
                    .ok_or_else(|| RenderError::new("inc helper requires a numeric parameter"))?;
                out.write(&(index + 1).to_string())?;
                Ok(())
            },
        ),
    );
}
