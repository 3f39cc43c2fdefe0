//! Rule-based remediation advice derived from the aggregated findings.
//!
//! Rules are evaluated in a fixed order and every rule that fires contributes one line,
//! so the output order is stable for a given input.

use super::analysis::{distinct_objects, FileDistribution, FindingsAnalysis};

/// Category names that count as personal data.
pub const PII_CATEGORIES: &[&str] = &["PII", "PERSONAL_INFORMATION"];

/// Category name for financial data.
pub const FINANCIAL_CATEGORY: &str = "FINANCIAL_INFORMATION";

/// Category name for secrets and keys.
pub const CREDENTIALS_CATEGORY: &str = "CREDENTIALS";

/// MEDIUM findings above this count call for batch remediation.
pub const MEDIUM_BATCH_THRESHOLD: u64 = 10;

/// Distinct affected objects above this count call for automation.
pub const AUTOMATION_FILE_THRESHOLD: usize = 50;

pub(crate) const PII_ADVICE: &str =
    "Personal information (PII) found: mask or encrypt this data at rest";
pub(crate) const FINANCIAL_ADVICE: &str =
    "Financial information found: tighten access controls and enable audit logging";
pub(crate) const CREDENTIALS_ADVICE: &str =
    "Credentials found: rotate the affected keys immediately and review secret management";
pub(crate) const MEDIUM_ADVICE: &str =
    "Many medium-severity findings: plan batch remediation";
pub(crate) const AUTOMATION_ADVICE: &str =
    "Findings span many files: automate data classification and protection policies";
pub(crate) const CLEAN_ADVICE: &str =
    "No sensitive data found: re-scan periodically to stay compliant";
pub(crate) const INCOMPLETE_ADVICE: &str =
    "Scan results incomplete: some findings could not be read, re-run analyze before acting on this report";

/// Ordered recommendations for a findings summary.
pub fn recommend(analysis: &FindingsAnalysis, files: &FileDistribution) -> Vec<String> {
    let data_types = &analysis.data_types;
    let severity = &analysis.severity_distribution;
    let mut recommendations = Vec::new();

    if PII_CATEGORIES.iter().any(|category| data_types.contains_key(*category)) {
        recommendations.push(PII_ADVICE.to_string());
    }
    if data_types.contains_key(FINANCIAL_CATEGORY) {
        recommendations.push(FINANCIAL_ADVICE.to_string());
    }
    if data_types.contains_key(CREDENTIALS_CATEGORY) {
        recommendations.push(CREDENTIALS_ADVICE.to_string());
    }
    if severity.high > 0 {
        recommendations.push(format!(
            "{} high-severity findings: handle these first",
            severity.high
        ));
    }
    if severity.medium > MEDIUM_BATCH_THRESHOLD {
        recommendations.push(MEDIUM_ADVICE.to_string());
    }
    if distinct_objects(files) > AUTOMATION_FILE_THRESHOLD {
        recommendations.push(AUTOMATION_ADVICE.to_string());
    }

    if recommendations.is_empty() {
        recommendations.push(CLEAN_ADVICE.to_string());
    }
    recommendations
}

/// Adjust advice for a finding set known to be partial.
///
/// The clean verdict cannot stand when findings are missing, so it is replaced.
pub fn mark_incomplete(recommendations: &mut Vec<String>) {
    recommendations.retain(|advice| advice != CLEAN_ADVICE);
    recommendations.push(INCOMPLETE_ADVICE.to_string());
}
