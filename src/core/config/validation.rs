//! Validation helpers for configuration values.

use crate::core::errors::{PipelineError, Result};

/// Bucket names shipped in the configuration template.
pub const PLACEHOLDER_SCAN_BUCKET: &str = "your-macie-scan-bucket";
/// Results bucket name shipped in the configuration template.
pub const PLACEHOLDER_RESULTS_BUCKET: &str = "your-macie-results-bucket";
/// Region shipped in the configuration template.
pub const PLACEHOLDER_REGION: &str = "your-region";

const TEST_LIKE_MARKERS: [&str; 2] = ["test", "example"];

/// Check a name against the S3 bucket naming rules.
///
/// 3-63 characters drawn from `[a-z0-9.-]`, no leading or trailing hyphen,
/// no consecutive dots.
pub fn is_valid_bucket_name(name: &str) -> bool {
    if name.len() < 3 || name.len() > 63 {
        return false;
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-')
    {
        return false;
    }
    if name.starts_with('-') || name.ends_with('-') {
        return false;
    }
    !name.contains("..")
}

/// Validate a bucket name, naming the offending field in the error.
pub fn validate_bucket_name(name: &str, field: &str) -> Result<()> {
    if is_valid_bucket_name(name) {
        Ok(())
    } else {
        Err(PipelineError::validation_field(
            format!(
                "'{name}' is not a valid bucket name (3-63 chars of a-z, 0-9, '.', '-'; \
                 no leading/trailing '-', no '..')"
            ),
            field,
        ))
    }
}

/// True for either bucket placeholder from the template.
pub fn is_placeholder_bucket(name: &str) -> bool {
    name == PLACEHOLDER_SCAN_BUCKET || name == PLACEHOLDER_RESULTS_BUCKET
}

/// True when the name contains a marker typical of test or sample data.
pub fn looks_like_test_bucket(name: &str) -> bool {
    let lowered = name.to_lowercase();
    TEST_LIKE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// True when a region value is unset or still the template placeholder.
pub fn is_missing_region(region: &str) -> bool {
    let trimmed = region.trim();
    trimmed.is_empty() || trimmed == PLACEHOLDER_REGION
}

/// Acceptance rule for a region typed during interactive correction.
pub fn validate_region_input(region: &str) -> Result<()> {
    let trimmed = region.trim();
    if is_missing_region(trimmed) || trimmed.len() <= 5 {
        return Err(PipelineError::validation_field(
            "region must be set and look like 'us-east-1'",
            "aws.region",
        ));
    }
    Ok(())
}

/// Acceptance rule for a bucket typed during interactive correction.
pub fn validate_bucket_input(name: &str, field: &str) -> Result<()> {
    if is_placeholder_bucket(name) {
        return Err(PipelineError::validation_field(
            "bucket name is still the template placeholder",
            field,
        ));
    }
    validate_bucket_name(name, field)?;
    if looks_like_test_bucket(name) {
        return Err(PipelineError::validation_field(
            "bucket name looks like test or example data",
            field,
        ));
    }
    Ok(())
}

/// Validate that a wait budget is within the accepted 1..=300 minute range.
pub fn validate_wait_minutes(value: u64) -> Result<()> {
    if !(1..=300).contains(&value) {
        return Err(PipelineError::validation_field(
            "max wait must be between 1 and 300 minutes",
            "macie.max_wait_minutes",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_ordinary_bucket_names() {
        for name in ["abc", "loki-scan-bucket", "logs.prod.eu-west-1", "a1-b2.c3"] {
            assert!(is_valid_bucket_name(name), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_bucket_names() {
        let too_long = "a".repeat(64);
        for name in [
            "ab",
            too_long.as_str(),
            "Loki-Bucket",
            "-leading",
            "trailing-",
            "double..dot",
            "under_score",
            "space bucket",
        ] {
            assert!(!is_valid_bucket_name(name), "{name} should be rejected");
        }
    }

    #[test]
    fn sixty_three_characters_is_the_limit() {
        assert!(is_valid_bucket_name(&"a".repeat(63)));
    }

    #[test]
    fn test_markers_are_case_insensitive() {
        assert!(looks_like_test_bucket("my-TEST-bucket"));
        assert!(looks_like_test_bucket("example-logs"));
        assert!(!looks_like_test_bucket("prod-logs"));
    }

    #[test]
    fn region_input_rules() {
        assert!(validate_region_input("us-east-1").is_ok());
        assert!(validate_region_input("  ").is_err());
        assert!(validate_region_input("us-1").is_err());
        assert!(validate_region_input(PLACEHOLDER_REGION).is_err());
    }

    #[test]
    fn bucket_input_rejects_placeholders_and_test_names() {
        assert!(validate_bucket_input(PLACEHOLDER_SCAN_BUCKET, "s3.scan_bucket").is_err());
        assert!(validate_bucket_input("test-bucket", "s3.scan_bucket").is_err());
        assert!(validate_bucket_input("Bad_Name", "s3.scan_bucket").is_err());
        assert!(validate_bucket_input("prod-loki-scan", "s3.scan_bucket").is_ok());
    }

    #[test]
    fn wait_minutes_bounds() {
        assert!(validate_wait_minutes(0).is_err());
        assert!(validate_wait_minutes(1).is_ok());
        assert!(validate_wait_minutes(300).is_ok());
        assert!(validate_wait_minutes(301).is_err());
    }

    proptest! {
        #[test]
        fn generated_valid_names_pass(name in "[a-z0-9][a-z0-9-]{1,61}[a-z0-9]") {
            prop_assert!(is_valid_bucket_name(&name));
        }

        #[test]
        fn any_uppercase_letter_fails(prefix in "[a-z0-9]{1,20}", upper in "[A-Z]", suffix in "[a-z0-9]{1,20}") {
            let name = format!("{prefix}{upper}{suffix}");
            prop_assert!(!is_valid_bucket_name(&name));
        }

        #[test]
        fn disallowed_characters_fail(prefix in "[a-z]{2,10}", bad in "[_ /A-Z!@#]", suffix in "[a-z]{2,10}") {
            let name = format!("{prefix}{bad}{suffix}");
            prop_assert!(!is_valid_bucket_name(&name));
        }

        #[test]
        fn consecutive_dots_fail(left in "[a-z0-9]{1,20}", right in "[a-z0-9]{1,20}") {
            let name = format!("{left}..{right}");
            prop_assert!(!is_valid_bucket_name(&name));
        }
    }
}
