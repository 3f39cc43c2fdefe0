use super::*;
use crate::core::errors::PipelineError;
use tempfile::tempdir;

fn valid_config() -> PipelineConfig {
    let mut config = PipelineConfig::template();
    config.aws.region = "us-east-1".to_string();
    config.s3.scan_bucket = "prod-loki-scan".to_string();
    config.s3.results_bucket = "prod-loki-results".to_string();
    config
}

fn issue_fields(config: &PipelineConfig) -> Vec<(ConfigField, IssueKind)> {
    config
        .validate()
        .into_iter()
        .map(|issue| (issue.field, issue.kind))
        .collect()
}

#[test]
fn valid_config_has_no_issues() {
    assert!(valid_config().validate().is_empty());
}

#[test]
fn template_reports_every_placeholder() {
    let fields = issue_fields(&PipelineConfig::template());
    assert_eq!(
        fields,
        vec![
            (ConfigField::Region, IssueKind::MissingOrPlaceholder),
            (ConfigField::ScanBucket, IssueKind::MissingOrPlaceholder),
            (ConfigField::ResultsBucket, IssueKind::MissingOrPlaceholder),
        ]
    );
}

#[test]
fn empty_region_is_an_issue() {
    let mut config = valid_config();
    config.aws.region = String::new();
    assert_eq!(
        issue_fields(&config),
        vec![(ConfigField::Region, IssueKind::MissingOrPlaceholder)]
    );
}

#[test]
fn test_like_bucket_names_are_flagged() {
    let mut config = valid_config();
    config.s3.scan_bucket = "my-test-bucket".to_string();
    config.s3.results_bucket = "example-results".to_string();
    assert_eq!(
        issue_fields(&config),
        vec![
            (ConfigField::ScanBucket, IssueKind::TestLike),
            (ConfigField::ResultsBucket, IssueKind::TestLike),
        ]
    );
}

#[test]
fn identical_buckets_are_flagged_on_results_bucket() {
    let mut config = valid_config();
    config.s3.results_bucket = config.s3.scan_bucket.clone();
    assert_eq!(
        issue_fields(&config),
        vec![(ConfigField::ResultsBucket, IssueKind::SameAsScanBucket)]
    );
}

#[test]
fn malformed_bucket_name_is_flagged() {
    let mut config = valid_config();
    config.s3.scan_bucket = "Prod_Scan".to_string();
    assert_eq!(
        issue_fields(&config),
        vec![(ConfigField::ScanBucket, IssueKind::InvalidName)]
    );
}

#[test]
fn load_reports_missing_file() {
    let dir = tempdir().unwrap();
    let err = PipelineConfig::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigNotFound { .. }));
}

#[test]
fn load_reports_malformed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ \"aws\": ").unwrap();
    let err = PipelineConfig::load(&path).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigMalformed { .. }));
}

#[test]
fn load_accepts_the_minimal_persisted_shape() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
  "aws": {"region": "ap-northeast-1", "profile": ""},
  "s3": {"scan_bucket": "prod-loki-scan", "results_bucket": "prod-loki-results", "scan_prefix": "loki-complete"},
  "macie": {"max_wait_minutes": 45},
  "processing": {"chunk_directory": "./lokichunk", "output_directory": "./extracted_texts"}
}"#,
    )
    .unwrap();

    let config = PipelineConfig::load(&path).unwrap();
    assert_eq!(config.aws.region, "ap-northeast-1");
    assert_eq!(config.profile(), None);
    assert_eq!(config.macie.max_wait_minutes, 45);
    assert_eq!(config.macie.poll_interval_seconds, 30);
    assert_eq!(config.processing.workers, 4);
    assert_eq!(config.max_wait().as_secs(), 45 * 60);
}

#[test]
fn save_then_load_preserves_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    let config = valid_config();
    config.save(&path).unwrap();

    assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    assert!(!dir.path().join(".config.json.tmp").exists());
}

#[test]
fn correction_accepts_valid_answers() {
    let mut prompter = ScriptedPrompter::new(
        ["eu-west-1", "prod-loki-scan", "prod-loki-results", "90"],
        true,
    );
    let template = PipelineConfig::template();
    let issues = template.validate();

    let corrected = correct_interactively(&template, &issues, &mut prompter).unwrap();
    assert_eq!(corrected.aws.region, "eu-west-1");
    assert_eq!(corrected.s3.scan_bucket, "prod-loki-scan");
    assert_eq!(corrected.s3.results_bucket, "prod-loki-results");
    assert_eq!(corrected.macie.max_wait_minutes, 90);
    assert!(corrected.validate().is_empty());
    assert!(prompter.rejections.is_empty());
}

#[test]
fn correction_keeps_wait_when_answer_out_of_range() {
    let mut prompter = ScriptedPrompter::new(
        ["eu-west-1", "prod-loki-scan", "prod-loki-results", "999"],
        true,
    );
    let template = PipelineConfig::template();
    let corrected = correct_interactively(&template, &[], &mut prompter).unwrap();
    assert_eq!(corrected.macie.max_wait_minutes, 60);
    assert_eq!(prompter.rejections.len(), 1);
    assert_eq!(prompter.rejections[0].0, ConfigField::MaxWaitMinutes);
}

#[test]
fn correction_fails_after_three_bad_region_answers() {
    let mut prompter = ScriptedPrompter::new(["", "x", "your-region", "us-east-1"], true);
    let err = correct_interactively(&PipelineConfig::template(), &[], &mut prompter).unwrap_err();

    match err {
        PipelineError::ValidationExhausted { field, attempts } => {
            assert_eq!(field, "aws.region");
            assert_eq!(attempts, MAX_ATTEMPTS);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(prompter.asked, vec![ConfigField::Region; 3]);
}

#[test]
fn equal_buckets_reprompt_the_results_bucket_only() {
    let mut prompter = ScriptedPrompter::new(
        [
            "us-west-2",
            "prod-loki-scan",
            "prod-loki-scan",
            "prod-loki-results",
            "",
        ],
        true,
    );
    let corrected =
        correct_interactively(&PipelineConfig::template(), &[], &mut prompter).unwrap();

    assert_eq!(corrected.s3.results_bucket, "prod-loki-results");
    assert_eq!(
        prompter.asked,
        vec![
            ConfigField::Region,
            ConfigField::ScanBucket,
            ConfigField::ResultsBucket,
            ConfigField::ResultsBucket,
            ConfigField::MaxWaitMinutes,
        ]
    );
    assert_eq!(prompter.rejections.len(), 1);
    assert_eq!(prompter.rejections[0].0, ConfigField::ResultsBucket);
}

#[test]
fn declining_confirmation_aborts_without_persisting() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    let template = PipelineConfig::template();
    template.save(&path).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let store = ConfigStore::new(&path);
    let mut prompter = ScriptedPrompter::new(
        ["us-east-1", "prod-loki-scan", "prod-loki-results", ""],
        false,
    );
    let err = store.load_validated(&mut prompter).unwrap_err();

    assert!(matches!(err, PipelineError::UserAborted));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn confirmed_correction_is_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    PipelineConfig::template().save(&path).unwrap();

    let store = ConfigStore::new(&path);
    let mut prompter = ScriptedPrompter::new(
        ["us-east-1", "prod-loki-scan", "prod-loki-results", ""],
        true,
    );
    let corrected = store.load_validated(&mut prompter).unwrap();

    assert_eq!(store.load().unwrap(), corrected);
}

#[test]
fn valid_config_skips_the_prompter() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    valid_config().save(&path).unwrap();

    let mut prompter = RefusingPrompter;
    let config = ConfigStore::new(&path)
        .load_validated(&mut prompter)
        .unwrap();
    assert_eq!(config, valid_config());
}

#[test]
fn refusing_prompter_turns_issues_into_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    PipelineConfig::template().save(&path).unwrap();

    let err = ConfigStore::new(&path)
        .load_validated(&mut RefusingPrompter)
        .unwrap_err();
    assert!(matches!(err, PipelineError::ValidationExhausted { .. }));
}
