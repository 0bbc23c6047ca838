use deed_image_sync::error::ConfigError;
use deed_image_sync::keys::Stage;
use deed_image_sync::load_config::{load_config, upload_settings, workflow, BUCKET_ENV_VAR};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

const FULL_CONFIG: &str = r#"
bucket: deeds-from-file
storage_class: STANDARD_IA
cache_dir: ./tmp/cache
endpoint_url: http://localhost:9000
reconcile:
  stage: raw
  suffix: .tif
layout:
  raw: archive/raw
workflows:
  Ramsey County:
    image_glob_root: /mnt/deeds/ramsey
    image_glob_patterns: ["**/*.tif", "**/*.jpg"]
  WI Milwaukee County:
    image_glob_root: /mnt/deeds/milwaukee
    image_glob_patterns: ["**/*.001"]
"#;

#[test]
#[serial]
fn loads_full_config() {
    env::remove_var(BUCKET_ENV_VAR);
    let file = config_file(FULL_CONFIG);

    let settings = load_config(file.path()).expect("config should load");

    assert_eq!(settings.store.bucket, "deeds-from-file");
    assert_eq!(settings.store.endpoint_url.as_deref(), Some("http://localhost:9000"));
    assert_eq!(settings.storage_class, "STANDARD_IA");
    assert_eq!(settings.cache_dir, PathBuf::from("./tmp/cache"));
    assert_eq!(settings.layout.raw, "archive/raw");
    assert_eq!(settings.layout.ocr_json, "ocr/json", "unset prefixes keep defaults");
    assert_eq!(settings.reconcile.stage, Stage::Raw);
    assert_eq!(settings.reconcile.suffix(), "tif");

    let ramsey = workflow(&settings, "Ramsey County").expect("workflow exists");
    assert_eq!(ramsey.image_glob_root, PathBuf::from("/mnt/deeds/ramsey"));
    assert_eq!(ramsey.image_glob_patterns.len(), 2);
}

#[test]
#[serial]
fn minimal_config_uses_defaults_and_env_bucket() {
    env::set_var(BUCKET_ENV_VAR, "deeds-from-env");
    let file = config_file(
        r#"
bucket: ignored-when-env-is-set
workflows:
  Ramsey County:
    image_glob_root: /mnt/deeds
    image_glob_patterns: ["**/*.tif"]
"#,
    );

    let settings = load_config(file.path()).expect("config should load");
    env::remove_var(BUCKET_ENV_VAR);

    assert_eq!(settings.store.bucket, "deeds-from-env");
    assert_eq!(settings.storage_class, "GLACIER_IR");
    assert_eq!(settings.cache_dir, PathBuf::from("data"));
    assert_eq!(settings.reconcile.stage, Stage::OcrJson);
    assert_eq!(settings.reconcile.suffix(), "json");
    assert!(settings.store.endpoint_url.is_none());
}

#[test]
#[serial]
fn missing_bucket_is_an_error() {
    env::remove_var(BUCKET_ENV_VAR);
    let file = config_file("workflows: {}\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::MissingBucket), "got {err:?}");
}

#[test]
#[serial]
fn invalid_yaml_reports_parse_error() {
    let file = config_file("not-yaml: [:::");
    let err = load_config(file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("parse") || msg.contains("YAML"), "Parse error expected, got: {msg}");
}

#[test]
#[serial]
fn unreadable_file_reports_read_error() {
    let err = load_config("/definitely/not/here/workflows.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }), "got {err:?}");
}

#[test]
#[serial]
fn unknown_workflow_and_pool_options_are_validated() {
    env::remove_var(BUCKET_ENV_VAR);
    let file = config_file(FULL_CONFIG);
    let settings = load_config(file.path()).unwrap();

    let err = workflow(&settings, "Dakota County").unwrap_err();
    assert!(err.to_string().contains("Dakota County"));

    let upload = upload_settings(&settings, Some(4), 1.5, true).unwrap();
    assert_eq!(upload.concurrency, 4);
    assert_eq!(upload.rate_limit, Duration::from_millis(1500));
    assert_eq!(upload.storage_class, "STANDARD_IA");
    assert!(upload.dry_run);

    assert_eq!(upload_settings(&settings, None, 0.0, false).unwrap().concurrency, 8);
    assert!(matches!(
        upload_settings(&settings, Some(0), 0.0, false),
        Err(ConfigError::ZeroConcurrency)
    ));
    assert!(matches!(
        upload_settings(&settings, Some(2), -1.0, false),
        Err(ConfigError::InvalidRateLimit(_))
    ));
}
