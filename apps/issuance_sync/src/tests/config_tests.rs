use super::{load_settings_from, normalize_database_url, prepare_database_url, Settings};

use std::{collections::HashMap, fs, time::Duration};

use shared::H160;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_match_the_documented_constants() {
    let settings = Settings::default();
    assert_eq!(settings.blocks_per_year, 2_102_400);
    assert_eq!(settings.checkpoint_every, 25);

    let retry = settings.retry_policy();
    assert_eq!(retry.initial_delay, Duration::from_millis(1000));
    assert_eq!(retry.increase_factor, 3);
    assert_eq!(retry.max_retries, 3);
}

#[test]
fn file_then_env_overrides_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("issuance.toml");
    fs::write(
        &path,
        r#"
gateway_url = "http://file-gateway:8080"
database_url = "./file.db"
app_address = "0x0101010101010101010101010101010101010101"
checkpoint_every = "10"
retry_max = "5"
"#,
    )
    .expect("write settings file");

    let settings = load_settings_from(
        &path,
        env_from(&[
            ("GATEWAY_URL", "http://plain-env:1"),
            ("APP__GATEWAY_URL", "http://prefixed-env:2"),
            ("APP__RETRY_INITIAL_MS", "250"),
            ("APP__BLOCKS_PER_YEAR", "not-a-number"),
        ]),
    );

    assert_eq!(settings.gateway_url, "http://prefixed-env:2");
    assert_eq!(settings.database_url, "./file.db");
    assert_eq!(settings.checkpoint_every, 10);
    assert_eq!(settings.retry_max, 5);
    assert_eq!(settings.retry_initial_ms, 250);
    assert_eq!(settings.blocks_per_year, 2_102_400);
    assert_eq!(
        settings.app_address().expect("address"),
        H160::repeat_byte(0x01)
    );
}

#[test]
fn missing_file_keeps_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("absent.toml"), env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert!(settings.app_address().is_err());
}

#[test]
fn file_accepts_plain_toml_integers() {
    let mut settings = Settings::default();
    settings.apply_file(
        r#"
gateway_url = "http://file:1"
checkpoint_every = 10
blocks_per_year = 2102401
retry_initial_ms = 500
enabled = true
"#,
    );
    assert_eq!(settings.gateway_url, "http://file:1");
    assert_eq!(settings.checkpoint_every, 10);
    assert_eq!(settings.blocks_per_year, 2_102_401);
    assert_eq!(settings.retry_policy().initial_delay, Duration::from_millis(500));
}

#[test]
fn unparseable_file_keeps_defaults() {
    let mut settings = Settings::default();
    settings.apply_file("gateway_url = ");
    assert_eq!(settings, Settings::default());
}

#[test]
fn zero_checkpoint_interval_is_ignored() {
    let mut settings = Settings::default();
    settings.apply_env(env_from(&[("APP__CHECKPOINT_EVERY", "0")]));
    assert_eq!(settings.checkpoint_every, 25);
}

#[test]
fn invalid_app_address_is_reported() {
    let mut settings = Settings::default();
    settings.apply_env(env_from(&[("APP_ADDRESS", "0x1234")]));
    let err = settings.app_address().expect_err("short address");
    assert!(err.to_string().contains("0x1234"));
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
    assert_eq!(
        normalize_database_url("C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn creates_parent_dir_for_sqlite_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("data").join("test.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    assert!(prepared.starts_with("sqlite://"));
    assert!(dir.path().join("data").exists());
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("issuance.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    storage.health_check().await.expect("ping");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
