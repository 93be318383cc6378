//! Configuration resolution: CLI > ENV > TOML > defaults
//!
//! Tests that touch EVSPEC_* variables are #[serial] so they never observe
//! each other's environment.

use evspec_common::config::{
    ConfigOverrides, IngestConfig, TomlConfig, DEFAULT_MAX_LOCK_WAIT_MS, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_SOURCE_DIR, ENV_CONFIG_FILE, ENV_DATABASE_URL, ENV_SOURCE_DIR,
};
use evspec_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_DATABASE_URL);
    env::remove_var(ENV_SOURCE_DIR);
    env::remove_var(ENV_CONFIG_FILE);
}

fn toml_with_everything() -> TomlConfig {
    TomlConfig {
        database_url: Some("sqlite://toml.db".to_string()),
        source_dir: Some(PathBuf::from("toml/engines")),
        progress_interval: Some(25),
        max_lock_wait_ms: Some(900),
    }
}

#[test]
#[serial]
fn test_cli_beats_env_and_toml() {
    clear_env();
    env::set_var(ENV_DATABASE_URL, "sqlite://env.db");
    env::set_var(ENV_SOURCE_DIR, "env/engines");

    let overrides = ConfigOverrides {
        database_url: Some("sqlite://cli.db".to_string()),
        source_dir: Some(PathBuf::from("cli/engines")),
        config_file: None,
    };
    let config = IngestConfig::resolve_with(&overrides, toml_with_everything()).unwrap();

    assert_eq!(config.database_url, "sqlite://cli.db");
    assert_eq!(config.source_dir, PathBuf::from("cli/engines"));
    // Tunables only come from TOML
    assert_eq!(config.progress_interval, 25);
    assert_eq!(config.max_lock_wait_ms, 900);

    clear_env();
}

#[test]
#[serial]
fn test_env_beats_toml() {
    clear_env();
    env::set_var(ENV_DATABASE_URL, "sqlite://env.db");
    env::set_var(ENV_SOURCE_DIR, "env/engines");

    let config = IngestConfig::resolve_with(&ConfigOverrides::default(), toml_with_everything()).unwrap();

    assert_eq!(config.database_url, "sqlite://env.db");
    assert_eq!(config.source_dir, PathBuf::from("env/engines"));

    clear_env();
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    clear_env();
    env::set_var(ENV_DATABASE_URL, "   ");

    let config = IngestConfig::resolve_with(&ConfigOverrides::default(), toml_with_everything()).unwrap();
    assert_eq!(config.database_url, "sqlite://toml.db");

    clear_env();
}

#[test]
#[serial]
fn test_missing_connection_string_is_config_error() {
    clear_env();

    let result = IngestConfig::resolve_with(&ConfigOverrides::default(), TomlConfig::default());
    match result {
        Err(Error::Config(message)) => assert!(message.contains(ENV_DATABASE_URL)),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_defaults_fill_everything_but_connection_string() {
    clear_env();

    let overrides = ConfigOverrides {
        database_url: Some("sqlite://cli.db".to_string()),
        ..Default::default()
    };
    let config = IngestConfig::resolve_with(&overrides, TomlConfig::default()).unwrap();

    assert_eq!(config, IngestConfig::new("sqlite://cli.db", DEFAULT_SOURCE_DIR));
    assert_eq!(config.progress_interval, DEFAULT_PROGRESS_INTERVAL);
    assert_eq!(config.max_lock_wait_ms, DEFAULT_MAX_LOCK_WAIT_MS);
}

#[test]
#[serial]
fn test_zero_progress_interval_falls_back() {
    clear_env();

    let toml_config = TomlConfig {
        database_url: Some("sqlite://toml.db".to_string()),
        progress_interval: Some(0),
        ..Default::default()
    };
    let config = IngestConfig::resolve_with(&ConfigOverrides::default(), toml_config).unwrap();
    assert_eq!(config.progress_interval, DEFAULT_PROGRESS_INTERVAL);
}

#[test]
fn test_toml_load_parses_all_keys() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evspec.toml");
    std::fs::write(
        &path,
        r#"
database_url = "sqlite://file.db"
source_dir = "data/engines"
progress_interval = 10
max_lock_wait_ms = 1500
"#,
    )
    .unwrap();

    let loaded = TomlConfig::load(&path).unwrap();
    assert_eq!(
        loaded,
        TomlConfig {
            database_url: Some("sqlite://file.db".to_string()),
            source_dir: Some(PathBuf::from("data/engines")),
            progress_interval: Some(10),
            max_lock_wait_ms: Some(1500),
        }
    );
}

#[test]
fn test_toml_load_rejects_malformed_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "database_url = [unterminated").unwrap();

    assert!(matches!(TomlConfig::load(&path), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_discover_degrades_on_malformed_or_missing_file() {
    clear_env();
    let temp = TempDir::new().unwrap();

    let broken = temp.path().join("broken.toml");
    std::fs::write(&broken, "progress_interval = \"often\"").unwrap();
    assert_eq!(TomlConfig::discover(Some(&broken)), TomlConfig::default());

    let missing = temp.path().join("missing.toml");
    assert_eq!(TomlConfig::discover(Some(&missing)), TomlConfig::default());
}

#[test]
#[serial]
fn test_resolve_reads_config_file_from_env() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("from-env.toml");
    std::fs::write(&path, "database_url = \"sqlite://from-env.db\"\nsource_dir = \"env-file/engines\"\n").unwrap();
    env::set_var(ENV_CONFIG_FILE, &path);

    let config = IngestConfig::resolve(&ConfigOverrides::default()).unwrap();
    assert_eq!(config.database_url, "sqlite://from-env.db");
    assert_eq!(config.source_dir, PathBuf::from("env-file/engines"));

    clear_env();
}

#[test]
#[serial]
fn test_explicit_config_file_beats_env_config_file() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let from_env = temp.path().join("env.toml");
    let explicit = temp.path().join("explicit.toml");
    std::fs::write(&from_env, "database_url = \"sqlite://env-file.db\"\n").unwrap();
    std::fs::write(&explicit, "database_url = \"sqlite://explicit.db\"\n").unwrap();
    env::set_var(ENV_CONFIG_FILE, &from_env);

    let overrides = ConfigOverrides {
        config_file: Some(explicit),
        ..Default::default()
    };
    let config = IngestConfig::resolve(&overrides).unwrap();
    assert_eq!(config.database_url, "sqlite://explicit.db");

    clear_env();
}
