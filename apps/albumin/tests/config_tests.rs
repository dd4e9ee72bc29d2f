//! Configuration layering: defaults, files, environment and flags.

use albumin::config::{AlbuminConfig, CONFIG_FILE_NAME, ENV_REPO, ENV_TIMEZONE, Overrides};
use albumin_core::AlbuminError;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

// =============================================================================
// FILE LAYER
// =============================================================================

#[test]
fn repository_config_file_is_discovered() {
    let repo = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        repo.path().join(CONFIG_FILE_NAME),
        "timezone = \"Asia/Tokyo\"\n\n[metadata]\nstop_timeout_secs = 9\n",
    )
    .expect("write");

    let overrides = Overrides {
        repository: Some(repo.path().to_path_buf()),
        ..Overrides::default()
    };
    let config = AlbuminConfig::load_with(&overrides, no_env).expect("load");

    assert_eq!(config.timezone().expect("zone").name(), "Asia/Tokyo");
    assert_eq!(config.metadata.stop_timeout_secs, 9);
    assert_eq!(config.repository, repo.path());
    let session = config.session().expect("session");
    assert_eq!(session.stop_timeout.as_secs(), 9);
    assert_eq!(session.program, "git");
}

#[test]
fn explicit_config_file_wins_over_repository_file() {
    let repo = tempfile::tempdir().expect("tempdir");
    std::fs::write(repo.path().join(CONFIG_FILE_NAME), "timezone = \"Asia/Tokyo\"\n")
        .expect("write");
    let other = repo.path().join("other.toml");
    std::fs::write(&other, "timezone = \"Europe/Berlin\"\n").expect("write");

    let overrides = Overrides {
        config: Some(other),
        repository: Some(repo.path().to_path_buf()),
        ..Overrides::default()
    };
    let config = AlbuminConfig::load_with(&overrides, no_env).expect("load");

    assert_eq!(config.timezone().expect("zone").name(), "Europe/Berlin");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let overrides = Overrides {
        config: Some(PathBuf::from("/nonexistent/albumin.toml")),
        ..Overrides::default()
    };
    assert!(matches!(
        AlbuminConfig::load_with(&overrides, no_env),
        Err(AlbuminError::ConfigError(_))
    ));
}

#[test]
fn malformed_file_names_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "timezone = [\n").expect("write");

    let err = AlbuminConfig::from_file(&path).expect_err("parse error");
    assert!(err.to_string().contains("broken.toml"));
}

// =============================================================================
// ENVIRONMENT AND FLAGS
// =============================================================================

#[test]
fn environment_overrides_file() {
    let repo = tempfile::tempdir().expect("tempdir");
    std::fs::write(repo.path().join(CONFIG_FILE_NAME), "timezone = \"Asia/Tokyo\"\n")
        .expect("write");
    let repo_path = repo.path().to_string_lossy().into_owned();

    let env = env_from(&[(ENV_REPO, repo_path.as_str()), (ENV_TIMEZONE, "America/New_York")]);
    let config = AlbuminConfig::load_with(&Overrides::default(), env).expect("load");

    assert_eq!(config.timezone().expect("zone").name(), "America/New_York");
    assert_eq!(config.repository, repo.path());
}

#[test]
fn flags_override_environment() {
    let env = env_from(&[(ENV_TIMEZONE, "America/New_York")]);
    let overrides = Overrides {
        timezone: Some("Europe/Istanbul".to_string()),
        ..Overrides::default()
    };
    let config = AlbuminConfig::load_with(&overrides, env).expect("load");

    assert_eq!(config.timezone().expect("zone").name(), "Europe/Istanbul");
}

#[test]
fn unknown_zone_fails_to_load() {
    let overrides = Overrides {
        timezone: Some("Atlantis/Capital".to_string()),
        ..Overrides::default()
    };
    assert!(matches!(
        AlbuminConfig::load_with(&overrides, no_env),
        Err(AlbuminError::ConfigError(ref m)) if m.contains("Atlantis/Capital")
    ));
}
