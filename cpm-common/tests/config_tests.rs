//! Configuration loading and root folder resolution
//!
//! Tests touching `CPM_ROOT_FOLDER` are `#[serial]` so they never race.

use cpm_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert_eq!(defaults.bind_address, "127.0.0.1");
    assert_eq!(defaults.port, 5780);
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new("cpm-ui")
        .with_cli_arg(Some(PathBuf::from("/tmp/from-cli")))
        .with_toml(toml)
        .resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new("cpm-ui").with_toml(toml).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_beats_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new("cpm-ui").with_toml(toml).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/from-toml"));
}

#[test]
#[serial]
fn test_no_overrides_uses_compiled_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let resolved = RootFolderResolver::new("cpm-ui")
        .with_toml(TomlConfig::default())
        .resolve();
    assert_eq!(resolved, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
fn test_missing_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = TomlConfig::load_or_default(Some(&dir.path().join("absent.toml")));
    assert!(config.root_folder.is_none());
    assert_eq!(config.port(), 5780);
}

#[test]
fn test_unparsable_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"\n[[[").unwrap();

    assert!(TomlConfig::load(&path).is_err());
    let config = TomlConfig::load_or_default(Some(&path));
    assert_eq!(config.port(), 5780);
}

#[test]
fn test_config_file_values_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/cpm"
admin_email = "admin@example.com"
bind_address = "0.0.0.0"

[logging]
level = "debug"

[persistence]
max_attempts = 5
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/cpm")));
    assert_eq!(config.admin_email.as_deref(), Some("admin@example.com"));
    assert_eq!(config.bind_address(), "0.0.0.0");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.persistence.max_attempts, 5);
    assert_eq!(config.persistence.initial_backoff_ms, 50);
}

#[test]
fn test_initializer_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("cpm-root");
    let init = RootFolderInitializer::new(root.clone());

    init.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert_eq!(init.database_path(), root.join("cpm.db"));
    assert_eq!(init.root_folder(), root.as_path());
}
