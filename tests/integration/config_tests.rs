use dupsweep::config::{Config, ConfigError};
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config = Config::from_figment(figment).unwrap();
    assert!(config.scan.skip_hidden);
    assert_eq!(config.scan.io_threads, 4);
    assert_eq!(config.actions.trash_dir, None);
}

#[test]
fn test_config_load_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[scan]
skip_hidden = false
io_threads = 2
min_size = 1024

[actions]
trash_dir = "/tmp/dupsweep-bin"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert!(!config.scan.skip_hidden);
    assert_eq!(config.scan.io_threads, 2);
    assert_eq!(config.scan.min_size, Some(1024));
    assert_eq!(
        config.actions.trash_dir.as_deref(),
        Some(std::path::Path::new("/tmp/dupsweep-bin"))
    );

    let finder = config.finder_config();
    assert_eq!(finder.io_threads, 2);
    assert!(!finder.walker_config.skip_hidden);
}

#[test]
fn test_config_missing_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let result = Config::load(Some(&temp_dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_config_invalid_values_rejected() {
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::string("[scan]\nmin_size = 10\nmax_size = 5\n"));
    assert!(matches!(
        Config::from_figment(figment),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_printed_config_reloads() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, Config::default().to_toml().unwrap()).unwrap();

    let reloaded = Config::load(Some(&config_path)).unwrap();
    assert_eq!(reloaded.scan, Config::default().scan);
}
