//! Shipped configuration file tests.

use arcset_common::config::{AppConfig, ConfigError, ExchangeConfig, LogLevel};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn shipped_config() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/arcset.toml")
}

#[test]
fn shipped_config_matches_defaults() {
    let config = AppConfig::load_or_default(Some(&shipped_config())).unwrap();
    assert_eq!(config.exchange, ExchangeConfig::default());
    assert_eq!(config.shared.log_level, LogLevel::Info);
    assert_eq!(config.shared.service_name, "arcset");
}

#[test]
fn unknown_exchange_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("arcset.toml");
    fs::write(&path, "[exchange]\nregion = \"/r\"\nbuffer = 12\n").unwrap();

    let result = AppConfig::load_or_default(Some(&path));
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn empty_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("arcset.toml");
    fs::write(&path, "").unwrap();

    let config = AppConfig::load_or_default(Some(&path)).unwrap();
    assert_eq!(config.exchange, ExchangeConfig::default());
}
