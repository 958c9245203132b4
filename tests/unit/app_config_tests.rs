/*!
 * Tests for configuration loading and layering
 */

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

use tqagent::app_config::{Config, Environment, FaultPolicy, LogLevel};
use tqagent::errors::ConfigError;

fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_default_config_shouldMatchDocumentedDefaults() {
    let config = Config::default();

    assert_eq!(config.server.port, 3001);
    assert_eq!(config.server.body_limit_bytes, 10 * 1024 * 1024);
    assert_eq!(config.server.environment, Environment::Development);
    assert_eq!(config.agent.check_schedule, "*/30 * * * *");
    assert!(!config.agent.auto_update);
    assert_eq!(config.agent.quality_threshold, 80.0);
    assert_eq!(config.agent.max_concurrent_checks, 3);
    assert_eq!(config.agent.warmup().as_secs(), 30);
    assert_eq!(config.llm.rate_limit_backoff().as_secs(), 60);
    assert_eq!(config.fault_policy, FaultPolicy::Shutdown);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_withPartialFile_shouldKeepDefaultsForMissingFields() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tqagent.json");
    fs::write(
        &path,
        r#"{ "agent": { "auto_update": true, "quality_threshold": 65 }, "server": { "port": 8080 } }"#,
    )?;

    let config = Config::load(Some(&path))?;

    assert!(config.agent.auto_update);
    assert_eq!(config.agent.quality_threshold, 65.0);
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.agent.max_concurrent_checks, 3);
    assert_eq!(config.content.endpoint, "/api/translations");
    Ok(())
}

#[test]
fn test_load_withMalformedFile_shouldFail() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json")?;

    assert!(Config::load(Some(&path)).is_err());
    Ok(())
}

#[test]
fn test_apply_env_afterFile_shouldWin() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tqagent.json");
    fs::write(&path, r#"{ "agent": { "quality_threshold": 65 } }"#)?;

    let mut config = Config::load(Some(&path))?;
    let env = env_of(&[
        ("QUALITY_THRESHOLD", "90"),
        ("APP_ENV", "production"),
        ("LOG_LEVEL", "debug"),
        ("FAULT_POLICY", "continue"),
        ("CORS_ORIGIN", "https://marine.example.lk"),
    ]);
    config.apply_env(|key| env.get(key).cloned())?;

    assert_eq!(config.agent.quality_threshold, 90.0);
    assert_eq!(config.server.environment, Environment::Production);
    assert_eq!(config.log.level, LogLevel::Debug);
    assert_eq!(config.fault_policy, FaultPolicy::Continue);
    assert_eq!(config.server.cors_origin, "https://marine.example.lk");
    Ok(())
}

#[test]
fn test_apply_env_withUnparseableBoolean_shouldReportKey() {
    let mut config = Config::default();
    let env = env_of(&[("AUTO_UPDATE", "sometimes")]);

    match config.apply_env(|key| env.get(key).cloned()) {
        Err(ConfigError::InvalidValue { key, value, .. }) => {
            assert_eq!(key, "AUTO_UPDATE");
            assert_eq!(value, "sometimes");
        }
        other => panic!("expected InvalidValue, got {:?}", other),
    }
}
