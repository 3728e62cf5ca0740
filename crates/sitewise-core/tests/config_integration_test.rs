//! Integration tests for layered configuration
//!
//! Precedence: CLI arguments > Environment variables > Config file > Defaults

use serial_test::serial;
use sitewise_core::config::{CliConfigOverrides, ConfigSource, LayeredConfig};
use sitewise_core::models::Capability;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const VARS: &[&str] = &[
    "SITEWISE_TERRAIN_FUNCTION",
    "SITEWISE_DUPLICATE_RADIUS_KM",
    "SITEWISE_RETRY_MAX_ATTEMPTS",
    "SITEWISE_ASYNC_DELIVERY",
    "SITEWISE_REQUIRED_CAPABILITIES",
    "SITEWISE_AGENT_ENDPOINT",
    "SITEWISE_CACHE_MAX_ENTRIES",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sitewise.toml");
    fs::write(&path, "terrain_function = \"from-file\"\nduplicate_radius_km = 3.0\n").unwrap();

    env::set_var("SITEWISE_TERRAIN_FUNCTION", "from-env");

    let config = LayeredConfig::load(Some(&path)).unwrap();

    assert_eq!(config.terrain_function.value, "from-env");
    assert_eq!(config.terrain_function.source, ConfigSource::Environment);
    assert_eq!(config.duplicate_radius_km.value, 3.0);
    assert_eq!(config.duplicate_radius_km.source, ConfigSource::File);

    clear_env();
}

#[test]
#[serial]
fn test_cache_bounds_resolve_from_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sitewise.toml");
    fs::write(&path, "cache_max_entries = 500\nproject_cache_ttl_secs = 60\n").unwrap();

    let config = LayeredConfig::load(Some(&path)).unwrap();
    assert_eq!(config.cache_max_entries.source, ConfigSource::File);

    let resolved = config.resolve();
    assert_eq!(resolved.cache.max_entries, 500);
    assert_eq!(resolved.cache.project_ttl, Duration::from_secs(60));
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    env::set_var("SITEWISE_DUPLICATE_RADIUS_KM", "2.0");

    let mut config = LayeredConfig::with_defaults().load_from_env();
    assert_eq!(config.duplicate_radius_km.value, 2.0);

    config.update_from_cli(CliConfigOverrides {
        duplicate_radius_km: Some(0.25),
        ..Default::default()
    });
    assert_eq!(config.duplicate_radius_km.value, 0.25);
    assert_eq!(config.duplicate_radius_km.source, ConfigSource::Cli);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_values_keep_defaults() {
    clear_env();
    env::set_var("SITEWISE_RETRY_MAX_ATTEMPTS", "many");
    env::set_var("SITEWISE_ASYNC_DELIVERY", "perhaps");
    env::set_var("SITEWISE_REQUIRED_CAPABILITIES", "terrain,teleport");

    let config = LayeredConfig::with_defaults().load_from_env();

    assert_eq!(config.retry_max_attempts.value, 3);
    assert_eq!(config.retry_max_attempts.source, ConfigSource::Default);
    assert!(!config.async_delivery.value);
    assert_eq!(config.required_capabilities.value, vec![Capability::Terrain]);

    clear_env();
}

#[test]
#[serial]
fn test_env_capability_list_and_agent() {
    clear_env();
    env::set_var("SITEWISE_REQUIRED_CAPABILITIES", "terrain, layout, report");
    env::set_var("SITEWISE_AGENT_ENDPOINT", "http://agent.local");
    env::set_var("SITEWISE_ASYNC_DELIVERY", "yes");

    let resolved = LayeredConfig::with_defaults().load_from_env().resolve();

    assert_eq!(
        resolved.capabilities.required,
        vec![Capability::Terrain, Capability::Layout, Capability::Report]
    );
    assert!(resolved.capabilities.async_delivery);
    assert_eq!(resolved.agent.endpoint.as_deref(), Some("http://agent.local"));
    assert_eq!(resolved.agent.timeout, Duration::from_secs(30));

    clear_env();
}

#[test]
#[serial]
fn test_missing_config_file_is_skipped() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let config = LayeredConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config.store_root.source, ConfigSource::Default);
}
