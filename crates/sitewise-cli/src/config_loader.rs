//! Configuration loading utilities for CLI commands

use crate::cli::Cli;
use anyhow::{Context, Result};
use sitewise_core::config::{CliConfigOverrides, LayeredConfig};
use sitewise_orchestrator::Orchestrator;

/// Defaults, then the config file, then `SITEWISE_*`, then command-line flags
pub fn load_config(cli: &Cli) -> Result<LayeredConfig> {
    let mut config =
        LayeredConfig::load(Some(cli.config.as_path())).context("Failed to load configuration file")?;

    config.update_from_cli(CliConfigOverrides {
        store_root: cli.store_root.clone(),
        capability_endpoint: cli.endpoint.clone(),
        agent_endpoint: cli.agent_endpoint.clone(),
        ..Default::default()
    });
    tracing::debug!(
        path = %cli.config.display(),
        store_root = %config.store_root.value.display(),
        "Configuration loaded"
    );
    Ok(config)
}

pub fn build_orchestrator(config: &LayeredConfig) -> Result<Orchestrator> {
    let resolved = config.resolve();
    Orchestrator::from_config(&resolved).context("Failed to initialise the orchestrator")
}
