use crate::cli::DoctorArgs;
use crate::config_loader::build_orchestrator;
use crate::output::OutputWriter;
use anyhow::Result;
use console::style;
use serde::Serialize;
use sitewise_core::config::LayeredConfig;
use sitewise_core::models::Capability;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Serialize)]
struct Check {
    name: String,
    status: CheckStatus,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl Check {
    fn new(name: impl Into<String>, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self { name: name.into(), status, detail: detail.into(), hint: None }
    }

    fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    checks: Vec<Check>,
    passed: usize,
    total: usize,
}

pub async fn execute(
    args: DoctorArgs,
    config: &LayeredConfig,
    config_path: &Path,
    output: &OutputWriter,
) -> Result<()> {
    let resolved = config.resolve();
    let mut checks = Vec::new();

    checks.push(if config_path.exists() {
        Check::new("Config", CheckStatus::Pass, format!("Loaded {}", config_path.display()))
    } else {
        Check::new("Config", CheckStatus::Warn, "No config file; using defaults and environment")
            .hint(format!("Create {}", config_path.display()))
    });

    checks.push(match build_orchestrator(config) {
        Ok(orchestrator) => match orchestrator.store().list_names().await {
            Ok(names) => Check::new(
                "Store",
                CheckStatus::Pass,
                format!("{} projects in {}", names.len(), resolved.store_root.display()),
            ),
            Err(e) => Check::new("Store", CheckStatus::Fail, e.to_string())
                .hint("Check permissions on the store directory or set SITEWISE_STORE_ROOT"),
        },
        Err(e) => Check::new("Store", CheckStatus::Fail, format!("{:#}", e)),
    });

    let capabilities = &resolved.capabilities;
    for capability in Capability::ALL {
        let required = capabilities.required.contains(&capability);
        let name = format!("Capability {}", capability);
        checks.push(match capabilities.function_for(capability) {
            Some(function) => Check::new(name, CheckStatus::Pass, function),
            None if required => Check::new(name, CheckStatus::Fail, "Required but not configured")
                .hint(format!("Set {}", capability.env_var())),
            None => Check::new(name, CheckStatus::Warn, "Not configured")
                .hint(format!("Set {}", capability.env_var())),
        });
    }

    checks.push(match &resolved.agent.endpoint {
        Some(endpoint) => Check::new("Agent", CheckStatus::Pass, endpoint.clone()),
        None => Check::new("Agent", CheckStatus::Warn, "Not configured; using direct invocation only")
            .hint("Set SITEWISE_AGENT_ENDPOINT"),
    });

    checks.push(match &resolved.geocoder_endpoint {
        Some(endpoint) => Check::new("Geocoder", CheckStatus::Pass, endpoint.clone()),
        None => Check::new("Geocoder", CheckStatus::Warn, "Not configured; new sites get coordinate names")
            .hint("Set SITEWISE_GEOCODER_ENDPOINT"),
    });

    let total = checks.len();
    let passed = checks.iter().filter(|c| c.status == CheckStatus::Pass).count();

    if output.is_json() {
        return output.result(DoctorReport { checks, passed, total });
    }

    println!("\n{}", style("Sitewise Health Check").bold().underlined());
    println!("{}", style("═".repeat(60)).dim());
    println!();

    for check in &checks {
        let icon = match check.status {
            CheckStatus::Pass => style("✓").green(),
            CheckStatus::Warn => style("⚠").yellow(),
            CheckStatus::Fail => style("✗").red(),
        };
        println!("{} {}: {}", icon, check.name, check.detail);
        if let Some(hint) = &check.hint {
            println!("  → {}", hint);
        }
    }

    if args.verbose {
        println!();
        println!("  Endpoint: {}", capabilities.endpoint);
        println!("  Async delivery: {}", capabilities.async_delivery);
        println!("  Duplicate radius: {} km", resolved.resolution.duplicate_radius_km);
        println!("  Session TTL: {} s", resolved.cache.session_ttl.as_secs());
        println!("  Retry attempts: {}", resolved.retry.max_attempts);
    }

    println!();
    println!("{}", style("═".repeat(60)).dim());

    let percentage = passed * 100 / total.max(1);
    let failed = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let status_icon = if failed {
        style("✗").red()
    } else if passed < total {
        style("⚠").yellow()
    } else {
        style("✓").green()
    };
    println!("{} Overall Status: {}/{} checks passed ({}%)", status_icon, passed, total, percentage);
    println!();

    if failed {
        println!("{}", style("Some required pieces are missing. Follow the suggestions above to fix them.").red());
    } else if passed < total {
        println!("{}", style("Optional features are disabled; the dispatcher will still run.").yellow());
    } else {
        println!("{}", style("All checks passed! Sitewise is ready.").green());
    }

    Ok(())
}
