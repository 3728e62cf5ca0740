use crate::error::{Result, SitewiseError};
use crate::models::Capability;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }

    fn update_opt(&mut self, value: Option<T>, source: ConfigSource) {
        if let Some(value) = value {
            self.update(value, source);
        }
    }
}

/// Layered configuration for Sitewise
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub store_root: ConfigValue<PathBuf>,
    pub terrain_function: ConfigValue<String>,
    pub layout_function: ConfigValue<String>,
    pub simulation_function: ConfigValue<String>,
    pub report_function: ConfigValue<String>,
    pub capability_endpoint: ConfigValue<String>,
    pub agent_endpoint: ConfigValue<String>,
    pub agent_timeout_secs: ConfigValue<u64>,
    pub geocoder_endpoint: ConfigValue<String>,
    pub duplicate_radius_km: ConfigValue<f64>,
    pub fuzzy_similarity_threshold: ConfigValue<f64>,
    pub project_cache_ttl_secs: ConfigValue<u64>,
    pub list_cache_ttl_secs: ConfigValue<u64>,
    pub cache_max_entries: ConfigValue<u64>,
    pub session_ttl_secs: ConfigValue<u64>,
    pub retry_max_attempts: ConfigValue<usize>,
    pub retry_base_delay_ms: ConfigValue<u64>,
    pub retry_max_delay_ms: ConfigValue<u64>,
    pub async_delivery: ConfigValue<bool>,
    pub required_capabilities: ConfigValue<Vec<Capability>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        let default = ConfigSource::Default;
        Self {
            store_root: ConfigValue::new(PathBuf::from(".sitewise"), default),
            terrain_function: ConfigValue::new(String::new(), default),
            layout_function: ConfigValue::new(String::new(), default),
            simulation_function: ConfigValue::new(String::new(), default),
            report_function: ConfigValue::new(String::new(), default),
            capability_endpoint: ConfigValue::new("http://localhost:9000".to_string(), default),
            agent_endpoint: ConfigValue::new(String::new(), default),
            agent_timeout_secs: ConfigValue::new(30, default),
            geocoder_endpoint: ConfigValue::new(String::new(), default),
            duplicate_radius_km: ConfigValue::new(1.0, default),
            fuzzy_similarity_threshold: ConfigValue::new(0.6, default),
            project_cache_ttl_secs: ConfigValue::new(300, default),
            list_cache_ttl_secs: ConfigValue::new(30, default),
            cache_max_entries: ConfigValue::new(DEFAULT_CACHE_MAX_ENTRIES, default),
            session_ttl_secs: ConfigValue::new(7 * 24 * 60 * 60, default),
            retry_max_attempts: ConfigValue::new(3, default),
            retry_base_delay_ms: ConfigValue::new(200, default),
            retry_max_delay_ms: ConfigValue::new(5000, default),
            async_delivery: ConfigValue::new(false, default),
            required_capabilities: ConfigValue::new(vec![Capability::Terrain], default),
        }
    }

    /// Defaults, then `path` (when it exists), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::with_defaults();
        if let Some(path) = path {
            if path.exists() {
                config = config.load_from_file(path)?;
            } else {
                tracing::debug!("Config file {} not found, skipping", path.display());
            }
        }
        Ok(config.load_from_env())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| SitewiseError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file: FileConfig = toml::from_str(&content).map_err(|e| SitewiseError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to parse TOML: {}", e),
        })?;

        let src = ConfigSource::File;
        self.store_root.update_opt(file.store_root, src);
        self.terrain_function.update_opt(file.terrain_function, src);
        self.layout_function.update_opt(file.layout_function, src);
        self.simulation_function.update_opt(file.simulation_function, src);
        self.report_function.update_opt(file.report_function, src);
        self.capability_endpoint.update_opt(file.capability_endpoint, src);
        self.agent_endpoint.update_opt(file.agent_endpoint, src);
        self.agent_timeout_secs.update_opt(file.agent_timeout_secs, src);
        self.geocoder_endpoint.update_opt(file.geocoder_endpoint, src);
        self.duplicate_radius_km.update_opt(file.duplicate_radius_km, src);
        self.fuzzy_similarity_threshold.update_opt(file.fuzzy_similarity_threshold, src);
        self.project_cache_ttl_secs.update_opt(file.project_cache_ttl_secs, src);
        self.list_cache_ttl_secs.update_opt(file.list_cache_ttl_secs, src);
        self.cache_max_entries.update_opt(file.cache_max_entries, src);
        self.session_ttl_secs.update_opt(file.session_ttl_secs, src);
        self.retry_max_attempts.update_opt(file.retry_max_attempts, src);
        self.retry_base_delay_ms.update_opt(file.retry_base_delay_ms, src);
        self.retry_max_delay_ms.update_opt(file.retry_max_delay_ms, src);
        self.async_delivery.update_opt(file.async_delivery, src);

        if let Some(names) = file.required_capabilities {
            let capabilities = names
                .iter()
                .map(|name| name.parse::<Capability>())
                .collect::<Result<Vec<_>>>()?;
            self.required_capabilities.update(capabilities, src);
        }

        Ok(self)
    }

    /// Load configuration from `SITEWISE_*` environment variables
    pub fn load_from_env(mut self) -> Self {
        let src = ConfigSource::Environment;

        if let Ok(root) = env::var("SITEWISE_STORE_ROOT") {
            self.store_root.update(PathBuf::from(root), src);
        }

        for (var, slot) in [
            ("SITEWISE_TERRAIN_FUNCTION", &mut self.terrain_function),
            ("SITEWISE_LAYOUT_FUNCTION", &mut self.layout_function),
            ("SITEWISE_SIMULATION_FUNCTION", &mut self.simulation_function),
            ("SITEWISE_REPORT_FUNCTION", &mut self.report_function),
            ("SITEWISE_CAPABILITY_ENDPOINT", &mut self.capability_endpoint),
            ("SITEWISE_AGENT_ENDPOINT", &mut self.agent_endpoint),
            ("SITEWISE_GEOCODER_ENDPOINT", &mut self.geocoder_endpoint),
        ] {
            if let Ok(value) = env::var(var) {
                slot.update(value, src);
            }
        }

        env_parsed("SITEWISE_AGENT_TIMEOUT_SECS", &mut self.agent_timeout_secs, "seconds");
        env_parsed("SITEWISE_DUPLICATE_RADIUS_KM", &mut self.duplicate_radius_km, "kilometers");
        env_parsed(
            "SITEWISE_FUZZY_SIMILARITY_THRESHOLD",
            &mut self.fuzzy_similarity_threshold,
            "number between 0 and 1",
        );
        env_parsed("SITEWISE_PROJECT_CACHE_TTL_SECS", &mut self.project_cache_ttl_secs, "seconds");
        env_parsed("SITEWISE_LIST_CACHE_TTL_SECS", &mut self.list_cache_ttl_secs, "seconds");
        env_parsed("SITEWISE_CACHE_MAX_ENTRIES", &mut self.cache_max_entries, "integer");
        env_parsed("SITEWISE_SESSION_TTL_SECS", &mut self.session_ttl_secs, "seconds");
        env_parsed("SITEWISE_RETRY_MAX_ATTEMPTS", &mut self.retry_max_attempts, "integer");
        env_parsed("SITEWISE_RETRY_BASE_DELAY_MS", &mut self.retry_base_delay_ms, "milliseconds");
        env_parsed("SITEWISE_RETRY_MAX_DELAY_MS", &mut self.retry_max_delay_ms, "milliseconds");

        if let Ok(flag) = env::var("SITEWISE_ASYNC_DELIVERY") {
            match parse_bool(&flag) {
                Ok(value) => self.async_delivery.update(value, src),
                Err(_) => tracing::warn!(
                    "Invalid SITEWISE_ASYNC_DELIVERY value '{}': expected true or false",
                    flag
                ),
            }
        }

        if let Ok(list) = env::var("SITEWISE_REQUIRED_CAPABILITIES") {
            match parse_capability_list(&list) {
                Ok(capabilities) => self.required_capabilities.update(capabilities, src),
                Err(_) => tracing::warn!(
                    "Invalid SITEWISE_REQUIRED_CAPABILITIES value '{}': expected comma-separated terrain, layout, simulation, report",
                    list
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        let src = ConfigSource::Cli;
        self.store_root.update_opt(overrides.store_root, src);
        self.capability_endpoint.update_opt(overrides.capability_endpoint, src);
        self.agent_endpoint.update_opt(overrides.agent_endpoint, src);
        self.duplicate_radius_km.update_opt(overrides.duplicate_radius_km, src);
        self.async_delivery.update_opt(overrides.async_delivery, src);
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "store_root".to_string(),
            (self.store_root.value.display().to_string(), self.store_root.source),
        );

        for (key, value) in [
            ("terrain_function", &self.terrain_function),
            ("layout_function", &self.layout_function),
            ("simulation_function", &self.simulation_function),
            ("report_function", &self.report_function),
            ("capability_endpoint", &self.capability_endpoint),
            ("agent_endpoint", &self.agent_endpoint),
            ("geocoder_endpoint", &self.geocoder_endpoint),
        ] {
            let shown = if value.value.is_empty() {
                "(unset)".to_string()
            } else {
                value.value.clone()
            };
            map.insert(key.to_string(), (shown, value.source));
        }

        insert_display(&mut map, "agent_timeout_secs", &self.agent_timeout_secs);
        insert_display(&mut map, "duplicate_radius_km", &self.duplicate_radius_km);
        insert_display(&mut map, "fuzzy_similarity_threshold", &self.fuzzy_similarity_threshold);
        insert_display(&mut map, "project_cache_ttl_secs", &self.project_cache_ttl_secs);
        insert_display(&mut map, "list_cache_ttl_secs", &self.list_cache_ttl_secs);
        insert_display(&mut map, "cache_max_entries", &self.cache_max_entries);
        insert_display(&mut map, "session_ttl_secs", &self.session_ttl_secs);
        insert_display(&mut map, "retry_max_attempts", &self.retry_max_attempts);
        insert_display(&mut map, "retry_base_delay_ms", &self.retry_base_delay_ms);
        insert_display(&mut map, "retry_max_delay_ms", &self.retry_max_delay_ms);
        insert_display(&mut map, "async_delivery", &self.async_delivery);

        let required: Vec<&str> =
            self.required_capabilities.value.iter().map(|c| c.as_str()).collect();
        map.insert(
            "required_capabilities".to_string(),
            (required.join(","), self.required_capabilities.source),
        );

        map
    }

    /// Flatten into the plain settings components consume
    pub fn resolve(&self) -> SitewiseConfig {
        SitewiseConfig {
            store_root: self.store_root.value.clone(),
            capabilities: CapabilityConfig {
                terrain_function: non_empty(&self.terrain_function.value),
                layout_function: non_empty(&self.layout_function.value),
                simulation_function: non_empty(&self.simulation_function.value),
                report_function: non_empty(&self.report_function.value),
                endpoint: self.capability_endpoint.value.clone(),
                required: self.required_capabilities.value.clone(),
                async_delivery: self.async_delivery.value,
            },
            resolution: ResolutionConfig {
                duplicate_radius_km: self.duplicate_radius_km.value,
                fuzzy_similarity_threshold: self.fuzzy_similarity_threshold.value,
            },
            cache: CacheConfig {
                project_ttl: Duration::from_secs(self.project_cache_ttl_secs.value),
                list_ttl: Duration::from_secs(self.list_cache_ttl_secs.value),
                session_ttl: Duration::from_secs(self.session_ttl_secs.value),
                max_entries: self.cache_max_entries.value.max(1),
            },
            retry: RetryPolicy {
                max_attempts: self.retry_max_attempts.value.max(1),
                base_delay: Duration::from_millis(self.retry_base_delay_ms.value),
                max_delay: Duration::from_millis(self.retry_max_delay_ms.value),
            },
            agent: AgentConfig {
                endpoint: non_empty(&self.agent_endpoint.value),
                timeout: Duration::from_secs(self.agent_timeout_secs.value),
            },
            geocoder_endpoint: non_empty(&self.geocoder_endpoint.value),
        }
    }
}

fn env_parsed<T: FromStr>(var: &str, slot: &mut ConfigValue<T>, expected: &str) {
    if let Ok(raw) = env::var(var) {
        match raw.trim().parse::<T>() {
            Ok(value) => slot.update(value, ConfigSource::Environment),
            Err(_) => tracing::warn!("Invalid {} value '{}': expected {}", var, raw, expected),
        }
    }
}

fn insert_display<T: Display>(
    map: &mut HashMap<String, (String, ConfigSource)>,
    key: &str,
    value: &ConfigValue<T>,
) {
    map.insert(key.to_string(), (value.value.to_string(), value.source));
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Configuration loaded from TOML file
#[derive(Debug, Default, Deserialize, Serialize)]
struct FileConfig {
    store_root: Option<PathBuf>,
    terrain_function: Option<String>,
    layout_function: Option<String>,
    simulation_function: Option<String>,
    report_function: Option<String>,
    capability_endpoint: Option<String>,
    agent_endpoint: Option<String>,
    agent_timeout_secs: Option<u64>,
    geocoder_endpoint: Option<String>,
    duplicate_radius_km: Option<f64>,
    fuzzy_similarity_threshold: Option<f64>,
    project_cache_ttl_secs: Option<u64>,
    list_cache_ttl_secs: Option<u64>,
    cache_max_entries: Option<u64>,
    session_ttl_secs: Option<u64>,
    retry_max_attempts: Option<usize>,
    retry_base_delay_ms: Option<u64>,
    retry_max_delay_ms: Option<u64>,
    async_delivery: Option<bool>,
    required_capabilities: Option<Vec<String>>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub store_root: Option<PathBuf>,
    pub capability_endpoint: Option<String>,
    pub agent_endpoint: Option<String>,
    pub duplicate_radius_km: Option<f64>,
    pub async_delivery: Option<bool>,
}

/// Parse a boolean flag from string
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(SitewiseError::ConfigInvalid {
            key: "async_delivery".to_string(),
            reason: format!("Invalid boolean: {}. Use true or false", s),
        }),
    }
}

/// Parse a comma-separated capability list
pub fn parse_capability_list(s: &str) -> Result<Vec<Capability>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse::<Capability>)
        .collect()
}

/// Resolved settings handed to components
#[derive(Debug, Clone)]
pub struct SitewiseConfig {
    pub store_root: PathBuf,
    pub capabilities: CapabilityConfig,
    pub resolution: ResolutionConfig,
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub agent: AgentConfig,
    pub geocoder_endpoint: Option<String>,
}

impl Default for SitewiseConfig {
    fn default() -> Self {
        LayeredConfig::with_defaults().resolve()
    }
}

/// Capability identifiers and delivery mode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityConfig {
    pub terrain_function: Option<String>,
    pub layout_function: Option<String>,
    pub simulation_function: Option<String>,
    pub report_function: Option<String>,
    pub endpoint: String,
    pub required: Vec<Capability>,
    pub async_delivery: bool,
}

impl CapabilityConfig {
    /// Configured identifier for a capability, `None` when unconfigured
    pub fn function_for(&self, capability: Capability) -> Option<&str> {
        match capability {
            Capability::Terrain => self.terrain_function.as_deref(),
            Capability::Layout => self.layout_function.as_deref(),
            Capability::Simulation => self.simulation_function.as_deref(),
            Capability::Report => self.report_function.as_deref(),
        }
    }

    pub fn is_available(&self, capability: Capability) -> bool {
        self.function_for(capability).is_some()
    }

    /// Required capabilities lacking an identifier
    pub fn missing_required(&self) -> Vec<Capability> {
        self.required.iter().copied().filter(|c| !self.is_available(*c)).collect()
    }

    pub fn with_function(mut self, capability: Capability, function: impl Into<String>) -> Self {
        let slot = match capability {
            Capability::Terrain => &mut self.terrain_function,
            Capability::Layout => &mut self.layout_function,
            Capability::Simulation => &mut self.simulation_function,
            Capability::Report => &mut self.report_function,
        };
        *slot = Some(function.into());
        self
    }
}

/// Proximity and fuzzy-matching thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionConfig {
    pub duplicate_radius_km: f64,
    pub fuzzy_similarity_threshold: f64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self { duplicate_radius_km: 1.0, fuzzy_similarity_threshold: 0.6 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    pub project_ttl: Duration,
    pub list_ttl: Duration,
    pub session_ttl: Duration,
    /// Upper bound on entries held by each in-process cache
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            project_ttl: Duration::from_secs(300),
            list_ttl: Duration::from_secs(30),
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

/// Intelligent agent endpoint, disabled when `endpoint` is `None`
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { endpoint: None, timeout: Duration::from_secs(30) }
    }
}
