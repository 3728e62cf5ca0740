use std::env;
use std::path::PathBuf;

/// API server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origin: String,
    /// TOML file layered under the `SITEWISE_*` environment
    pub config_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            cors_origin: "http://localhost:3000".to_string(),
            config_path: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("SITEWISE_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(defaults.port);

        let cors_origin = env::var("SITEWISE_CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        let config_path = env::var("SITEWISE_CONFIG").ok().map(PathBuf::from);

        Self { port, cors_origin, config_path }
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
