use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use sitewise_core::config::LayeredConfig;
use sitewise_orchestrator::Orchestrator;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitewise_api::{create_router, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitewise_api=info,sitewise_orchestrator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_config = ApiConfig::from_env();
    let config = LayeredConfig::load(api_config.config_path.as_deref())
        .context("Failed to load configuration")?
        .resolve();

    tracing::info!(
        port = api_config.port,
        store_root = %config.store_root.display(),
        agent = config.agent.endpoint.is_some(),
        "Starting Sitewise API server"
    );

    let missing = config.capabilities.missing_required();
    if !missing.is_empty() {
        let vars: Vec<&str> = missing.iter().map(|c| c.env_var()).collect();
        tracing::warn!(
            missing = ?vars,
            "Required capabilities are not configured; affected queries will report a deployment issue"
        );
    }

    let orchestrator = Orchestrator::from_config(&config).context("Failed to initialise orchestrator")?;
    let state = Arc::new(AppState::new(Arc::new(orchestrator)));

    let origin = api_config
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin '{}'", api_config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = create_router(state).layer(cors);

    let addr = api_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    tracing::info!("CORS enabled for {}", api_config.cors_origin);

    axum::serve(listener, app).await?;
    Ok(())
}
