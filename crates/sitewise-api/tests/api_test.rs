//! HTTP surface tests driven through the router with `tower::ServiceExt`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sitewise_api::{create_router, AppState};
use sitewise_core::config::{CacheConfig, CapabilityConfig, SitewiseConfig};
use sitewise_core::error::Result;
use sitewise_core::models::{
    Capability, CapabilityRequest, CapabilityResponse, Coordinates, ProjectUpdate, Stage,
};
use sitewise_core::retry::RetryPolicy;
use sitewise_invoke::CapabilityInvoker;
use sitewise_orchestrator::{Orchestrator, OrchestratorDeps};
use sitewise_store::{MemoryObjectStore, MemorySessionBackend, ProjectStore, SessionContextStore};
use tower::ServiceExt;

struct TerrainOnlyInvoker;

#[async_trait]
impl CapabilityInvoker for TerrainOnlyInvoker {
    async fn invoke(&self, _function: &str, _request: &CapabilityRequest) -> Result<CapabilityResponse> {
        Ok(CapabilityResponse {
            success: true,
            result_type: "wind_farm_terrain_analysis".into(),
            data: json!({"features": 7, "metrics": {"buildable_area_km2": 4.0}}),
            error: None,
        })
    }

    async fn invoke_async(&self, _function: &str, _request: &CapabilityRequest) -> Result<()> {
        Ok(())
    }
}

struct TestApp {
    router: Router,
    store: Arc<ProjectStore>,
}

fn test_app() -> TestApp {
    let capabilities = CapabilityConfig {
        endpoint: "http://localhost:9000".into(),
        required: vec![Capability::Terrain],
        ..Default::default()
    }
    .with_function(Capability::Terrain, "terrain-fn")
    .with_function(Capability::Layout, "layout-fn");
    let config = SitewiseConfig { capabilities, retry: RetryPolicy::immediate(1), ..Default::default() };

    let store = Arc::new(ProjectStore::new(
        Arc::new(MemoryObjectStore::new()),
        CacheConfig::default(),
        RetryPolicy::immediate(1),
    ));
    let sessions = Arc::new(
        SessionContextStore::new(
            Arc::new(MemorySessionBackend::new()),
            CacheConfig::default(),
        )
        .unwrap(),
    );

    let orchestrator = Orchestrator::new(
        &config,
        OrchestratorDeps {
            store: store.clone(),
            sessions,
            invoker: Arc::new(TerrainOnlyInvoker),
            agent: None,
            geocoder: None,
        },
    );

    let state = Arc::new(AppState::new(Arc::new(orchestrator)));
    TestApp { router: create_router(state), store }
}

async fn seed(store: &ProjectStore, name: &str, latitude: f64, longitude: f64) {
    let update = ProjectUpdate::new()
        .coordinates(Coordinates::new(latitude, longitude))
        .stage_result(Stage::Terrain, json!({"seeded": true}));
    store.save(name, update).await.unwrap();
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = test_app();

    let (status, body) = send(&app.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app.router, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["strategies"], json!(["direct_invocation"]));
}

#[tokio::test]
async fn test_query_runs_terrain_analysis() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/v1/query",
        Some(json!({"query": "analyze terrain at 35.067482, -101.395466", "sessionId": "s1"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true, "{}", body["message"]);
    assert_eq!(body["metadata"]["projectName"], "site-35-067n-101-395w");
    assert_eq!(body["metadata"]["toolsUsed"], json!(["terrain-fn"]));

    assert!(app.store.load("site-35-067n-101-395w").await.unwrap().is_some());
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let app = test_app();

    let (status, body) = send(&app.router, Method::POST, "/api/v1/query", Some(json!({"query": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_missing_project_is_404() {
    let app = test_app();

    let (status, body) = send(&app.router, Method::GET, "/api/v1/projects/nowhere-wind-farm", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PROJECT_NOT_FOUND");
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let app = test_app();
    seed(&app.store, "abilene-wind-farm", 32.4487, -99.7331).await;

    let (status, body) = send(&app.router, Method::DELETE, "/api/v1/projects/abilene-wind-farm", None).await;
    assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
    assert_eq!(body["code"], "CONFIRMATION_REQUIRED");
    assert!(app.store.exists("abilene-wind-farm").await.unwrap());

    let (status, body) = send(
        &app.router,
        Method::DELETE,
        "/api/v1/projects/abilene-wind-farm?confirm=true",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(!app.store.exists("abilene-wind-farm").await.unwrap());
}

#[tokio::test]
async fn test_list_geojson_and_duplicates() {
    let app = test_app();
    seed(&app.store, "abilene-wind-farm", 32.4487, -99.7331).await;
    seed(&app.store, "abilene-north", 32.4520, -99.7300).await;

    let (status, body) = send(&app.router, Method::GET, "/api/v1/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&app.router, Method::GET, "/api/v1/projects/geojson", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["features"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app.router, Method::GET, "/api/v1/projects/duplicates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["groups"].as_array().unwrap().len(), 1);

    let (status, _) =
        send(&app.router, Method::GET, "/api/v1/projects/duplicates?lat=32.45", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rename_export_and_import() {
    let app = test_app();
    seed(&app.store, "abilene-wind-farm", 32.4487, -99.7331).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/v1/projects/abilene-wind-farm/rename",
        Some(json!({"new_name": "abilene-east", "confirm": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project_name"], "abilene-east");

    let (status, export) = send(&app.router, Method::GET, "/api/v1/projects/abilene-east/export", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(export["version"], "1.0");

    let (status, body) = send(&app.router, Method::POST, "/api/v1/projects/import", Some(export)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["project_name"], "abilene-east-imported");
    assert!(app.store.exists("abilene-east").await.unwrap());
}
