//! End-to-end tests against real sockets
//!
//! These tests verify flows that leave the process:
//! 1. Extension install from a local folder (dev mode)
//! 2. Extension install, update-check and update from a mock repository
//! 3. The generic relay forwarding to a mock upstream
//!
//! Mock servers bind to 127.0.0.1 on an ephemeral port, no external services needed.

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, header},
    response::IntoResponse,
    routing::{any, get},
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

use fetchdeck::api::{self, AppState, relay};
use fetchdeck::config::Config;
use fetchdeck::engine::LocalEngine;
use fetchdeck::extension::{ExtensionRegistry, FetchConfig, ManifestSource};

fn build_app() -> Router {
    let config = Config::default();
    let engine = LocalEngine::in_memory(config.engine.store_defaults());
    let source = ManifestSource::new(FetchConfig::default()).expect("manifest source");
    let registry = ExtensionRegistry::in_memory(source);
    let http = relay::client(&config.relay).expect("relay client");

    api::router(AppState::new(config, Arc::new(engine), Arc::new(registry), http))
}

async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Value {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn manifest(version: &str) -> Value {
    json!({
        "name": "bili",
        "author": "gopher",
        "title": "Bilibili",
        "version": version,
        "settings": [
            {"name": "cookie", "title": "Cookie", "type": "string", "value": ""},
            {"name": "quality", "title": "Quality", "type": "number", "value": 80}
        ]
    })
}

type SharedManifest = Arc<RwLock<Value>>;

async fn serve_manifest(State(manifest): State<SharedManifest>) -> Json<Value> {
    let current = manifest.read().unwrap().clone();
    Json(current)
}

#[tokio::test]
async fn test_dev_mode_extension_lifecycle() {
    let app = build_app();
    let folder = TempDir::new().unwrap();
    let folder_path = folder.path().to_str().unwrap().to_string();
    std::fs::write(
        folder.path().join("manifest.json"),
        manifest("1.0.0").to_string(),
    )
    .unwrap();

    let installed = call(
        &app,
        "POST",
        "/api/v1/extensions",
        Some(json!({"url": folder_path, "devMode": true})),
    )
    .await;
    assert_eq!(installed["code"], 0, "{installed}");
    assert_eq!(installed["data"], "gopher@bili");

    let ext = call(&app, "GET", "/api/v1/extensions/gopher@bili", None).await;
    assert_eq!(ext["data"]["devMode"], true);
    assert_eq!(ext["data"]["disabled"], false);
    assert_eq!(ext["data"]["version"], "1.0.0");

    let settings = call(
        &app,
        "PUT",
        "/api/v1/extensions/gopher@bili/settings",
        Some(json!({"settings": {"cookie": "SESSDATA=1", "unknown": true}})),
    )
    .await;
    assert_eq!(settings["code"], 0);

    let switched = call(
        &app,
        "PUT",
        "/api/v1/extensions/gopher@bili/switch",
        Some(json!({"status": false})),
    )
    .await;
    assert_eq!(switched["code"], 0);

    let ext = call(&app, "GET", "/api/v1/extensions/gopher@bili", None).await;
    assert_eq!(ext["data"]["disabled"], true);
    assert_eq!(ext["data"]["settings"][0]["value"], "SESSDATA=1");

    // Already latest: the installed version comes back
    let check = call(&app, "GET", "/api/v1/extensions/gopher@bili/update", None).await;
    assert_eq!(check["data"], json!({"newVersion": "1.0.0"}));

    // A newer manifest in the folder is picked up on upgrade
    std::fs::write(
        folder.path().join("manifest.json"),
        manifest("1.2.0").to_string(),
    )
    .unwrap();
    let check = call(&app, "GET", "/api/v1/extensions/gopher@bili/update", None).await;
    assert_eq!(check["data"]["newVersion"], "1.2.0");

    let updated = call(&app, "POST", "/api/v1/extensions/gopher@bili/update", None).await;
    assert_eq!(updated["code"], 0);

    let ext = call(&app, "GET", "/api/v1/extensions/gopher@bili", None).await;
    assert_eq!(ext["data"]["version"], "1.2.0");
    assert_eq!(ext["data"]["disabled"], true);
    assert_eq!(ext["data"]["settings"][0]["value"], "SESSDATA=1");

    let list = call(&app, "GET", "/api/v1/extensions", None).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let deleted = call(&app, "DELETE", "/api/v1/extensions/gopher@bili", None).await;
    assert_eq!(deleted["code"], 0);

    let again = call(&app, "DELETE", "/api/v1/extensions/gopher@bili", None).await;
    assert_eq!(again["code"], 1000);
    assert_eq!(again["msg"], "extension not found");
}

#[tokio::test]
async fn test_unknown_extension_errors() {
    let app = build_app();

    let missing = call(&app, "GET", "/api/v1/extensions/nobody@nothing", None).await;
    assert_eq!(missing["code"], 1000);
    assert_eq!(missing["msg"], "extension not found");

    let settings = call(
        &app,
        "PUT",
        "/api/v1/extensions/nobody@nothing/settings",
        Some(json!({"settings": {"a": 1}})),
    )
    .await;
    assert_eq!(settings["code"], 1000);

    let folder = TempDir::new().unwrap();
    let empty_folder = call(
        &app,
        "POST",
        "/api/v1/extensions",
        Some(json!({"url": folder.path().to_str().unwrap(), "devMode": true})),
    )
    .await;
    assert_eq!(empty_folder["code"], 1000);

    let no_url = call(&app, "POST", "/api/v1/extensions", Some(json!({}))).await;
    assert_eq!(no_url["code"], 1002);
    assert_eq!(no_url["msg"], "param invalid: url");
}

#[tokio::test]
async fn test_remote_extension_update_flow() {
    let shared: SharedManifest = Arc::new(RwLock::new(manifest("1.0.0")));
    let repo = Router::new()
        .route("/gopher/ext-bili/raw/HEAD/manifest.json", get(serve_manifest))
        .with_state(shared.clone());
    let addr = spawn_server(repo).await;
    let repo_url = format!("http://{addr}/gopher/ext-bili.git");

    let app = build_app();
    let installed = call(
        &app,
        "POST",
        "/api/v1/extensions",
        Some(json!({"url": repo_url, "devMode": false})),
    )
    .await;
    assert_eq!(installed["code"], 0, "{installed}");
    assert_eq!(installed["data"], "gopher@bili");

    let ext = call(&app, "GET", "/api/v1/extensions/gopher@bili", None).await;
    assert_eq!(ext["data"]["devMode"], false);

    // Nothing newer yet: update is a no-op
    let updated = call(&app, "POST", "/api/v1/extensions/gopher@bili/update", None).await;
    assert_eq!(updated["code"], 0);

    *shared.write().unwrap() = manifest("2.0.0");

    // Update-check is read-only
    let check = call(&app, "GET", "/api/v1/extensions/gopher@bili/update", None).await;
    assert_eq!(check["data"]["newVersion"], "2.0.0");
    let ext = call(&app, "GET", "/api/v1/extensions/gopher@bili", None).await;
    assert_eq!(ext["data"]["version"], "1.0.0");

    let updated = call(&app, "POST", "/api/v1/extensions/gopher@bili/update", None).await;
    assert_eq!(updated["code"], 0);
    let ext = call(&app, "GET", "/api/v1/extensions/gopher@bili", None).await;
    assert_eq!(ext["data"]["version"], "2.0.0");
}

#[tokio::test]
async fn test_remote_install_failure_is_reported() {
    let repo = Router::new();
    let addr = spawn_server(repo).await;

    let app = build_app();
    let failed = call(
        &app,
        "POST",
        "/api/v1/extensions",
        Some(json!({"url": format!("http://{addr}/missing/repo")})),
    )
    .await;
    assert_eq!(failed["code"], 1000);
    assert!(failed["msg"].as_str().unwrap().contains("404"));
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let reply = json!({
        "method": method.as_str(),
        "custom": header_value("x-custom"),
        "token": header_value("x-api-token"),
        "host": header_value("host"),
        "body": String::from_utf8_lossy(&body),
    });

    let mut reply_headers = HeaderMap::new();
    reply_headers.append(header::SET_COOKIE, "a=1".parse().unwrap());
    reply_headers.append(header::SET_COOKIE, "b=2".parse().unwrap());
    reply_headers.insert("x-upstream", "mock".parse().unwrap());

    (StatusCode::CREATED, reply_headers, Json(reply))
}

#[tokio::test]
async fn test_relay_forwards_to_target() {
    let upstream = Router::new().route("/echo", any(echo));
    let addr = spawn_server(upstream).await;

    let app = build_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/proxy/ignored/path?also=ignored")
        .header("X-Target-Uri", format!("http://{addr}/echo?x=1"))
        .header("X-Custom", "kept")
        .header("X-Api-Token", "local-only")
        .body(Body::from("payload"))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get_all(header::SET_COOKIE).iter().count(),
        2
    );
    assert_eq!(response.headers().get("x-upstream").unwrap(), "mock");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let echoed: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["custom"], "kept");
    assert_eq!(echoed["token"], "");
    assert_eq!(echoed["host"], addr.to_string());
    assert_eq!(echoed["body"], "payload");

    let info = call(&app, "GET", "/api/v1/info", None).await;
    assert_eq!(info["data"]["metrics"]["relayRequests"], 1);
    assert_eq!(info["data"]["metrics"]["relayFailures"], 0);
}

#[tokio::test]
async fn test_relay_transport_failure() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = build_app();
    let request = Request::builder()
        .uri("/api/v1/proxy")
        .header("X-Target-Uri", format!("http://{addr}/gone"))
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(!bytes.is_empty());
}
