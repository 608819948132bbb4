use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{any, get, post, put},
};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{
    auth::require_token,
    relay,
    services::{extensions, system, tasks},
    state::AppState,
};
use crate::config::Config;
use crate::engine::LocalEngine;
use crate::extension::{ExtensionRegistry, FetchConfig, ManifestSource};
use crate::ledger::FjallStore;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Full application router. `/health` sits outside `/api/v1` and its token check.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/info", get(system::info))
        .route("/resolve", post(tasks::resolve))
        .route(
            "/tasks",
            post(tasks::create_task)
                .get(tasks::get_tasks)
                .delete(tasks::delete_tasks),
        )
        .route("/tasks/batch", post(tasks::create_task_batch))
        .route("/tasks/pause", put(tasks::pause_tasks))
        .route("/tasks/continue", put(tasks::continue_tasks))
        .route(
            "/tasks/{id}",
            get(tasks::get_task).delete(tasks::delete_task),
        )
        .route("/tasks/{id}/pause", put(tasks::pause_task))
        .route("/tasks/{id}/continue", put(tasks::continue_task))
        .route("/tasks/{id}/stats", get(tasks::get_stats))
        .route("/config", get(system::get_config).put(system::put_config))
        .route(
            "/extensions",
            post(extensions::install_extension).get(extensions::get_extensions),
        )
        .route(
            "/extensions/{identity}",
            get(extensions::get_extension).delete(extensions::delete_extension),
        )
        .route(
            "/extensions/{identity}/settings",
            put(extensions::update_extension_settings),
        )
        .route(
            "/extensions/{identity}/switch",
            put(extensions::switch_extension),
        )
        .route(
            "/extensions/{identity}/update",
            get(extensions::update_check_extension).post(extensions::update_extension),
        )
        .route("/proxy", any(relay::proxy))
        .route("/proxy/{*rest}", any(relay::proxy))
        .layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(system::health))
        .nest("/api/v1", api)
        .with_state(state)
        // Automatically decompress gzip request bodies
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Wire the bundled engine and extension registry to the ledger and serve
pub async fn run(config: Config) -> Result<(), AnyError> {
    let ledger_path = config.ledger_path();
    info!(path = %ledger_path.display(), "Opening ledger");
    let store = FjallStore::open(&ledger_path)
        .map_err(|e| format!("Failed to open ledger: {}", e))?;
    let stats = store.stats()?;
    info!(
        tasks = stats.task_count,
        extensions = stats.extension_count,
        "Ledger loaded"
    );

    let engine = LocalEngine::open(store.clone(), config.engine.store_defaults())
        .map_err(|e| format!("Failed to start engine: {}", e))?;

    let source = ManifestSource::new(FetchConfig {
        timeout: config.extensions.fetch_timeout(),
        manifest_path: config.extensions.manifest_path.clone(),
        user_agent: config.relay.user_agent.clone(),
    })?;
    let registry = ExtensionRegistry::open(source, store.clone())
        .map_err(|e| format!("Failed to load extensions: {}", e))?;

    let http = relay::client(&config.relay)?;
    let address = config.server.bind_addr;
    if config.server.api_token.is_some() {
        info!("API token authentication enabled");
    }

    let state = AppState::new(config, Arc::new(engine), Arc::new(registry), http);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "fetchdeck API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.persist()?;
    info!("Ledger flushed");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
