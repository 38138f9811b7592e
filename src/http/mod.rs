//! HTTP surface
//!
//! Per-language routes answering `{ success, output }`, a richer
//! `/api/execute`, and the health and welcome endpoints. Execution runs on
//! the blocking pool behind a semaphore sized from the runner config.

pub mod error;
pub mod routes;
pub mod state;

use crate::config::runner::{RunnerConfig, ServerConfig};
use crate::exec::coordinator::ExecutionCoordinator;
use crate::observability::audit::events;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use log::{info, warn};
use routes::{
    execute_handler, health_handler, root_handler, run_cpp, run_java, run_js, run_python,
};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    net::TcpListener,
    signal::{
        ctrl_c,
        unix::{signal, SignalKind},
    },
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Workspaces older than this are swept when the server starts.
const STALE_WORKSPACE_AGE: Duration = Duration::from_secs(60 * 60);

pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60))
}

pub fn router(state: Arc<AppState>) -> Router {
    let compiler = Router::new()
        .route("/run-java", post(run_java))
        .route("/run-cpp", post(run_cpp))
        .route("/run-js", post(run_js))
        .route("/run-python", post(run_python));

    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/execute", post(execute_handler))
        .nest("/api/compiler", compiler.clone())
        .merge(compiler)
        .layer(cors_layer(&state.config))
        .with_state(state)
}

pub async fn serve(server: ServerConfig, runner: RunnerConfig) -> anyhow::Result<()> {
    info!("Initializing execution coordinator...");
    let coordinator = ExecutionCoordinator::new(runner)?;

    match coordinator.workspaces().sweep_stale(STALE_WORKSPACE_AGE) {
        Ok(0) => {}
        Ok(removed) => events::stale_sweep(removed),
        Err(e) => warn!("Stale workspace sweep failed: {}", e),
    }

    let address = format!("0.0.0.0:{}", server.port);
    let state = AppState::new(coordinator, server);
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
