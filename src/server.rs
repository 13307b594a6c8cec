use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::AppState;

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let allow_origin = if cors_origin == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cors_origin
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    Router::new()
        .route(
            "/",
            get(|| async { Json(json!({ "name": "easyai", "version": env!("CARGO_PKG_VERSION"), "api": "/api" })) }),
        )
        .nest("/api", routes::api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the dashboard API until the process is stopped.
pub async fn serve(state: AppState, listen_addr: &str) -> anyhow::Result<()> {
    let state = Arc::new(state);
    std::fs::create_dir_all(state.config.workspace.prompts_dir())?;

    let app = app(state.clone());
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("Dashboard API listening on http://{}", listener.local_addr()?);
    tracing::info!("Workspace: {}", state.config.workspace.root().display());
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
