use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{self, Settings};
use crate::error::AppError;
use crate::models::call_log::{Analytics, CallLogRecord};
use crate::models::model::ModelInfo;
use crate::models::provider::Provider;
use crate::services::{analytics_service, log_service, model_service};
use crate::state::AppState;

/// GET /api/analytics
async fn analytics(State(state): State<Arc<AppState>>) -> Result<Json<Analytics>, AppError> {
    let records = log_service::read_all(&state.config.workspace.log_file()).await?;
    Ok(Json(analytics_service::aggregate(&records)))
}

#[derive(Debug, Deserialize)]
pub struct ListLogsQuery {
    pub limit: Option<usize>,
    pub model: Option<String>,
    pub success: Option<bool>,
    pub filter: Option<String>,
}

/// GET /api/logs: most recent first, capped
async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLogsQuery>,
) -> Result<Json<Vec<CallLogRecord>>, AppError> {
    let cap = state.config.log_cap;
    let params = log_service::ListLogsParams {
        limit: query.limit.unwrap_or(cap).min(cap),
        filter: query.filter,
        model: query.model,
        success: query.success,
    };
    let records = log_service::read_all(&state.config.workspace.log_file()).await?;
    Ok(Json(log_service::recent(records, &params)))
}

/// GET /api/models
async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelInfo>> {
    let keys = state.config.api_keys();
    Json(model_service::list_models(&state.http_client, &state.config, &keys).await)
}

/// GET /api/health
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let keys = state.config.api_keys();
    let configured: serde_json::Map<String, Value> = Provider::ALL
        .iter()
        .map(|p| (p.as_str().to_string(), Value::Bool(keys.is_configured(*p))))
        .collect();
    Json(json!({
        "status": "ok",
        "config": configured,
        "timestamp": log_service::now_timestamp(),
    }))
}

/// GET /api/config: env file with secrets masked, plus settings
async fn get_config(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let ws = &state.config.workspace;
    let vars = config::read_env_file(&ws.env_file())?;
    Ok(Json(json!({
        "envVars": config::sanitize_env(&vars),
        "settings": Settings::load(ws),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigRequest {
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    pub settings: Option<Settings>,
}

/// POST /api/config/save: merge into the env file
async fn save_config(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveConfigRequest>,
) -> Result<Json<Value>, AppError> {
    let ws = &state.config.workspace;
    config::merge_env_file(&ws.env_file(), &body.env_vars)?;
    if let Some(settings) = body.settings {
        settings.save(ws)?;
    }
    tracing::info!("Saved configuration ({} variables submitted)", body.env_vars.len());
    Ok(Json(json!({ "success": true })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics", get(analytics))
        .route("/logs", get(list_logs))
        .route("/models", get(list_models))
        .route("/health", get(health))
        .route("/config", get(get_config))
        .route("/config/save", post(save_config))
}
