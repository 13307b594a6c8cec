use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::prompt::{PromptMeta, PromptTemplate};
use crate::services::prompt_service;
use crate::state::AppState;

/// GET /api/prompts: previews only
async fn list_prompts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<PromptTemplate>>, AppError> {
    let prompts = prompt_service::list_previews(&state.config.workspace.prompts_dir()).await?;
    Ok(Json(prompts))
}

/// GET /api/prompts/{category}/{name}
async fn get_prompt(
    State(state): State<Arc<AppState>>,
    Path((category, name)): Path<(String, String)>,
) -> Result<Json<PromptTemplate>, AppError> {
    let prompt = prompt_service::read(&state.config.workspace.prompts_dir(), &category, &name).await?;
    Ok(Json(prompt))
}

#[derive(Debug, Deserialize)]
pub struct SavePromptRequest {
    pub content: String,
    pub description: Option<String>,
    pub model: Option<String>,
}

/// POST /api/prompts/{category}/{name}
async fn save_prompt(
    State(state): State<Arc<AppState>>,
    Path((category, name)): Path<(String, String)>,
    Json(body): Json<SavePromptRequest>,
) -> Result<Json<Value>, AppError> {
    let meta = (body.description.is_some() || body.model.is_some()).then(|| PromptMeta {
        description: body.description.filter(|d| !d.trim().is_empty()),
        model: body.model.filter(|m| !m.trim().is_empty()),
    });
    prompt_service::write(
        &state.config.workspace.prompts_dir(),
        &category,
        &name,
        &body.content,
        meta.as_ref(),
    )
    .await?;
    tracing::info!("Saved prompt {}/{}", category, name);
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/prompts/{category}/{name}
async fn delete_prompt(
    State(state): State<Arc<AppState>>,
    Path((category, name)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    prompt_service::delete(&state.config.workspace.prompts_dir(), &category, &name).await?;
    Ok(Json(json!({ "success": true })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/prompts", get(list_prompts))
        .route(
            "/prompts/{category}/{name}",
            get(get_prompt).post(save_prompt).delete(delete_prompt),
        )
}
