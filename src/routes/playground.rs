use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::provider::Provider;
use crate::services::playground_service;
use crate::services::provider_service::Completion;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TestRequest {
    pub prompt: String,
    pub model: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Explicit provider; guessed from the model name when absent.
    pub provider: Option<Provider>,
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub success: bool,
    pub response: String,
    pub provider: Provider,
    pub tokens: u64,
    /// Estimated, not billed.
    pub cost: f64,
    pub duration: u64,
}

impl From<Completion> for TestResponse {
    fn from(c: Completion) -> Self {
        Self {
            success: true,
            response: c.content,
            provider: c.provider,
            tokens: c.tokens,
            cost: c.cost,
            duration: c.duration_ms,
        }
    }
}

/// POST /api/playground/test
async fn test_prompt(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TestRequest>,
) -> Result<Json<TestResponse>, AppError> {
    if body.model.trim().is_empty() {
        return Err(AppError::BadRequest("model is required".into()));
    }
    let completion =
        playground_service::run(&state, &body.model, body.provider, &body.prompt, &body.variables).await?;
    Ok(Json(completion.into()))
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub prompt: String,
    pub models: Vec<String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// POST /api/playground/compare: one entry per model, in request order
async fn compare(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CompareRequest>,
) -> Result<Json<Vec<Value>>, AppError> {
    if body.models.is_empty() {
        return Err(AppError::BadRequest("models must not be empty".into()));
    }
    let results = playground_service::compare(&state, &body.models, &body.prompt, &body.variables).await;
    let out = results
        .into_iter()
        .map(|(model, result)| match result {
            Ok(c) => {
                let mut v = json!(TestResponse::from(c));
                v["model"] = Value::String(model);
                v
            }
            Err(e) => json!({ "model": model, "success": false, "error": e.to_string() }),
        })
        .collect();
    Ok(Json(out))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/playground/test", post(test_prompt))
        .route("/playground/compare", post(compare))
}
