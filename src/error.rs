use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::provider::Provider;

/// Failure of a single provider call. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{} API key is not configured. Add {} in Settings.", .0.display_name(), .0.api_key_env().unwrap_or("it"))]
    Auth(Provider),

    #[error("{provider} rejected the API key: {message}. Check your key in Settings.")]
    Unauthorized { provider: Provider, message: String },

    #[error("{provider} rate limit exceeded: {message}")]
    RateLimit { provider: Provider, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{provider} error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream {
        provider: Provider,
        status: Option<u16>,
        message: String,
    },
}

impl ProviderError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Auth(_) | ProviderError::Unauthorized { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Provider(e) => {
                tracing::warn!("Provider call failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Io(e) => {
                tracing::error!("Filesystem error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Anyhow(e) => {
                tracing::error!("Error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({ "success": false, "error": message }));
        (status, body).into_response()
    }
}
