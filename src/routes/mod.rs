use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod dashboard;
pub mod playground;
pub mod prompts;

/// All dashboard endpoints (to be nested under /api)
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(dashboard::router())
        .merge(prompts::router())
        .merge(playground::router())
}
