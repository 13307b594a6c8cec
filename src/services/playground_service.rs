use std::collections::HashMap;
use std::time::Instant;

use futures::future::join_all;

use crate::error::ProviderError;
use crate::models::provider::Provider;
use crate::services::log_service::{self, NewCallLog};
use crate::services::provider_service::{self, Completion};
use crate::services::template_service;
use crate::state::AppState;

/// Substitute, dispatch, and log one call. The log line is written whether
/// the call succeeds or not.
pub async fn run(
    state: &AppState,
    model: &str,
    provider: Option<Provider>,
    prompt: &str,
    variables: &HashMap<String, String>,
) -> Result<Completion, ProviderError> {
    let text = template_service::substitute(prompt, variables);
    let resolution = Provider::resolve(model, provider);
    let keys = state.config.api_keys();

    let start = Instant::now();
    let result = provider_service::dispatch(
        &state.http_client,
        &state.config,
        &keys,
        model,
        resolution,
        &text,
    )
    .await;

    match &result {
        Ok(c) => tracing::info!(
            "{} via {}: {} tokens, ~${:.6}, {} ms",
            model,
            c.provider,
            c.tokens,
            c.cost,
            c.duration_ms
        ),
        Err(e) => tracing::warn!("{} via {} failed: {}", model, resolution.provider, e),
    }

    let record = NewCallLog {
        model,
        provider: Some(resolution.provider.as_str()),
        prompt: &text,
        outcome: result.as_ref().map_err(|e| e.to_string()),
        duration_ms: start.elapsed().as_millis() as u64,
        keep_full_text: state.config.log_full_text,
    }
    .into_record();
    log_service::append_best_effort(&state.config.workspace.log_file(), &record).await;

    result
}

/// Run the same prompt against several models at once. Results come back in
/// the order the models were given.
pub async fn compare(
    state: &AppState,
    models: &[String],
    prompt: &str,
    variables: &HashMap<String, String>,
) -> Vec<(String, Result<Completion, ProviderError>)> {
    let calls = models
        .iter()
        .map(|model| async move { (model.clone(), run(state, model, None, prompt, variables).await) });
    join_all(calls).await
}
