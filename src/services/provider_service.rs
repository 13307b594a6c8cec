use std::time::{Duration, Instant};

use reqwest::{header, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use crate::config::{ApiKeys, Config};
use crate::error::ProviderError;
use crate::models::provider::{Provider, Resolution};
use crate::services::pricing;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;
const OLLAMA_TIMEOUT: Duration = Duration::from_secs(60);
const REMOTE_TIMEOUT: Duration = Duration::from_secs(120);

/// Normalised result of one provider call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub provider: Provider,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub tokens: u64,
    /// Estimated cost in USD.
    pub cost: f64,
    pub duration_ms: u64,
}

/// Token usage as reported by the provider.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Usage {
    prompt: u64,
    completion: u64,
    total: Option<u64>,
}

impl Usage {
    fn total(&self) -> u64 {
        self.total.unwrap_or(self.prompt + self.completion)
    }
}

/// Send `prompt` to `model` on the resolved provider.
pub async fn dispatch(
    client: &reqwest::Client,
    config: &Config,
    keys: &ApiKeys,
    model: &str,
    resolution: Resolution,
    prompt: &str,
) -> Result<Completion, ProviderError> {
    let provider = resolution.provider;
    let start = Instant::now();

    let api_key = match provider.api_key_env() {
        Some(_) => Some(keys.get(provider).ok_or(ProviderError::Auth(provider))?),
        None => None,
    };

    let base_url = config.base_url(provider);
    let request = build_request(client, provider, &base_url, api_key, model, prompt);

    tracing::debug!("Dispatching {} to {} ({})", model, provider, base_url);

    let response = request.send().await.map_err(|e| {
        transport_error(provider, model, &base_url, resolution.guessed, &e)
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| ProviderError::Upstream {
        provider,
        status: Some(status.as_u16()),
        message: format!("failed to read response: {e}"),
    })?;

    if !status.is_success() {
        return Err(status_error(provider, model, status, &body));
    }

    let json: Value = serde_json::from_str(&body).map_err(|e| ProviderError::Upstream {
        provider,
        status: Some(status.as_u16()),
        message: format!("invalid JSON response: {e}"),
    })?;

    let (content, usage) = parse_response(provider, &json).ok_or_else(|| ProviderError::Upstream {
        provider,
        status: Some(status.as_u16()),
        message: "response did not contain any output".to_string(),
    })?;

    let tokens = usage.total();
    let cost = if usage.prompt + usage.completion == 0 && tokens > 0 {
        pricing::estimate_cost(model, provider, tokens / 2, tokens - tokens / 2)
    } else {
        pricing::estimate_cost(model, provider, usage.prompt, usage.completion)
    };

    Ok(Completion {
        content,
        provider,
        prompt_tokens: usage.prompt,
        completion_tokens: usage.completion,
        tokens,
        cost,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Shape the upstream request for each provider.
fn build_request(
    client: &reqwest::Client,
    provider: Provider,
    base_url: &str,
    api_key: Option<&str>,
    model: &str,
    prompt: &str,
) -> RequestBuilder {
    let key = api_key.unwrap_or_default();
    match provider {
        Provider::OpenAI | Provider::OpenRouter => {
            let mut req = client
                .post(format!("{base_url}/chat/completions"))
                .header(header::AUTHORIZATION, format!("Bearer {key}"))
                .json(&json!({
                    "model": model,
                    "messages": [{ "role": "user", "content": prompt }],
                }))
                .timeout(REMOTE_TIMEOUT);
            if provider == Provider::OpenRouter {
                req = req
                    .header("HTTP-Referer", "http://localhost")
                    .header("X-Title", "easyai");
            }
            req
        }
        Provider::Anthropic => client
            .post(format!("{base_url}/messages"))
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": model,
                "max_tokens": ANTHROPIC_MAX_TOKENS,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .timeout(REMOTE_TIMEOUT),
        Provider::Gemini => {
            let model = model.strip_prefix("models/").unwrap_or(model);
            client
                .post(format!("{base_url}/models/{model}:generateContent"))
                .query(&[("key", key)])
                .json(&json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                }))
                .timeout(REMOTE_TIMEOUT)
        }
        Provider::Ollama => client
            .post(format!("{base_url}/api/generate"))
            .json(&json!({
                "model": model,
                "prompt": prompt,
                "stream": false,
            }))
            .timeout(OLLAMA_TIMEOUT),
    }
}

fn as_u64(v: Option<&Value>) -> u64 {
    v.and_then(Value::as_u64).unwrap_or(0)
}

/// Pull the text and usage out of a successful response body.
fn parse_response(provider: Provider, body: &Value) -> Option<(String, Usage)> {
    match provider {
        Provider::OpenAI | Provider::OpenRouter => {
            let content = body
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)?
                .to_string();
            let usage = body.get("usage");
            Some((
                content,
                Usage {
                    prompt: as_u64(usage.and_then(|u| u.get("prompt_tokens"))),
                    completion: as_u64(usage.and_then(|u| u.get("completion_tokens"))),
                    total: usage.and_then(|u| u.get("total_tokens")).and_then(Value::as_u64),
                },
            ))
        }
        Provider::Anthropic => {
            let blocks = body.get("content")?.as_array()?;
            let content: String = blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect();
            let usage = body.get("usage");
            Some((
                content,
                Usage {
                    prompt: as_u64(usage.and_then(|u| u.get("input_tokens"))),
                    completion: as_u64(usage.and_then(|u| u.get("output_tokens"))),
                    total: None,
                },
            ))
        }
        Provider::Gemini => {
            let parts = body.pointer("/candidates/0/content/parts")?.as_array()?;
            let content: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            let usage = body.get("usageMetadata");
            Some((
                content,
                Usage {
                    prompt: as_u64(usage.and_then(|u| u.get("promptTokenCount"))),
                    completion: as_u64(usage.and_then(|u| u.get("candidatesTokenCount"))),
                    total: usage.and_then(|u| u.get("totalTokenCount")).and_then(Value::as_u64),
                },
            ))
        }
        Provider::Ollama => {
            let content = body.get("response").and_then(Value::as_str)?.to_string();
            Some((
                content,
                Usage {
                    prompt: as_u64(body.get("prompt_eval_count")),
                    completion: as_u64(body.get("eval_count")),
                    total: None,
                },
            ))
        }
    }
}

/// Best human-readable message from an error body.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error"))
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        "no error details".to_string()
    } else if message.chars().count() > 300 {
        format!("{}...", message.chars().take(300).collect::<String>())
    } else {
        message
    }
}

fn status_error(provider: Provider, model: &str, status: StatusCode, body: &str) -> ProviderError {
    let message = error_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized { provider, message },
        // Gemini reports a bad key as 400.
        StatusCode::BAD_REQUEST if message.to_lowercase().contains("api key") => {
            ProviderError::Unauthorized { provider, message }
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimit { provider, message },
        StatusCode::NOT_FOUND if provider == Provider::Ollama => ProviderError::NotFound(format!(
            "Model '{model}' is not available in Ollama. Run `ollama pull {model}` first."
        )),
        StatusCode::NOT_FOUND => {
            ProviderError::NotFound(format!("Model '{model}' was not found on {provider}: {message}"))
        }
        _ => ProviderError::Upstream {
            provider,
            status: Some(status.as_u16()),
            message,
        },
    }
}

fn transport_error(
    provider: Provider,
    model: &str,
    base_url: &str,
    guessed: bool,
    e: &reqwest::Error,
) -> ProviderError {
    if provider == Provider::Ollama && e.is_connect() {
        if guessed {
            return ProviderError::NotFound(format!(
                "Model '{model}' not found: no provider matched it and Ollama is not reachable at {base_url}"
            ));
        }
        return ProviderError::Upstream {
            provider,
            status: None,
            message: format!("Ollama is not reachable at {base_url}. Is it running?"),
        };
    }
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        e.to_string()
    };
    ProviderError::Upstream {
        provider,
        status: None,
        message,
    }
}
