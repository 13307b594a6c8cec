use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;

use crate::config::{ApiKeys, Config};
use crate::models::model::ModelInfo;
use crate::models::provider::Provider;

const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Hardcoded models used when a live listing is unavailable.
pub fn fallback_models(provider: Provider) -> Vec<ModelInfo> {
    let entries: &[(&str, &str)] = match provider {
        Provider::OpenAI => &[
            ("gpt-4o", "Flagship multimodal model"),
            ("gpt-4o-mini", "Small, fast and cheap"),
            ("gpt-4-turbo", "Previous generation GPT-4"),
            ("gpt-3.5-turbo", "Legacy chat model"),
        ],
        Provider::Anthropic => &[
            ("claude-3-5-sonnet-latest", "Balanced intelligence and speed"),
            ("claude-3-opus-latest", "Most capable Claude 3 model"),
            ("claude-3-haiku-20240307", "Fastest Claude 3 model"),
        ],
        Provider::Gemini => &[
            ("gemini-1.5-pro", "Long-context reasoning"),
            ("gemini-1.5-flash", "Fast multimodal model"),
        ],
        Provider::OpenRouter => &[
            ("openai/gpt-4o", "GPT-4o via OpenRouter"),
            ("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet via OpenRouter"),
            ("meta-llama/llama-3.1-70b-instruct", "Llama 3.1 70B via OpenRouter"),
        ],
        Provider::Ollama => &[
            ("llama3", "Local Llama 3"),
            ("mistral", "Local Mistral 7B"),
        ],
    };
    entries
        .iter()
        .map(|(id, desc)| ModelInfo::new(*id, provider, *desc).with_extra("fallback", Value::Bool(true)))
        .collect()
}

/// Models from every configured provider (Ollama is always tried). Each
/// provider falls back to its hardcoded list independently.
pub async fn list_models(client: &reqwest::Client, config: &Config, keys: &ApiKeys) -> Vec<ModelInfo> {
    let providers: Vec<Provider> = Provider::ALL
        .into_iter()
        .filter(|p| keys.is_configured(*p))
        .collect();

    let results = join_all(providers.iter().map(|p| list_provider(client, config, keys, *p))).await;
    results.into_iter().flatten().collect()
}

pub async fn list_provider(
    client: &reqwest::Client,
    config: &Config,
    keys: &ApiKeys,
    provider: Provider,
) -> Vec<ModelInfo> {
    match fetch_live(client, config, keys, provider).await {
        Ok(models) if !models.is_empty() => models,
        Ok(_) => fallback_models(provider),
        Err(e) => {
            tracing::warn!("Live model listing for {} failed, using fallback: {}", provider, e);
            fallback_models(provider)
        }
    }
}

async fn fetch_live(
    client: &reqwest::Client,
    config: &Config,
    keys: &ApiKeys,
    provider: Provider,
) -> anyhow::Result<Vec<ModelInfo>> {
    let base = config.base_url(provider);
    let key = keys.get(provider).unwrap_or_default();

    let request = match provider {
        Provider::OpenAI => client.get(format!("{base}/models")).bearer_auth(key),
        Provider::OpenRouter => client.get(format!("{base}/models")).bearer_auth(key),
        Provider::Anthropic => client
            .get(format!("{base}/models"))
            .header("x-api-key", key)
            .header("anthropic-version", "2023-06-01"),
        Provider::Gemini => client.get(format!("{base}/models")).query(&[("key", key)]),
        Provider::Ollama => client.get(format!("{base}/api/tags")),
    };

    let body: Value = request
        .timeout(LIST_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(parse_listing(provider, &body))
}

fn parse_listing(provider: Provider, body: &Value) -> Vec<ModelInfo> {
    let items = match provider {
        Provider::Gemini => body.get("models"),
        Provider::Ollama => body.get("models"),
        _ => body.get("data"),
    }
    .and_then(Value::as_array);

    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match provider {
            Provider::OpenAI => {
                let id = item.get("id")?.as_str()?;
                // Only chat-capable families are useful in the playground.
                if !(id.contains("gpt") || id.starts_with('o')) {
                    return None;
                }
                Some(
                    ModelInfo::new(id, provider, "OpenAI model")
                        .with_extra("ownedBy", item.get("owned_by").cloned().unwrap_or(Value::Null)),
                )
            }
            Provider::Anthropic => {
                let id = item.get("id")?.as_str()?;
                let name = item.get("display_name").and_then(Value::as_str).unwrap_or(id);
                Some(ModelInfo::new(id, provider, "Anthropic model").with_name(name))
            }
            Provider::Gemini => {
                let full = item.get("name")?.as_str()?;
                let id = full.strip_prefix("models/").unwrap_or(full);
                if !id.contains("gemini") {
                    return None;
                }
                let description = item.get("description").and_then(Value::as_str).unwrap_or("Gemini model");
                let name = item.get("displayName").and_then(Value::as_str).unwrap_or(id);
                Some(
                    ModelInfo::new(id, provider, description)
                        .with_name(name)
                        .with_extra("inputTokenLimit", item.get("inputTokenLimit").cloned().unwrap_or(Value::Null)),
                )
            }
            Provider::OpenRouter => {
                let id = item.get("id")?.as_str()?;
                let name = item.get("name").and_then(Value::as_str).unwrap_or(id);
                let description = item.get("description").and_then(Value::as_str).unwrap_or("OpenRouter model");
                Some(
                    ModelInfo::new(id, provider, description)
                        .with_name(name)
                        .with_extra("contextLength", item.get("context_length").cloned().unwrap_or(Value::Null))
                        .with_extra("pricing", item.get("pricing").cloned().unwrap_or(Value::Null)),
                )
            }
            Provider::Ollama => {
                let id = item.get("name")?.as_str()?;
                Some(
                    ModelInfo::new(id, provider, "Local Ollama model")
                        .with_extra("size", item.get("size").cloned().unwrap_or(Value::Null))
                        .with_extra("modifiedAt", item.get("modified_at").cloned().unwrap_or(Value::Null)),
                )
            }
        })
        .collect()
}

/// Case-insensitive match on id, name and description.
pub fn search(models: Vec<ModelInfo>, query: &str) -> Vec<ModelInfo> {
    let q = query.to_lowercase();
    models
        .into_iter()
        .filter(|m| {
            m.id.to_lowercase().contains(&q)
                || m.name.to_lowercase().contains(&q)
                || m.description.to_lowercase().contains(&q)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_openrouter_listing_with_extras() {
        let body = json!({ "data": [
            { "id": "openai/gpt-4o", "name": "GPT-4o", "context_length": 128000, "pricing": { "prompt": "0.0000025" } }
        ]});
        let models = parse_listing(Provider::OpenRouter, &body);
        assert_eq!(models.len(), 1);
        let v = serde_json::to_value(&models[0]).unwrap();
        assert_eq!(v["provider"], "openrouter");
        assert_eq!(v["name"], "GPT-4o");
        assert_eq!(v["contextLength"], 128000);
    }

    #[test]
    fn filters_non_chat_models() {
        let body = json!({ "data": [{ "id": "gpt-4o" }, { "id": "whisper-1" }, { "id": "dall-e-3" }] });
        let ids: Vec<_> = parse_listing(Provider::OpenAI, &body).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gpt-4o"]);

        let body = json!({ "models": [{ "name": "models/gemini-1.5-pro" }, { "name": "models/embedding-001" }] });
        let ids: Vec<_> = parse_listing(Provider::Gemini, &body).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gemini-1.5-pro"]);
    }

    #[test]
    fn malformed_listing_is_empty() {
        assert!(parse_listing(Provider::Ollama, &json!({ "oops": true })).is_empty());
    }

    #[tokio::test]
    async fn unreachable_provider_falls_back() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = Config::new(crate::config::Workspace::new(std::env::temp_dir()));
        config.base_urls.insert(Provider::Ollama, format!("http://{addr}"));
        let models = list_models(&reqwest::Client::new(), &config, &ApiKeys::default()).await;

        // Only Ollama needs no key, so only its fallback list appears.
        assert!(!models.is_empty());
        assert!(models.iter().all(|m| m.provider == Provider::Ollama));
        assert!(models.iter().all(|m| m.extras.contains_key("fallback")));
    }

    #[test]
    fn search_matches_description() {
        let hits = search(fallback_models(Provider::Anthropic), "fastest");
        assert_eq!(hits.len(), 1);
    }
}
