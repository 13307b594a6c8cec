use serde::Serialize;

use crate::models::provider::Provider;

/// Entry returned by `GET /api/models`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: Provider,
    pub description: String,
    /// Provider-specific fields (context length, pricing, size, ...).
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, provider: Provider, description: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider,
            description: description.into(),
            extras: serde_json::Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        if !value.is_null() {
            self.extras.insert(key.to_string(), value);
        }
        self
    }
}
