use serde::{Deserialize, Serialize};

/// A prompt stored at `prompts/<category>/<name>.md`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub name: String,
    pub category: String,
    pub content: String,
    pub description: Option<String>,
    /// Suggested default model.
    pub model: Option<String>,
    /// Placeholders found in the content, in first-seen order.
    pub variables: Vec<String>,
    pub updated_at: Option<String>,
}

/// Sidecar metadata kept next to the markdown file as `<name>.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl PromptMeta {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.model.is_none()
    }
}
