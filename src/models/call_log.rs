use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// One line of `logs/calls.jsonl`. Fields are lenient on read so that older or
/// hand-edited lines still parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallLogRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub tokens: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost: f64,
    /// Milliseconds between dispatch and response or failure.
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_response: Option<String>,
}

/// Writers in other languages emit `null` for NaN and missing values.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl CallLogRecord {
    pub fn tokens_or_zero(&self) -> u64 {
        self.tokens.unwrap_or(0)
    }

    /// The model name, if present and non-empty.
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.is_empty())
    }
}

/// Derived view over the full log.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_calls: u64,
    pub total_tokens: u64,
    pub model_usage: HashMap<String, u64>,
    pub last_updated: String,
}

/// Per-group totals in a detailed report.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageBreakdown {
    pub calls: u64,
    pub tokens: u64,
    pub cost: f64,
    pub failures: u64,
}

/// Detailed analytics used by the CLI report and exports.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period: String,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub total_tokens: u64,
    /// Estimated, not billed, cost in USD.
    pub estimated_cost: f64,
    pub average_duration_ms: f64,
    pub by_provider: Vec<(String, UsageBreakdown)>,
    pub by_model: Vec<(String, UsageBreakdown)>,
    pub first_call: Option<String>,
    pub last_call: Option<String>,
}

impl AnalyticsReport {
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.successful_calls as f64 / self.total_calls as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_parse_of_sparse_line() {
        let r: CallLogRecord =
            serde_json::from_str(r#"{"timestamp":"2024-01-01T00:00:00Z","tokens":null}"#).unwrap();
        assert_eq!(r.tokens_or_zero(), 0);
        assert!(r.model_name().is_none());
        assert!(!r.success);
    }

    #[test]
    fn nulls_in_plain_fields_read_as_defaults() {
        let r: CallLogRecord = serde_json::from_str(
            r#"{"timestamp":null,"model":"gpt-4","tokens":7,"cost":null,"duration":null,"success":null,"prompt":null,"response":null}"#,
        )
        .unwrap();
        assert_eq!(r.tokens, Some(7));
        assert_eq!(r.cost, 0.0);
        assert_eq!(r.duration, 0);
        assert!(!r.success);
        assert!(r.prompt.is_empty() && r.response.is_empty() && r.timestamp.is_empty());
    }

    #[test]
    fn serializes_camel_case_without_empty_extras() {
        let r = CallLogRecord {
            timestamp: "2024-01-01T00:00:00.000Z".into(),
            model: Some("gpt-4".into()),
            tokens: Some(12),
            full_prompt: Some("hello".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["fullPrompt"], "hello");
        assert!(v.get("fullResponse").is_none());
        assert!(v.get("error").is_none());
    }
}
