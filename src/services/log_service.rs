use std::path::Path;

use chrono::{SecondsFormat, Utc};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::models::call_log::CallLogRecord;
use crate::services::provider_service::Completion;

const PROMPT_PREVIEW_CHARS: usize = 100;
const RESPONSE_PREVIEW_CHARS: usize = 200;

/// Parameters for a new log entry (built by whoever issued the provider call).
pub struct NewCallLog<'a> {
    pub model: &'a str,
    pub provider: Option<&'a str>,
    pub prompt: &'a str,
    pub outcome: Result<&'a Completion, String>,
    /// Used for failed calls; successful ones carry their own duration.
    pub duration_ms: u64,
    pub keep_full_text: bool,
}

/// Current time as an ISO-8601 string that sorts lexically.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Truncate on a char boundary, appending an ellipsis when shortened.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

impl NewCallLog<'_> {
    pub fn into_record(self) -> CallLogRecord {
        let (success, tokens, cost, duration, response, error) = match self.outcome {
            Ok(c) => (true, Some(c.tokens), c.cost, c.duration_ms, c.content.clone(), None),
            Err(e) => (false, Some(0), 0.0, self.duration_ms, String::new(), Some(e)),
        };

        CallLogRecord {
            timestamp: now_timestamp(),
            model: Some(self.model.to_string()),
            provider: self.provider.map(str::to_string),
            tokens,
            cost,
            duration,
            success,
            prompt: truncate_chars(self.prompt, PROMPT_PREVIEW_CHARS),
            response: truncate_chars(&response, RESPONSE_PREVIEW_CHARS),
            full_prompt: self.keep_full_text.then(|| self.prompt.to_string()),
            full_response: (self.keep_full_text && success).then_some(response),
            error,
        }
    }
}

/// Append one record as a JSON line. Fails only on filesystem errors.
pub async fn append(path: &Path, record: &CallLogRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Append without failing the caller; a lost log line is only a warning.
pub async fn append_best_effort(path: &Path, record: &CallLogRecord) {
    if let Err(e) = append(path, record).await {
        tracing::warn!("Failed to append call log to {}: {}", path.display(), e);
    }
}

/// All records in file order (oldest first). A missing file is an empty log;
/// lines that are not valid records are skipped, including lines that are not
/// valid UTF-8.
pub async fn read_all(path: &Path) -> std::io::Result<Vec<CallLogRecord>> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    Ok(parse_lines(&raw))
}

pub fn parse_lines(raw: &[u8]) -> Vec<CallLogRecord> {
    raw.split(|b| *b == b'\n')
        .map(<[u8]>::trim_ascii)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_slice(line).ok())
        .collect()
}

/// Query parameters for listing logs.
#[derive(Debug, Default)]
pub struct ListLogsParams {
    pub limit: usize,
    /// Case-insensitive substring over model, provider, prompt and response.
    pub filter: Option<String>,
    pub model: Option<String>,
    pub success: Option<bool>,
}

/// Most recent first, filtered, capped at `limit`.
pub fn recent(records: Vec<CallLogRecord>, params: &ListLogsParams) -> Vec<CallLogRecord> {
    let needle = params.filter.as_ref().map(|f| f.to_lowercase());
    records
        .into_iter()
        .rev()
        .filter(|r| match &params.model {
            Some(m) => r.model_name() == Some(m.as_str()),
            None => true,
        })
        .filter(|r| params.success.is_none_or(|s| r.success == s))
        .filter(|r| match &needle {
            Some(n) => [
                r.model.as_deref().unwrap_or_default(),
                r.provider.as_deref().unwrap_or_default(),
                r.prompt.as_str(),
                r.response.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(n.as_str())),
            None => true,
        })
        .take(params.limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str, tokens: u64) -> CallLogRecord {
        CallLogRecord {
            timestamp: now_timestamp(),
            model: Some(model.into()),
            tokens: Some(tokens),
            success: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = read_all(&dir.path().join("logs/calls.jsonl")).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn append_then_read_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("calls.jsonl");
        append(&path, &record("gpt-4", 10)).await.unwrap();
        append(&path, &record("claude-3-haiku", 20)).await.unwrap();

        let records = read_all(&path).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].model.as_deref(), Some("gpt-4"));
        assert_eq!(records[1].tokens, Some(20));
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.jsonl");
        let good = serde_json::to_string(&record("gpt-4", 5)).unwrap();
        let raw = format!("{good}\n{{\"timestamp\":\"2024-01-0\n\nnot json\n{good}\n");
        std::fs::write(&path, raw).unwrap();

        let records = read_all(&path).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_abort_the_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.jsonl");
        let good = serde_json::to_string(&record("gpt-4", 5)).unwrap();
        let mut raw = Vec::new();
        raw.extend_from_slice(good.as_bytes());
        raw.extend_from_slice(b"\n{\"prompt\":\"caf\xC3\n");
        raw.extend_from_slice(good.as_bytes());
        raw.push(b'\n');
        std::fs::write(&path, raw).unwrap();

        let records = read_all(&path).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.tokens == Some(5)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn failed_call_record_has_zero_usage() {
        let rec = NewCallLog {
            model: "claude-3-haiku",
            provider: Some("anthropic"),
            prompt: "hi",
            outcome: Err("no key".into()),
            duration_ms: 3,
            keep_full_text: true,
        }
        .into_record();
        assert!(!rec.success);
        assert_eq!(rec.tokens, Some(0));
        assert_eq!(rec.cost, 0.0);
        assert_eq!(rec.error.as_deref(), Some("no key"));
        assert_eq!(rec.full_prompt.as_deref(), Some("hi"));
        assert!(rec.full_response.is_none());
    }

    #[test]
    fn recent_is_newest_first_and_filtered() {
        let mut failed = record("gpt-4", 0);
        failed.success = false;
        let records = vec![record("gpt-4", 1), record("llama3", 2), failed, record("gpt-4", 4)];

        let all = recent(records.clone(), &ListLogsParams { limit: 100, ..Default::default() });
        assert_eq!(all[0].tokens, Some(4));

        let capped = recent(records.clone(), &ListLogsParams { limit: 2, ..Default::default() });
        assert_eq!(capped.len(), 2);

        let gpt_ok = recent(
            records.clone(),
            &ListLogsParams {
                limit: 100,
                model: Some("gpt-4".into()),
                success: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(gpt_ok.len(), 2);

        let llama = recent(
            records,
            &ListLogsParams {
                limit: 100,
                filter: Some("LLAMA".into()),
                ..Default::default()
            },
        );
        assert_eq!(llama.len(), 1);
    }
}
