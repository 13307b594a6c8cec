use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use chrono::Utc;

use crate::models::call_log::{AnalyticsReport, CallLogRecord};
use crate::models::prompt::PromptTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Logs,
    Analytics,
    Prompts,
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logs" => Ok(ExportKind::Logs),
            "analytics" => Ok(ExportKind::Analytics),
            "prompts" => Ok(ExportKind::Prompts),
            _ => Err(format!("unknown export type `{s}` (logs, analytics, prompts)")),
        }
    }
}

impl ExportKind {

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Logs => "logs",
            ExportKind::Analytics => "analytics",
            ExportKind::Prompts => "prompts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(format!("unknown format `{s}` (json, csv)")),
        }
    }
}

impl ExportFormat {

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// `exports/<kind>-<YYYYMMDD-HHMMSS>.<ext>`
pub fn default_path(exports_dir: &Path, kind: ExportKind, format: ExportFormat) -> PathBuf {
    exports_dir.join(format!(
        "{}-{}.{}",
        kind.as_str(),
        Utc::now().format("%Y%m%d-%H%M%S"),
        format.extension()
    ))
}

fn write_bytes(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

pub fn export_logs(records: &[CallLogRecord], format: ExportFormat, path: &Path) -> anyhow::Result<()> {
    let bytes = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(records)?,
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(Vec::new());
            wtr.write_record([
                "timestamp", "model", "provider", "tokens", "cost", "duration", "success", "prompt", "response", "error",
            ])?;
            for r in records {
                wtr.write_record([
                    r.timestamp.clone(),
                    r.model.clone().unwrap_or_default(),
                    r.provider.clone().unwrap_or_default(),
                    r.tokens_or_zero().to_string(),
                    format!("{:.6}", r.cost),
                    r.duration.to_string(),
                    r.success.to_string(),
                    r.prompt.clone(),
                    r.response.clone(),
                    r.error.clone().unwrap_or_default(),
                ])?;
            }
            wtr.into_inner().map_err(|e| anyhow::anyhow!("csv flush failed: {e}"))?
        }
    };
    write_bytes(path, &bytes)
}

pub fn export_analytics(report: &AnalyticsReport, format: ExportFormat, path: &Path) -> anyhow::Result<()> {
    let bytes = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(report)?,
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(Vec::new());
            wtr.write_record(["group", "key", "calls", "tokens", "estimated_cost", "failures"])?;
            let groups = report
                .by_provider
                .iter()
                .map(|row| ("provider", row))
                .chain(report.by_model.iter().map(|row| ("model", row)));
            for (group, (key, b)) in groups {
                wtr.write_record([
                    group.to_string(),
                    key.clone(),
                    b.calls.to_string(),
                    b.tokens.to_string(),
                    format!("{:.6}", b.cost),
                    b.failures.to_string(),
                ])?;
            }
            wtr.into_inner().map_err(|e| anyhow::anyhow!("csv flush failed: {e}"))?
        }
    };
    write_bytes(path, &bytes)
}

pub fn export_prompts(prompts: &[PromptTemplate], format: ExportFormat, path: &Path) -> anyhow::Result<()> {
    let bytes = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(prompts)?,
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(Vec::new());
            wtr.write_record(["category", "name", "model", "description", "variables", "content"])?;
            for p in prompts {
                wtr.write_record([
                    p.category.clone(),
                    p.name.clone(),
                    p.model.clone().unwrap_or_default(),
                    p.description.clone().unwrap_or_default(),
                    p.variables.join(";"),
                    p.content.clone(),
                ])?;
            }
            wtr.into_inner().map_err(|e| anyhow::anyhow!("csv flush failed: {e}"))?
        }
    };
    write_bytes(path, &bytes)
}
