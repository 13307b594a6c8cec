//! `easyai logs`, `easyai analytics` and `easyai export`

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::models::call_log::{AnalyticsReport, CallLogRecord};
use crate::models::provider::Provider;
use crate::services::analytics_service::{self, Period, ReportFilter};
use crate::services::export_service::{self, ExportFormat, ExportKind};
use crate::services::pricing::format_cost;
use crate::services::{log_service, prompt_service};

use super::format;

fn log_rows(records: &[CallLogRecord]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|r| {
            vec![
                r.timestamp.get(..19).unwrap_or(&r.timestamp).replace('T', " "),
                r.model_name().unwrap_or("-").to_string(),
                format::format_number(r.tokens_or_zero()),
                format_cost(r.cost),
                format::format_duration(r.duration),
                if r.success { "ok" } else { "failed" }.to_string(),
                format::preview(&r.prompt, 40),
            ]
        })
        .collect()
}

pub async fn show_logs(config: &Config, number: usize, filter: Option<String>) -> Result<()> {
    let records = log_service::read_all(&config.workspace.log_file()).await?;
    let params = log_service::ListLogsParams {
        limit: number.max(1),
        filter,
        ..Default::default()
    };
    let recent = log_service::recent(records, &params);
    if recent.is_empty() {
        println!("No calls logged yet. Try `easyai playground --prompt \"Hello\"`.");
        return Ok(());
    }
    format::print_table(
        &["TIME (UTC)", "MODEL", "TOKENS", "COST (est.)", "DURATION", "STATUS", "PROMPT"],
        &log_rows(&recent),
    );
    Ok(())
}

fn breakdown_rows(rows: &[(String, crate::models::call_log::UsageBreakdown)]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|(key, b)| {
            vec![
                key.clone(),
                format::format_number(b.calls),
                format::format_number(b.tokens),
                format_cost(b.cost),
                b.failures.to_string(),
            ]
        })
        .collect()
}

fn print_report(report: &AnalyticsReport, detailed: bool) {
    println!("{} ({})", "Usage report".bold(), report.period);
    println!("  Calls:          {}", format::format_number(report.total_calls));
    println!("  Success rate:   {:.1}%", report.success_rate());
    println!("  Tokens:         {}", format::format_number(report.total_tokens));
    println!("  Cost (est.):    {}", format_cost(report.estimated_cost));
    println!("  Avg duration:   {}", format::format_duration(report.average_duration_ms.round() as u64));
    if let (Some(first), Some(last)) = (&report.first_call, &report.last_call) {
        println!("  Range:          {first} .. {last}");
    }

    println!();
    format::print_table(
        &["PROVIDER", "CALLS", "TOKENS", "COST (est.)", "FAILURES"],
        &breakdown_rows(&report.by_provider),
    );
    if detailed {
        println!();
        format::print_table(
            &["MODEL", "CALLS", "TOKENS", "COST (est.)", "FAILURES"],
            &breakdown_rows(&report.by_model),
        );
    }
}

fn format_for_path(path: &Path) -> ExportFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
        _ => ExportFormat::Json,
    }
}

pub async fn show_analytics(
    config: &Config,
    period: Period,
    provider: Option<Provider>,
    model: Option<String>,
    export: Option<PathBuf>,
    detailed: bool,
) -> Result<()> {
    let records = log_service::read_all(&config.workspace.log_file()).await?;
    let filter = ReportFilter { period, provider, model };
    let report = analytics_service::report(&records, &filter);

    if report.total_calls == 0 {
        println!("No calls in this period.");
    } else {
        print_report(&report, detailed);
    }

    if let Some(path) = export {
        export_service::export_analytics(&report, format_for_path(&path), &path)?;
        format::success(format!("report written to {}", path.display()));
    }
    Ok(())
}

pub async fn export(config: &Config, kind: ExportKind, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    let ws = &config.workspace;
    let path = output.unwrap_or_else(|| export_service::default_path(&ws.exports_dir(), kind, format));

    let count = match kind {
        ExportKind::Logs => {
            let records = log_service::read_all(&ws.log_file()).await?;
            export_service::export_logs(&records, format, &path)?;
            records.len()
        }
        ExportKind::Analytics => {
            let records = log_service::read_all(&ws.log_file()).await?;
            let report = analytics_service::report(&records, &ReportFilter::default());
            export_service::export_analytics(&report, format, &path)?;
            records.len()
        }
        ExportKind::Prompts => {
            let prompts = prompt_service::list(&ws.prompts_dir()).await?;
            export_service::export_prompts(&prompts, format, &path)?;
            prompts.len()
        }
    };
    tracing::debug!("Exported {} {} records", count, kind.as_str());
    format::success(format!("exported {count} {} to {}", kind.as_str(), path.display()));
    Ok(())
}
