use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::models::call_log::{Analytics, AnalyticsReport, CallLogRecord, UsageBreakdown};
use crate::models::provider::Provider;

/// Aggregate the full log. An empty log reports the aggregation time as
/// `lastUpdated`.
pub fn aggregate(records: &[CallLogRecord]) -> Analytics {
    aggregate_at(records, Utc::now())
}

pub fn aggregate_at(records: &[CallLogRecord], now: DateTime<Utc>) -> Analytics {
    let mut total_tokens = 0u64;
    let mut model_usage: HashMap<String, u64> = HashMap::new();
    let mut last: Option<&str> = None;

    for r in records {
        total_tokens += r.tokens_or_zero();
        // Records without a model still count as calls but not per-model.
        if let Some(model) = r.model_name() {
            *model_usage.entry(model.to_string()).or_default() += 1;
        }
        // ISO-8601 timestamps compare correctly as strings.
        if !r.timestamp.is_empty() && last.is_none_or(|l| r.timestamp.as_str() > l) {
            last = Some(r.timestamp.as_str());
        }
    }

    Analytics {
        total_calls: records.len() as u64,
        total_tokens,
        model_usage,
        last_updated: last
            .map(str::to_string)
            .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    }
}

/// Time window for detailed reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Week,
    Month,
    All,
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" | "day" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "all" => Ok(Period::All),
            _ => Err(format!("unknown period `{s}` (today, week, month, all)")),
        }
    }
}

impl Period {

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Week => "week",
            Period::Month => "month",
            Period::All => "all",
        }
    }

    /// Lower bound as a sortable timestamp, if any.
    fn cutoff(&self, now: DateTime<Utc>) -> Option<String> {
        let start = match self {
            Period::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|t| t.and_utc())?,
            Period::Week => now - Duration::days(7),
            Period::Month => now - Duration::days(30),
            Period::All => return None,
        };
        Some(start.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Filters for a detailed report.
#[derive(Debug, Clone)]
pub struct ReportFilter {
    pub period: Period,
    pub provider: Option<Provider>,
    pub model: Option<String>,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            period: Period::All,
            provider: None,
            model: None,
        }
    }
}

/// Provider recorded on the line, falling back to sniffing the model for
/// records written before the provider was logged.
fn record_provider(r: &CallLogRecord) -> Option<Provider> {
    r.provider
        .as_deref()
        .and_then(|p| p.parse::<Provider>().ok())
        .or_else(|| r.model_name().map(Provider::sniff))
}

pub fn report(records: &[CallLogRecord], filter: &ReportFilter) -> AnalyticsReport {
    report_at(records, filter, Utc::now())
}

pub fn report_at(records: &[CallLogRecord], filter: &ReportFilter, now: DateTime<Utc>) -> AnalyticsReport {
    let cutoff = filter.period.cutoff(now);
    let model_needle = filter.model.as_ref().map(|m| m.to_lowercase());

    let selected: Vec<&CallLogRecord> = records
        .iter()
        .filter(|r| cutoff.as_ref().is_none_or(|c| r.timestamp.as_str() >= c.as_str()))
        .filter(|r| filter.provider.is_none() || record_provider(r) == filter.provider)
        .filter(|r| match &model_needle {
            Some(n) => r.model_name().is_some_and(|m| m.to_lowercase().contains(n.as_str())),
            None => true,
        })
        .collect();

    let mut by_provider: BTreeMap<String, UsageBreakdown> = BTreeMap::new();
    let mut by_model: BTreeMap<String, UsageBreakdown> = BTreeMap::new();
    let mut successful_calls = 0;
    let mut total_tokens = 0;
    let mut estimated_cost = 0.0;
    let mut total_duration = 0u64;

    for r in &selected {
        let tokens = r.tokens_or_zero();
        total_tokens += tokens;
        estimated_cost += r.cost;
        total_duration += r.duration;
        if r.success {
            successful_calls += 1;
        }

        let provider = record_provider(r).map(|p| p.as_str()).unwrap_or("unknown");
        let model = r.model_name().unwrap_or("unknown");
        for entry in [
            by_provider.entry(provider.to_string()).or_default(),
            by_model.entry(model.to_string()).or_default(),
        ] {
            entry.calls += 1;
            entry.tokens += tokens;
            entry.cost += r.cost;
            if !r.success {
                entry.failures += 1;
            }
        }
    }

    let sorted = |map: BTreeMap<String, UsageBreakdown>| {
        let mut v: Vec<_> = map.into_iter().collect();
        v.sort_by(|a, b| b.1.calls.cmp(&a.1.calls).then_with(|| a.0.cmp(&b.0)));
        v
    };

    let total_calls = selected.len() as u64;
    AnalyticsReport {
        period: filter.period.as_str().to_string(),
        total_calls,
        successful_calls,
        total_tokens,
        estimated_cost,
        average_duration_ms: if total_calls == 0 {
            0.0
        } else {
            total_duration as f64 / total_calls as f64
        },
        by_provider: sorted(by_provider),
        by_model: sorted(by_model),
        first_call: selected.iter().map(|r| r.timestamp.clone()).filter(|t| !t.is_empty()).min(),
        last_call: selected.iter().map(|r| r.timestamp.clone()).max().filter(|t| !t.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(ts: &str, model: Option<&str>, tokens: Option<u64>) -> CallLogRecord {
        CallLogRecord {
            timestamp: ts.into(),
            model: model.map(str::to_string),
            tokens,
            success: true,
            ..Default::default()
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_log_reports_now() {
        let a = aggregate_at(&[], fixed_now());
        assert_eq!(a.total_calls, 0);
        assert_eq!(a.total_tokens, 0);
        assert!(a.model_usage.is_empty());
        assert_eq!(a.last_updated, "2024-06-15T12:00:00.000Z");
    }

    #[test]
    fn sums_tokens_treating_missing_as_zero() {
        let records = vec![
            rec("2024-01-01T00:00:00Z", Some("gpt-4"), Some(10)),
            rec("2024-01-02T00:00:00Z", Some("gpt-4"), None),
            rec("2024-01-03T00:00:00Z", Some("llama3"), Some(5)),
        ];
        let a = aggregate_at(&records, fixed_now());
        assert_eq!(a.total_tokens, 15);
        assert_eq!(a.total_calls, 3);
        assert_eq!(a.model_usage["gpt-4"], 2);
        assert_eq!(a.model_usage["llama3"], 1);
        assert_eq!(a.model_usage.values().sum::<u64>(), a.total_calls);
    }

    #[test]
    fn records_without_model_count_as_calls_only() {
        let records = vec![
            rec("2024-01-01T00:00:00Z", Some("gpt-4"), Some(1)),
            rec("2024-01-01T00:00:01Z", None, Some(1)),
            rec("2024-01-01T00:00:02Z", Some(""), Some(1)),
        ];
        let a = aggregate_at(&records, fixed_now());
        assert_eq!(a.total_calls, 3);
        assert_eq!(a.model_usage.values().sum::<u64>(), 1);
    }

    #[test]
    fn last_updated_is_lexical_max() {
        let records = vec![
            rec("2024-03-01T00:00:00.000Z", Some("a"), None),
            rec("2024-12-01T00:00:00.000Z", Some("a"), None),
            rec("2024-05-01T00:00:00.000Z", Some("a"), None),
        ];
        assert_eq!(aggregate_at(&records, fixed_now()).last_updated, "2024-12-01T00:00:00.000Z");
    }

    #[test]
    fn null_fields_do_not_drop_calls() {
        let raw = concat!(
            r#"{"timestamp":"2024-01-01T00:00:00Z","model":"gpt-4","tokens":10,"cost":null}"#,
            "\n",
            r#"{"timestamp":"2024-01-01T00:00:01Z","model":"gpt-4","tokens":7,"prompt":null}"#,
            "\n",
            r#"{"timestamp":"2024-01-01T00:00:02Z","model":"llama3","tokens":3,"cost":0.5}"#,
            "\n",
        );
        let records = crate::services::log_service::parse_lines(raw.as_bytes());
        let a = aggregate_at(&records, fixed_now());
        assert_eq!(a.total_calls, 3);
        assert_eq!(a.total_tokens, 20);
    }

    #[test]
    fn period_parses_case_insensitively() {
        assert_eq!("Week".parse::<Period>(), Ok(Period::Week));
        assert_eq!("day".parse::<Period>(), Ok(Period::Today));
        assert!("year".parse::<Period>().is_err());
    }

    #[test]
    fn duplicates_are_counted() {
        let r = rec("2024-01-01T00:00:00Z", Some("gpt-4"), Some(7));
        let a = aggregate_at(&[r.clone(), r], fixed_now());
        assert_eq!(a.total_calls, 2);
        assert_eq!(a.total_tokens, 14);
    }

    #[test]
    fn report_filters_by_period_and_provider() {
        let mut failed = rec("2024-06-15T08:00:00.000Z", Some("claude-3-haiku"), Some(0));
        failed.success = false;
        failed.provider = Some("anthropic".into());
        let mut priced = rec("2024-06-14T08:00:00.000Z", Some("gpt-4o"), Some(100));
        priced.cost = 0.5;
        priced.duration = 200;
        let records = vec![
            rec("2024-01-01T00:00:00.000Z", Some("gpt-4o"), Some(1000)),
            priced,
            failed,
        ];

        let week = report_at(
            &records,
            &ReportFilter {
                period: Period::Week,
                ..Default::default()
            },
            fixed_now(),
        );
        assert_eq!(week.total_calls, 2);
        assert_eq!(week.total_tokens, 100);
        assert_eq!(week.successful_calls, 1);
        assert!((week.success_rate() - 50.0).abs() < 1e-9);
        assert!((week.average_duration_ms - 100.0).abs() < 1e-9);
        assert_eq!(week.by_provider.len(), 2);

        let today = report_at(
            &records,
            &ReportFilter {
                period: Period::Today,
                ..Default::default()
            },
            fixed_now(),
        );
        assert_eq!(today.total_calls, 1);

        let openai = report_at(
            &records,
            &ReportFilter {
                provider: Some(Provider::OpenAI),
                ..Default::default()
            },
            fixed_now(),
        );
        assert_eq!(openai.total_calls, 2);
        assert_eq!(openai.by_model[0].0, "gpt-4o");
        assert!((openai.estimated_cost - 0.5).abs() < 1e-9);
        assert_eq!(openai.first_call.as_deref(), Some("2024-01-01T00:00:00.000Z"));
    }
}
