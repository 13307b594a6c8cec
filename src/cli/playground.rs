//! `easyai playground`

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::config::{Config, Settings};
use crate::error::ProviderError;
use crate::services::playground_service;
use crate::services::pricing::format_cost;
use crate::services::provider_service::Completion;
use crate::state::AppState;

use super::format;

pub(super) fn print_completion(model: &str, c: &Completion) {
    println!();
    println!("{}", c.content.trim_end());
    println!();
    println!(
        "{}",
        format!(
            "{} via {} · {} tokens ({} in / {} out) · est. {} · {}",
            model,
            c.provider.display_name(),
            format::format_number(c.tokens),
            c.prompt_tokens,
            c.completion_tokens,
            format_cost(c.cost),
            format::format_duration(c.duration_ms)
        )
        .dimmed()
    );
}

/// Attach a CLI hint to key errors; the message itself points at Settings.
pub(super) fn with_hint(e: ProviderError) -> anyhow::Error {
    if e.is_auth() {
        anyhow::anyhow!("{e}\nFrom the terminal: easyai config --set KEY=VALUE")
    } else {
        e.into()
    }
}

pub(super) fn summary_rows(results: &[(String, Result<Completion, ProviderError>)]) -> Vec<Vec<String>> {
    results
        .iter()
        .map(|(model, result)| match result {
            Ok(c) => vec![
                model.clone(),
                c.provider.as_str().to_string(),
                format::format_number(c.tokens),
                format_cost(c.cost),
                format::format_duration(c.duration_ms),
                "ok".to_string(),
            ],
            Err(e) => vec![
                model.clone(),
                String::new(),
                "0".to_string(),
                format_cost(0.0),
                String::new(),
                format::preview(&e.to_string(), 50),
            ],
        })
        .collect()
}

pub async fn run(
    config: &Config,
    prompt: Option<String>,
    models: Vec<String>,
    file: Option<PathBuf>,
    compare: bool,
    vars: Vec<(String, String)>,
) -> Result<()> {
    let text = match (prompt, file) {
        (Some(p), _) => p,
        (None, Some(path)) => {
            std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, None) => inquire::Text::new("Prompt:").prompt()?,
    };
    if text.trim().is_empty() {
        bail!("prompt is empty");
    }

    let mut models: Vec<String> = models
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if models.is_empty() {
        models.push(Settings::load(&config.workspace).default_model);
    }

    let vars: HashMap<String, String> = vars.into_iter().collect();
    let state = AppState::new(config.clone())?;

    if models.len() == 1 && !compare {
        let completion = playground_service::run(&state, &models[0], None, &text, &vars)
            .await
            .map_err(with_hint)?;
        print_completion(&models[0], &completion);
        return Ok(());
    }

    println!("{} {} models...", "Testing".cyan(), models.len());
    let results = playground_service::compare(&state, &models, &text, &vars).await;

    for (model, result) in &results {
        println!("\n{}", format!("── {model} ──").bold());
        match result {
            Ok(c) => print_completion(model, c),
            Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
        }
    }

    if compare {
        println!();
        format::print_table(&["MODEL", "PROVIDER", "TOKENS", "COST (est.)", "TIME", "STATUS"], &summary_rows(&results));
    }

    if results.iter().all(|(_, r)| r.is_err()) {
        bail!("all {} model calls failed", results.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::provider::Provider;

    #[test]
    fn summary_marks_failures() {
        let ok = Completion {
            content: "hi".into(),
            provider: Provider::OpenAI,
            prompt_tokens: 1000,
            completion_tokens: 234,
            tokens: 1234,
            cost: 0.0012,
            duration_ms: 1500,
        };
        let results = vec![
            ("gpt-4o".to_string(), Ok(ok)),
            ("claude-3-haiku".to_string(), Err(ProviderError::Auth(Provider::Anthropic))),
        ];
        let rows = summary_rows(&results);
        assert_eq!(rows[0][2], "1,234");
        assert_eq!(rows[0][4], "1.5s");
        assert_eq!(rows[0][5], "ok");
        assert!(rows[1][5].contains("API key"));
    }

    #[test]
    fn key_errors_get_a_cli_hint() {
        let hinted = with_hint(ProviderError::Auth(Provider::OpenAI)).to_string();
        assert!(hinted.contains("OPENAI_API_KEY") && hinted.contains("easyai config --set"));
        let plain = with_hint(ProviderError::NotFound("gone".into())).to_string();
        assert_eq!(plain, "gone");
    }
}
