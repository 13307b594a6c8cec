//! `easyai models`

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::models::model::ModelInfo;
use crate::models::provider::Provider;
use crate::services::{model_service, playground_service};
use crate::state::AppState;

use super::{format, playground};

const TEST_PROMPT: &str = "Reply with the single word: ready";
const MAX_TESTED: usize = 10;

fn model_rows(models: &[ModelInfo], detailed: bool) -> Vec<Vec<String>> {
    models
        .iter()
        .map(|m| {
            let mut row = vec![m.provider.as_str().to_string(), m.id.clone()];
            if detailed {
                row.push(if m.name == m.id { String::new() } else { m.name.clone() });
                row.push(format::preview(&m.description, 50));
                row.push(
                    m.extras
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(" "),
                );
            }
            row
        })
        .collect()
}

pub async fn run(
    config: &Config,
    provider: Option<Provider>,
    search: Option<String>,
    detailed: bool,
    test: bool,
) -> Result<()> {
    let state = AppState::new(config.clone())?;
    let keys = config.api_keys();

    let mut models = match provider {
        Some(p) => {
            if !keys.is_configured(p) {
                format::warn(format!("{} has no API key configured; showing known models", p.display_name()));
            }
            model_service::list_provider(&state.http_client, config, &keys, p).await
        }
        None => model_service::list_models(&state.http_client, config, &keys).await,
    };
    if let Some(q) = &search {
        models = model_service::search(models, q);
    }

    if models.is_empty() {
        println!("No models found.");
        return Ok(());
    }

    let headers: &[&str] = if detailed {
        &["PROVIDER", "MODEL", "NAME", "DESCRIPTION", "DETAILS"]
    } else {
        &["PROVIDER", "MODEL"]
    };
    format::print_table(headers, &model_rows(&models, detailed));
    println!("\n{} model(s)", models.len());

    if test {
        let ids: Vec<String> = models.iter().take(MAX_TESTED).map(|m| m.id.clone()).collect();
        if models.len() > MAX_TESTED {
            format::warn(format!("testing the first {MAX_TESTED} models only"));
        }
        println!("\n{} {} models...", "Testing".cyan(), ids.len());
        let results = playground_service::compare(&state, &ids, TEST_PROMPT, &Default::default()).await;
        format::print_table(
            &["MODEL", "PROVIDER", "TOKENS", "COST (est.)", "TIME", "STATUS"],
            &playground::summary_rows(&results),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detailed_rows_include_extras() {
        let models = vec![
            ModelInfo::new("llama3", Provider::Ollama, "Local Llama 3").with_extra("size", json!(4661224676u64)),
        ];
        let plain = model_rows(&models, false);
        assert_eq!(plain[0], vec!["ollama", "llama3"]);

        let detailed = model_rows(&models, true);
        assert_eq!(detailed[0].len(), 5);
        assert_eq!(detailed[0][2], "");
        assert_eq!(detailed[0][4], "size=4661224676");
    }
}
