//! `easyai init` - create the workspace

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::{env_template, Config, Settings};

use super::format;

const EXAMPLE_PROMPT: &str = "You are a careful code reviewer.\n\n\
Review the following {{language}} code. Point out bugs first, then style issues.\n\n\
{{input}}\n";

const EXAMPLE_META: &str = r#"{
  "description": "Review a snippet of code",
  "model": "gpt-4o-mini"
}
"#;

/// Create the `easyai/` workspace. Existing files are kept unless `force` is set;
/// the example prompt and the log are never overwritten.
pub fn run(config: &Config, force: bool) -> Result<()> {
    let ws = &config.workspace;
    for dir in [ws.prompts_dir().join("examples"), ws.config_dir(), ws.exports_dir()] {
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    if let Some(parent) = ws.log_file().parent() {
        std::fs::create_dir_all(parent)?;
    }

    if force || !ws.settings_file().exists() {
        Settings::default().save(ws)?;
        format::success(format!("wrote {}", ws.settings_file().display()));
    }
    if force || !ws.env_file().exists() {
        std::fs::write(ws.env_file(), env_template())?;
        format::success(format!("wrote {}", ws.env_file().display()));
    }

    let example = ws.prompts_dir().join("examples").join("code-review.md");
    if !example.exists() {
        std::fs::write(&example, EXAMPLE_PROMPT)?;
        std::fs::write(example.with_extension("json"), EXAMPLE_META)?;
        format::success(format!("wrote {}", example.display()));
    }

    println!();
    println!("Workspace ready at {}", ws.root().display().to_string().bold());
    println!("Add your API keys to {} or with `easyai config --set KEY=VALUE`.", ws.env_file().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Workspace;
    use crate::services::prompt_service;

    #[tokio::test]
    async fn creates_workspace_and_keeps_existing_env() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(Workspace::new(dir.path()));
        run(&config, false).unwrap();

        let ws = &config.workspace;
        assert!(ws.settings_file().exists());
        assert!(ws.exports_dir().is_dir());

        let prompt = prompt_service::read(&ws.prompts_dir(), "examples", "code-review").await.unwrap();
        assert_eq!(prompt.variables, vec!["language", "input"]);
        assert_eq!(prompt.model.as_deref(), Some("gpt-4o-mini"));

        std::fs::write(ws.env_file(), "OPENAI_API_KEY=sk-kept\n").unwrap();
        run(&config, false).unwrap();
        assert_eq!(std::fs::read_to_string(ws.env_file()).unwrap(), "OPENAI_API_KEY=sk-kept\n");

        run(&config, true).unwrap();
        assert!(std::fs::read_to_string(ws.env_file()).unwrap().contains("your_openai_api_key_here"));
    }
}
