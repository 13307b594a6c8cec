//! `easyai config` - view and change the env file and settings

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::config::{self, is_placeholder, Config, Settings, Workspace};

use super::format;

/// Settings keys accepted by `--get`/`--set`, in either spelling.
fn settings_key(key: &str) -> Option<&'static str> {
    match key {
        "defaultModel" | "default_model" | "DEFAULT_MODEL" => Some("defaultModel"),
        "port" | "PORT" => Some("port"),
        _ => None,
    }
}

fn get_value(ws: &Workspace, key: &str) -> Result<Option<String>> {
    if let Some(key) = settings_key(key) {
        let settings = Settings::load(ws);
        return Ok(Some(match key {
            "port" => settings.port.to_string(),
            _ => settings.default_model,
        }));
    }
    let vars = config::sanitize_env(&config::read_env_file(&ws.env_file())?);
    Ok(vars.get(key).filter(|v| !is_placeholder(v) || v.as_str() == config::MASK).cloned())
}

fn set_value(ws: &Workspace, assignment: &str) -> Result<String> {
    let Some((key, value)) = assignment.split_once('=') else {
        bail!("expected KEY=VALUE, got `{assignment}`");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty key in `{assignment}`");
    }

    if let Some(setting) = settings_key(key) {
        let mut settings = Settings::load(ws);
        match setting {
            "port" => settings.port = value.trim().parse().with_context(|| format!("invalid port `{value}`"))?,
            _ => settings.default_model = value.trim().to_string(),
        }
        settings.save(ws)?;
        return Ok(setting.to_string());
    }

    if value.trim().is_empty() {
        bail!("refusing to store an empty value for {key}");
    }
    config::merge_env_file(&ws.env_file(), &BTreeMap::from([(key.to_string(), value.to_string())]))?;
    Ok(key.to_string())
}

pub fn run(config: &Config, get: Option<String>, set: Option<String>) -> Result<()> {
    let ws = &config.workspace;

    if let Some(assignment) = set {
        let key = set_value(ws, &assignment)?;
        format::success(format!("{key} saved"));
        return Ok(());
    }

    if let Some(key) = get {
        match get_value(ws, &key)? {
            Some(value) => println!("{value}"),
            None => println!("{}", "(not set)".dimmed()),
        }
        return Ok(());
    }

    let vars = config::sanitize_env(&config::read_env_file(&ws.env_file())?);
    println!("{} {}", "Env file:".bold(), ws.env_file().display());
    if vars.is_empty() {
        println!("  (empty, run `easyai init`)");
    } else {
        let rows: Vec<Vec<String>> = vars.into_iter().map(|(k, v)| vec![k, v]).collect();
        format::print_table(&["KEY", "VALUE"], &rows);
    }

    let settings = Settings::load(ws);
    println!();
    println!("{} {}", "Settings:".bold(), ws.settings_file().display());
    println!("  defaultModel  {}", settings.default_model);
    println!("  port          {}", settings.port);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        std::fs::create_dir_all(ws.config_dir()).unwrap();
        std::fs::write(ws.env_file(), config::env_template()).unwrap();

        assert_eq!(get_value(&ws, "OPENAI_API_KEY").unwrap(), None);
        set_value(&ws, "OPENAI_API_KEY=sk-secret").unwrap();
        assert_eq!(get_value(&ws, "OPENAI_API_KEY").unwrap().as_deref(), Some(config::MASK));

        set_value(&ws, "OLLAMA_BASE_URL=http://gpu-box:11434").unwrap();
        assert_eq!(
            get_value(&ws, "OLLAMA_BASE_URL").unwrap().as_deref(),
            Some("http://gpu-box:11434")
        );

        set_value(&ws, "defaultModel=claude-3-haiku").unwrap();
        assert_eq!(get_value(&ws, "default_model").unwrap().as_deref(), Some("claude-3-haiku"));
        assert!(set_value(&ws, "port=abc").is_err());
        assert!(set_value(&ws, "GEMINI_API_KEY=").is_err());
        assert!(set_value(&ws, "novalue").is_err());
    }
}
