use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::provider::Provider;

/// Mask shown in place of any configured secret.
pub const MASK: &str = "***configured***";

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: Workspace,
    pub listen_addr: String,
    /// Comma-separated list of allowed CORS origins, or "*" for any.
    pub cors_origin: String,
    /// Whether call log records also keep the untruncated prompt and response.
    pub log_full_text: bool,
    /// Maximum number of records returned by the recent-logs view.
    pub log_cap: usize,
    /// Per-provider base URL overrides (`OPENAI_BASE_URL`, `OLLAMA_BASE_URL`, ...).
    pub base_urls: BTreeMap<Provider, String>,
    /// Whether API keys missing from the env file are read from the process environment.
    pub process_env_keys: bool,
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

impl Config {
    /// Build the config for a project directory. The project env file is loaded
    /// into the process environment first; variables already set win.
    pub fn from_env(project_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let project_dir = match project_dir.or_else(|| env::var("EASYAI_PROJECT_DIR").ok().map(PathBuf::from)) {
            Some(dir) => dir,
            None => env::current_dir()?,
        };
        let workspace = Workspace::new(project_dir);

        if workspace.env_file().exists() {
            dotenvy::from_path(workspace.env_file()).ok();
        }

        let base_urls = Provider::ALL
            .iter()
            .filter_map(|p| {
                env::var(p.base_url_env())
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (*p, v.trim_end_matches('/').to_string()))
            })
            .collect();

        Ok(Self {
            listen_addr: env::var("EASYAI_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:3001".into()),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".into()),
            log_full_text: parse_bool_env("EASYAI_LOG_FULL_TEXT", false),
            log_cap: env::var("EASYAI_LOG_CAP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            base_urls,
            process_env_keys: true,
            ..Self::new(workspace)
        })
    }

    /// Defaults for a workspace, ignoring the environment.
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            listen_addr: "127.0.0.1:3001".into(),
            cors_origin: "*".into(),
            log_full_text: false,
            log_cap: 100,
            base_urls: BTreeMap::new(),
            process_env_keys: false,
        }
    }

    pub fn base_url(&self, provider: Provider) -> String {
        self.base_urls
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| provider.default_base_url().to_string())
    }

    /// Current API keys: a real value in the env file on disk first, then the
    /// process environment. Template placeholders in the file fall through.
    pub fn api_keys(&self) -> ApiKeys {
        let file = read_env_file(&self.workspace.env_file()).unwrap_or_default();
        let mut keys = ApiKeys::default();
        for provider in Provider::ALL {
            let Some(var) = provider.api_key_env() else {
                continue;
            };
            let value = file
                .get(var)
                .filter(|v| !is_placeholder(v))
                .cloned()
                .or_else(|| self.process_env_keys.then(|| env::var(var).ok()).flatten());
            keys.set(provider, value);
        }
        keys
    }
}

/// Filesystem layout under `<project>/easyai/`.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: project_dir.into().join("easyai"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.root.join("prompts")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("logs").join("calls.jsonl")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn env_file(&self) -> PathBuf {
        self.config_dir().join("easyai.env")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir().join("settings.json")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }
}

/// Provider API keys with placeholders already filtered out.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: BTreeMap<Provider, String>,
}

impl ApiKeys {
    pub fn set(&mut self, provider: Provider, value: Option<String>) {
        match value.filter(|v| !is_placeholder(v)) {
            Some(v) => {
                self.keys.insert(provider, v.trim().to_string());
            }
            None => {
                self.keys.remove(&provider);
            }
        }
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    /// Ollama runs locally and needs no key.
    pub fn is_configured(&self, provider: Provider) -> bool {
        provider.api_key_env().is_none() || self.keys.contains_key(&provider)
    }
}

/// Empty values, the dashboard mask and template values such as
/// `your_openai_api_key_here` all count as unset.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == MASK || (v.starts_with("your_") && v.ends_with("_here"))
}

/// Non-secret preferences stored in `config/settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub default_model: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".into(),
            port: 3001,
        }
    }
}

impl Settings {
    /// Missing or unreadable settings fall back to defaults.
    pub fn load(workspace: &Workspace) -> Self {
        std::fs::read_to_string(workspace.settings_file())
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, workspace: &Workspace) -> anyhow::Result<()> {
        std::fs::create_dir_all(workspace.config_dir())?;
        std::fs::write(workspace.settings_file(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Env file written by `init`, every key left as a placeholder.
pub fn env_template() -> String {
    let mut out = String::from("# easyai environment\n");
    for provider in Provider::ALL {
        if let Some(var) = provider.api_key_env() {
            out.push_str(&format!("{var}=your_{}_api_key_here\n", provider.as_str()));
        }
    }
    out.push_str(&format!("OLLAMA_BASE_URL={}\n", Provider::Ollama.default_base_url()));
    out
}

/// Read `KEY=VALUE` pairs from an env file. A missing file yields an empty map.
pub fn read_env_file(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let mut vars = BTreeMap::new();
    for item in dotenvy::from_path_iter(path)? {
        let (key, value) = item?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Merge `updates` into the env file. Empty values and the mask keep whatever
/// is already stored for that key.
pub fn merge_env_file(path: &Path, updates: &BTreeMap<String, String>) -> anyhow::Result<BTreeMap<String, String>> {
    let mut vars = read_env_file(path)?;
    for (key, value) in updates {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        if value.is_empty() || value == MASK {
            continue;
        }
        vars.insert(key.to_string(), value.to_string());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = String::from("# easyai environment\n");
    for (key, value) in &vars {
        out.push_str(&format!("{key}={}\n", quote_env_value(value)));
    }
    std::fs::write(path, out)?;
    Ok(vars)
}

fn quote_env_value(value: &str) -> String {
    if value.chars().any(|c| c.is_whitespace() || c == '#' || c == '"' || c == '\'') {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Replace the value of every variable whose name contains `KEY` with the mask.
pub fn sanitize_env(vars: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    vars.iter()
        .map(|(k, v)| {
            let shown = if k.to_uppercase().contains("KEY") && !is_placeholder(v) {
                MASK.to_string()
            } else {
                v.clone()
            };
            (k.clone(), shown)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_unset() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("your_openai_api_key_here"));
        assert!(is_placeholder(MASK));
        assert!(!is_placeholder("sk-live-123"));

        let mut keys = ApiKeys::default();
        keys.set(Provider::OpenAI, Some("your_openai_api_key_here".into()));
        keys.set(Provider::Anthropic, Some("sk-ant-1".into()));
        assert!(!keys.is_configured(Provider::OpenAI));
        assert!(keys.is_configured(Provider::Anthropic));
        assert!(keys.is_configured(Provider::Ollama));
    }

    #[test]
    fn template_keys_fall_through_to_the_shell() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new(Workspace::new(dir.path()));
        std::fs::create_dir_all(config.workspace.config_dir()).unwrap();
        std::fs::write(
            config.workspace.env_file(),
            env_template().replace("your_anthropic_api_key_here", "sk-ant-file"),
        )
        .unwrap();
        std::env::set_var("OPENROUTER_API_KEY", "sk-or-from-shell");
        std::env::set_var("ANTHROPIC_API_KEY", "sk-ant-from-shell");

        let keys = config.api_keys();
        assert_eq!(keys.get(Provider::OpenRouter), None);
        assert_eq!(keys.get(Provider::Anthropic), Some("sk-ant-file"));

        config.process_env_keys = true;
        let keys = config.api_keys();
        assert_eq!(keys.get(Provider::OpenRouter), Some("sk-or-from-shell"));
        assert_eq!(keys.get(Provider::Anthropic), Some("sk-ant-file"));
    }

    #[test]
    fn merge_preserves_existing_values_for_empty_and_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("easyai.env");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "OPENAI_API_KEY=sk-old\nANTHROPIC_API_KEY=sk-ant\n").unwrap();

        let updates = BTreeMap::from([
            ("OPENAI_API_KEY".to_string(), MASK.to_string()),
            ("ANTHROPIC_API_KEY".to_string(), "".to_string()),
            ("GEMINI_API_KEY".to_string(), "g-new".to_string()),
            ("EASYAI_LOG_CAP".to_string(), "50".to_string()),
        ]);
        merge_env_file(&path, &updates).unwrap();

        let vars = read_env_file(&path).unwrap();
        assert_eq!(vars["OPENAI_API_KEY"], "sk-old");
        assert_eq!(vars["ANTHROPIC_API_KEY"], "sk-ant");
        assert_eq!(vars["GEMINI_API_KEY"], "g-new");
        assert_eq!(vars["EASYAI_LOG_CAP"], "50");
    }

    #[test]
    fn sanitize_masks_key_variables_only() {
        let vars = BTreeMap::from([
            ("OPENAI_API_KEY".to_string(), "sk-1".to_string()),
            ("GEMINI_API_KEY".to_string(), "your_gemini_api_key_here".to_string()),
            ("OLLAMA_BASE_URL".to_string(), "http://localhost:11434".to_string()),
        ]);
        let shown = sanitize_env(&vars);
        assert_eq!(shown["OPENAI_API_KEY"], MASK);
        assert_eq!(shown["GEMINI_API_KEY"], "your_gemini_api_key_here");
        assert_eq!(shown["OLLAMA_BASE_URL"], "http://localhost:11434");
    }

    #[test]
    fn quoted_values_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("easyai.env");
        let updates = BTreeMap::from([("NOTE".to_string(), "two words".to_string())]);
        merge_env_file(&path, &updates).unwrap();
        assert_eq!(read_env_file(&path).unwrap()["NOTE"], "two words");
    }

    #[test]
    fn settings_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let settings = Settings::load(&ws);
        assert_eq!(settings.port, 3001);

        let custom = Settings {
            default_model: "claude-3-haiku".into(),
            port: 4000,
        };
        custom.save(&ws).unwrap();
        assert_eq!(Settings::load(&ws).default_model, "claude-3-haiku");
    }
}
