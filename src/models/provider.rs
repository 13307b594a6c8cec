use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported upstream providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
    Gemini,
    OpenRouter,
    Ollama,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::OpenAI,
        Provider::Anthropic,
        Provider::Gemini,
        Provider::OpenRouter,
        Provider::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
            Provider::OpenRouter => "openrouter",
            Provider::Ollama => "ollama",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Gemini => "Google Gemini",
            Provider::OpenRouter => "OpenRouter",
            Provider::Ollama => "Ollama",
        }
    }

    /// Default base URL for each provider.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Ollama => "http://localhost:11434",
        }
    }

    /// Env variable holding the API key. Ollama has none.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::OpenRouter => Some("OPENROUTER_API_KEY"),
            Provider::Ollama => None,
        }
    }

    pub fn base_url_env(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_BASE_URL",
            Provider::Anthropic => "ANTHROPIC_BASE_URL",
            Provider::Gemini => "GEMINI_BASE_URL",
            Provider::OpenRouter => "OPENROUTER_BASE_URL",
            Provider::Ollama => "OLLAMA_BASE_URL",
        }
    }

    /// Guess the provider from a model identifier. Precedence matters:
    /// `openai/gpt-4` is an OpenRouter slug even though it contains "gpt".
    pub fn sniff(model: &str) -> Self {
        let m = model.to_lowercase();
        if m.contains('/') {
            Provider::OpenRouter
        } else if m.contains("gpt") {
            Provider::OpenAI
        } else if m.contains("claude") {
            Provider::Anthropic
        } else if m.contains("gemini") {
            Provider::Gemini
        } else {
            Provider::Ollama
        }
    }

    /// Resolve once at the boundary. An explicit provider always wins.
    pub fn resolve(model: &str, explicit: Option<Provider>) -> Resolution {
        match explicit {
            Some(provider) => Resolution {
                provider,
                guessed: false,
            },
            None => Resolution {
                provider: Provider::sniff(model),
                guessed: true,
            },
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "gemini" | "google" => Ok(Provider::Gemini),
            "openrouter" => Ok(Provider::OpenRouter),
            "ollama" | "local" => Ok(Provider::Ollama),
            _ => Err(format!(
                "unknown provider `{s}` (openai, anthropic, gemini, openrouter, ollama)"
            )),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of provider resolution. `guessed` is set when the provider came from
/// sniffing the model string rather than an explicit choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub provider: Provider,
    pub guessed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_routes_to_openrouter_before_gpt() {
        assert_eq!(Provider::sniff("openai/gpt-4"), Provider::OpenRouter);
        assert_eq!(Provider::sniff("anthropic/claude-3-opus"), Provider::OpenRouter);
    }

    #[test]
    fn substring_precedence() {
        assert_eq!(Provider::sniff("gpt-4o-mini"), Provider::OpenAI);
        assert_eq!(Provider::sniff("claude-3-haiku"), Provider::Anthropic);
        assert_eq!(Provider::sniff("gemini-1.5-pro"), Provider::Gemini);
        assert_eq!(Provider::sniff("llama3"), Provider::Ollama);
        // "gpt" is checked before "claude"
        assert_eq!(Provider::sniff("claude-vs-gpt"), Provider::OpenAI);
    }

    #[test]
    fn explicit_provider_wins() {
        let r = Provider::resolve("gpt-4", Some(Provider::OpenRouter));
        assert_eq!(r.provider, Provider::OpenRouter);
        assert!(!r.guessed);
        assert!(Provider::resolve("mistral", None).guessed);
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("Google".parse::<Provider>(), Ok(Provider::Gemini));
        assert_eq!("OPENAI".parse::<Provider>(), Ok(Provider::OpenAI));
        assert!("bedrock".parse::<Provider>().is_err());
    }
}
