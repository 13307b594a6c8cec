//! Static cost estimates. These are approximations, not billed amounts.

use crate::models::provider::Provider;

/// USD per 1M tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    pub input: f64,
    pub output: f64,
}

/// Generic rate for models with no table entry.
const FALLBACK_RATE: Rate = Rate {
    input: 2.0,
    output: 6.0,
};

/// Checked in order, so more specific substrings come first.
const RATE_TABLE: &[(&str, Rate)] = &[
    ("gpt-4o-mini", Rate { input: 0.15, output: 0.60 }),
    ("gpt-4o", Rate { input: 2.50, output: 10.00 }),
    ("gpt-4-turbo", Rate { input: 10.00, output: 30.00 }),
    ("gpt-4", Rate { input: 30.00, output: 60.00 }),
    ("gpt-3.5", Rate { input: 0.50, output: 1.50 }),
    ("o1-mini", Rate { input: 3.00, output: 12.00 }),
    ("opus", Rate { input: 15.00, output: 75.00 }),
    ("sonnet", Rate { input: 3.00, output: 15.00 }),
    ("haiku", Rate { input: 0.25, output: 1.25 }),
    ("gemini-1.5-pro", Rate { input: 1.25, output: 5.00 }),
    ("gemini-1.5-flash", Rate { input: 0.075, output: 0.30 }),
    ("gemini", Rate { input: 0.10, output: 0.40 }),
    ("llama", Rate { input: 0.20, output: 0.20 }),
    ("mistral", Rate { input: 0.25, output: 0.25 }),
];

/// Rate for a model; local models are free.
pub fn rate_for(model: &str, provider: Provider) -> Rate {
    if provider == Provider::Ollama {
        return Rate { input: 0.0, output: 0.0 };
    }
    let m = model.to_lowercase();
    RATE_TABLE
        .iter()
        .find(|(key, _)| m.contains(key))
        .map(|(_, rate)| *rate)
        .unwrap_or(FALLBACK_RATE)
}

/// Estimated cost in USD.
pub fn estimate_cost(model: &str, provider: Provider, input_tokens: u64, output_tokens: u64) -> f64 {
    let rate = rate_for(model, provider);
    (input_tokens as f64 / 1_000_000.0) * rate.input + (output_tokens as f64 / 1_000_000.0) * rate.output
}

pub fn format_cost(cost: f64) -> String {
    if cost == 0.0 {
        "$0.00".to_string()
    } else if cost < 0.01 {
        format!("${cost:.6}")
    } else {
        format!("${cost:.4}")
    }
}
