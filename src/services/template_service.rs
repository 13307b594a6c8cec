use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid")
});

/// Distinct placeholder names in order of first appearance.
pub fn detect_variables(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let name = &caps[1];
        if !seen.iter().any(|s: &String| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

/// Replace every placeholder that has a value. Unknown placeholders are left
/// as they are, and inserted values are never substituted again.
pub fn substitute(text: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Variables that appear in `text` but have no value yet.
pub fn missing_variables(text: &str, values: &HashMap<String, String>) -> Vec<String> {
    detect_variables(text)
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .collect()
}
