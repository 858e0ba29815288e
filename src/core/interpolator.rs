// src/core/interpolator.rs

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;

lazy_static! {
    static ref PLACEHOLDER_RE: Regex =
        Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder pattern must compile");
}

/// Replaces every `{{name}}` in `text` whose name is a key of `vars`.
///
/// Single pass over the input: a replacement value that itself contains a
/// placeholder is inserted literally and never expanded. Unknown names are left
/// as they are.
pub fn substitute_str(text: &str, vars: &BTreeMap<String, String>) -> String {
    substitute_with(text, vars, |value| value.to_string())
}

/// Applies `vars` to any serializable value: strings, string maps, maps of string
/// lists, or whole records.
///
/// The value is serialized to JSON, placeholders are replaced in the serialized text
/// and the result is parsed back into the original shape. If either step fails the
/// original value is returned unchanged and a warning is logged.
pub fn apply_vars<T>(data: &T, vars: &BTreeMap<String, String>) -> T
where
    T: Serialize + DeserializeOwned + Clone,
{
    if vars.is_empty() {
        return data.clone();
    }

    let serialized = match serde_json::to_string(data) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("Variable substitution skipped, could not serialize value: {}", e);
            return data.clone();
        }
    };

    // Values are JSON-escaped so a quote or backslash inside a variable cannot break
    // the document structure.
    let replaced = substitute_with(&serialized, vars, json_escape);

    match serde_json::from_str(&replaced) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Variable substitution skipped, result is not valid: {}", e);
            data.clone()
        }
    }
}

fn substitute_with(
    text: &str,
    vars: &BTreeMap<String, String>,
    render: impl Fn(&str) -> String,
) -> String {
    if vars.is_empty() || !text.contains("{{") {
        return text.to_string();
    }
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            match caps.get(1).and_then(|name| vars.get(name.as_str())) {
                Some(value) => render(value),
                None => whole.to_string(),
            }
        })
        .into_owned()
}

fn json_escape(value: &str) -> String {
    let quoted = serde_json::to_string(value).unwrap_or_default();
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or_default()
        .to_string()
}
