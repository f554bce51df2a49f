//! `${NAME}` and `${NAME:default}` substitution inside decoded string values.
//!
//! This runs on raw configuration text, before merging. It is separate from
//! field-level environment overriding, which happens after binding.

use crate::Tree;
use crate::env::Environment;
use crate::error::{Error, Result};
use regex_lite::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static ENV_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("Invalid interpolation regex"));

/// Substitute every `${...}` occurrence in `input`.
///
/// A set variable wins, even when empty. An unset variable takes the text
/// after the first colon, or the empty string. An empty name is an error.
pub fn interpolate_str(input: &str, env: &dyn Environment) -> Result<String> {
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in ENV_REF.captures_iter(input) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let (name, default) = inner.as_str().split_once(':').unwrap_or((inner.as_str(), ""));
        if name.is_empty() {
            return Err(Error::EmptyInterpolation(input.to_string()));
        }

        out.push_str(&input[last..whole.start()]);
        match env.var(name) {
            Some(value) => out.push_str(&value),
            None => out.push_str(default),
        }
        last = whole.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

/// Interpolate every string scalar in `value`, recursing into mappings and sequences.
///
/// Keys are left as written.
pub fn interpolate_value(value: &mut Value, env: &dyn Environment) -> Result<()> {
    match value {
        Value::String(s) => {
            if s.contains("${") {
                *s = interpolate_str(s, env)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                interpolate_value(item, env)?;
            }
        }
        Value::Object(map) => interpolate_tree(map, env)?,
        _ => {}
    }
    Ok(())
}

/// Interpolate every string scalar in a decoded tree.
pub fn interpolate_tree(tree: &mut Tree, env: &dyn Environment) -> Result<()> {
    for value in tree.values_mut() {
        interpolate_value(value, env)?;
    }
    Ok(())
}
