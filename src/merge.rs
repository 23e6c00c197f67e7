//! Overlaying hand-written override documents onto the generated one.
//!
//! The generated document stays authoritative: an override value is only taken where the
//! generated value is missing or empty (`null`, `""`, `[]`, `{}`). Objects are merged key by
//! key, so overrides can add whole sections such as `components.securitySchemes`.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads an override document; `.json` files are JSON, anything else is YAML.
pub fn load_override(path: &Path) -> Result<Value> {
    debug!("Loading override document: {}", path.display());
    let override_error = |message: String| Error::OverrideError {
        file: path.to_path_buf(),
        message,
    };

    let content = fs::read_to_string(path).map_err(|e| override_error(e.to_string()))?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_str(&content).map_err(|e| override_error(e.to_string()))
    } else {
        serde_yaml::from_str(&content).map_err(|e| override_error(e.to_string()))
    }
}

/// Merges `overlay` into `base`, keeping every non-empty value of `base`.
///
/// `pointer` is the JSON pointer of `base`, used in diagnostics.
pub fn merge_values(base: &mut Value, overlay: Value, pointer: &str, diagnostics: &mut Diagnostics) {
    if is_empty(base) {
        *base = overlay;
        return;
    }

    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let child = format!("{}/{}", pointer, key.replace('~', "~0").replace('/', "~1"));
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value, &child, diagnostics),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => {
            if is_empty(&overlay) {
                return;
            }
            if kind(base) != kind(&overlay) {
                diagnostics.warn(
                    display_pointer(pointer),
                    format!(
                        "override has {} where the document has {}; kept the document value",
                        kind(&overlay),
                        kind(base)
                    ),
                );
            } else {
                debug!("Keeping generated value at {}", display_pointer(pointer));
            }
        }
    }
}

/// Serializes `document` and merges every override file into it, in order.
pub fn apply_overrides<T: Serialize + ?Sized>(
    document: &T,
    overrides: &[PathBuf],
    diagnostics: &mut Diagnostics,
) -> Result<Value> {
    let mut merged = serde_json::to_value(document)?;
    for path in overrides {
        let overlay = load_override(path)?;
        merge_values(&mut merged, overlay, "", diagnostics);
        info!("Merged override document {}", path.display());
    }
    Ok(merged)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn display_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
