//! Lenient field decoders for backend JSON.
//!
//! The backend is inconsistent about scalar types: semesters, module indexes
//! and ids arrive as numbers on some endpoints and as strings on others, and
//! list-valued fields may be arrays, JSON-encoded strings, or comma-separated
//! text. Everything is normalized here so the rest of the crate sees one shape.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 2^64, the first float past `u64::MAX`.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Whole, non-negative floats such as `3.0` that fit a `u64`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_float_to_u64(f: f64) -> Option<u64> {
    (f.fract() == 0.0 && (0.0..U64_LIMIT).contains(&f)).then(|| f as u64)
}

fn value_to_u64(value: &Value) -> Result<Option<u64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().and_then(whole_float_to_u64))
            .map(Some)
            .ok_or_else(|| format!("expected a non-negative integer, got {n}")),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<u64>()
                .map(Some)
                .map_err(|_| format!("expected an integer string, got {s:?}"))
        }
        other => Err(format!("expected an integer, got {other}")),
    }
}

/// `u64` that may be sent as a number or a numeric string.
pub fn u64_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(d)?;
    value_to_u64(&value)
        .map_err(D::Error::custom)?
        .ok_or_else(|| D::Error::custom("missing integer"))
}

/// `u32` that may be sent as a number or a numeric string.
pub fn u32_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let raw = u64_lenient(d)?;
    u32::try_from(raw).map_err(D::Error::custom)
}

/// Optional `u32`; `null`, absent, and blank strings all decode to `None`.
pub fn opt_u32_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(d)?;
    match value_to_u64(&value).map_err(D::Error::custom)? {
        Some(raw) => u32::try_from(raw).map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}

/// Optional `u64` with the same leniency as [`opt_u32_lenient`].
pub fn opt_u64_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(d)?;
    value_to_u64(&value).map_err(D::Error::custom)
}

/// String that may be sent as a JSON number (group names like `1`).
pub fn string_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected a string, got {other}"))),
    }
}

/// Split a raw tag field into trimmed, non-empty entries.
///
/// Accepts a JSON array, a string holding a JSON array, a comma-separated
/// string, or `null`.
#[must_use]
pub fn split_tags(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                if let Ok(inner @ Value::Array(_)) = serde_json::from_str::<Value>(trimmed) {
                    return split_tags(&inner);
                }
            }
            trimmed
                .split(',')
                .map(|part| {
                    part.trim()
                        .trim_matches(|c| c == '"' || c == '[' || c == ']')
                        .trim()
                        .to_string()
                })
                .filter(|part| !part.is_empty())
                .collect()
        }
        _ => Vec::new(),
    }
}

/// List of strings in any of the shapes accepted by [`split_tags`].
pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?.unwrap_or(Value::Null);
    Ok(split_tags(&value))
}
