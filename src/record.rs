//! The ad record schema and the lenient casts applied to its string fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single advertisement as read from the dataset.
///
/// Fields not listed here are ignored after deduplication; the loader compares
/// full rows before this struct is ever built.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AdRecord {
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default)]
    pub ad_delivery_start_time: Option<String>,
    #[serde(default)]
    pub ad_creative_body: Option<String>,
    #[serde(default)]
    pub spend: Option<SpendRange>,
    #[serde(default)]
    pub demographic_distribution: Option<Vec<DemographicEntry>>,
}

/// Reported spend range. Bounds are numeric strings in the source data.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpendRange {
    #[serde(default, deserialize_with = "scalar_string")]
    pub lower_bound: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub upper_bound: Option<String>,
}

/// One audience bucket of an ad's demographic distribution.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DemographicEntry {
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub percentage: Option<String>,
}

/// Accepts a JSON string or number and keeps its textual form, so that casts
/// behave the same whichever way the exporter wrote the value.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Casts a string to a 32-bit integer, yielding `None` when it is not
/// numeric or does not fit.
///
/// Surrounding whitespace is ignored and a decimal value is truncated toward
/// zero (`"12.9"` becomes `12`).
pub fn cast_int(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i32>() {
        return Some(v);
    }
    let f = trimmed.parse::<f64>().ok()?.trunc();
    if !f.is_finite() || f < i32::MIN as f64 || f > i32::MAX as f64 {
        return None;
    }
    Some(f as i32)
}

/// Casts a string to a float, yielding `None` when it is not numeric.
pub fn cast_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl AdRecord {
    /// The campaign this ad belongs to (the publishing page's name).
    pub fn campaign(&self) -> Option<&str> {
        self.page_name.as_deref()
    }
}
