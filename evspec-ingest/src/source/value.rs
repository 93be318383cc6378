//! In-memory source tree
//!
//! Source modules carry values JSON cannot represent: icon components,
//! symbols, dates. Authored markers in module files produce them:
//!
//! | Marker                   | Value                  |
//! |--------------------------|------------------------|
//! | `{"$fn": "GaugeIcon"}`   | `Opaque::Function`     |
//! | `{"$symbol": "react"}`   | `Opaque::Symbol`       |
//! | `{"$date": "2021-…Z"}`   | `SourceValue::Date`    |
//! | TOML datetime            | `SourceValue::Date`    |
//!
//! A marker object holds exactly its marker key; anything else is a mapping.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

const FUNCTION_MARKER: &str = "$fn";
const SYMBOL_MARKER: &str = "$symbol";
const DATE_MARKER: &str = "$date";

#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Date(DateTime<Utc>),
    Sequence(Vec<SourceValue>),
    Mapping(BTreeMap<String, SourceValue>),
    Opaque(Opaque),
}

/// Values that only make sense to the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opaque {
    Function { name: Option<String> },
    Symbol { description: Option<String> },
}

impl SourceValue {
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, SourceValue>> {
        match self {
            SourceValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SourceValue::Null)
    }

    /// Short type label for log messages and skip reasons
    pub fn kind(&self) -> &'static str {
        match self {
            SourceValue::Null => "null",
            SourceValue::Bool(_) => "boolean",
            SourceValue::Number(_) => "number",
            SourceValue::String(_) => "string",
            SourceValue::Date(_) => "date",
            SourceValue::Sequence(_) => "sequence",
            SourceValue::Mapping(_) => "mapping",
            SourceValue::Opaque(Opaque::Function { .. }) => "function",
            SourceValue::Opaque(Opaque::Symbol { .. }) => "symbol",
        }
    }

    pub fn function(name: &str) -> Self {
        SourceValue::Opaque(Opaque::Function { name: Some(name.to_string()) })
    }

    pub fn string(s: impl Into<String>) -> Self {
        SourceValue::String(s.into())
    }

    /// Build a mapping from key/value pairs
    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, SourceValue)>) -> Self {
        SourceValue::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => SourceValue::Null,
            Value::Bool(b) => SourceValue::Bool(b),
            Value::Number(n) => SourceValue::Number(n),
            Value::String(s) => SourceValue::String(s),
            Value::Array(items) => SourceValue::Sequence(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some((key, inner)) = map.iter().next() {
                        if let Some(marker) = from_marker(key, inner.as_str()) {
                            return marker;
                        }
                    }
                }
                SourceValue::Mapping(map.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect())
            }
        }
    }

    pub fn from_toml(value: toml::Value) -> Self {
        use toml::Value;

        match value {
            Value::String(s) => SourceValue::String(s),
            Value::Integer(i) => SourceValue::Number(i.into()),
            // NaN and infinities have no JSON form
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(SourceValue::Number)
                .unwrap_or(SourceValue::Null),
            Value::Boolean(b) => SourceValue::Bool(b),
            Value::Datetime(dt) => {
                let raw = dt.to_string();
                parse_date(&raw)
                    .map(SourceValue::Date)
                    .unwrap_or(SourceValue::String(raw))
            }
            Value::Array(items) => SourceValue::Sequence(items.into_iter().map(Self::from_toml).collect()),
            Value::Table(table) => {
                if table.len() == 1 {
                    if let Some((key, inner)) = table.iter().next() {
                        if let Some(marker) = from_marker(key, inner.as_str()) {
                            return marker;
                        }
                    }
                }
                SourceValue::Mapping(table.into_iter().map(|(k, v)| (k, Self::from_toml(v))).collect())
            }
        }
    }
}

fn from_marker(key: &str, text: Option<&str>) -> Option<SourceValue> {
    let non_empty = text.filter(|t| !t.is_empty()).map(str::to_string);
    match key {
        FUNCTION_MARKER => Some(SourceValue::Opaque(Opaque::Function { name: non_empty })),
        SYMBOL_MARKER => Some(SourceValue::Opaque(Opaque::Symbol { description: non_empty })),
        DATE_MARKER => {
            let raw = text?;
            Some(match parse_date(raw) {
                Some(date) => SourceValue::Date(date),
                None => {
                    warn!("Unparseable {} value '{}', keeping it as text", DATE_MARKER, raw);
                    SourceValue::String(raw.to_string())
                }
            })
        }
        _ => None,
    }
}

/// RFC 3339, naive date-time (taken as UTC) or a bare date (midnight UTC)
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
