//! Conversion of source values into storable JSON
//!
//! Total and pure: every `SourceValue` has a JSON form, nothing is invoked,
//! nothing fails. Two rendering-only fields are removed at every level:
//! `icon` when it holds a mapping, and `children` always.

use crate::source::{Opaque, SourceValue};
use chrono::SecondsFormat;
use serde_json::{Map, Value};

pub const FUNCTION_SENTINEL: &str = "[function]";

const ICON_KEY: &str = "icon";
const CHILDREN_KEY: &str = "children";

pub fn sanitize(value: &SourceValue) -> Value {
    match value {
        SourceValue::Null => Value::Null,
        SourceValue::Bool(b) => Value::Bool(*b),
        SourceValue::Number(n) => Value::Number(n.clone()),
        SourceValue::String(s) => Value::String(s.clone()),
        SourceValue::Date(date) => Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        SourceValue::Sequence(items) => Value::Array(items.iter().map(sanitize).collect()),
        SourceValue::Mapping(fields) => {
            let mut out = Map::new();
            for (key, child) in fields {
                if is_render_only(key, child) {
                    continue;
                }
                out.insert(key.clone(), sanitize(child));
            }
            Value::Object(out)
        }
        SourceValue::Opaque(Opaque::Function { .. }) => Value::String(FUNCTION_SENTINEL.to_string()),
        SourceValue::Opaque(Opaque::Symbol { description }) => {
            Value::String(format!("Symbol({})", description.as_deref().unwrap_or("")))
        }
    }
}

fn is_render_only(key: &str, value: &SourceValue) -> bool {
    match key {
        CHILDREN_KEY => true,
        ICON_KEY => matches!(value, SourceValue::Mapping(_)),
        _ => false,
    }
}
