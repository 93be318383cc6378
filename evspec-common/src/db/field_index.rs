//! Generated search index over page documents
//!
//! Each document is flattened into `(path, value)` pairs, one per distinct
//! scalar leaf. Object keys are joined with `.`; array elements share their
//! parent's path with a `[]` suffix, so element position does not matter.
//! `value` is the JSON text of the scalar (`"2020"`, `42`, `true`, `null`).
//!
//! A page contains a fragment when every pair of the fragment is present in
//! the page's pairs.

use serde_json::Value;
use std::collections::BTreeSet;

pub type FieldPair = (String, String);

/// All distinct `(path, value)` pairs of `document`
pub fn flatten_fields(document: &Value) -> BTreeSet<FieldPair> {
    let mut pairs = BTreeSet::new();
    walk(document, String::new(), &mut pairs);
    pairs
}

/// JSON text used as the indexed value of a scalar
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(_) | Value::Object(_) => None,
        scalar => Some(scalar.to_string()),
    }
}

fn walk(value: &Value, path: String, pairs: &mut BTreeSet<FieldPair>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                walk(child, child_path, pairs);
            }
        }
        Value::Array(items) => {
            let item_path = format!("{}[]", path);
            for item in items {
                walk(item, item_path.clone(), pairs);
            }
        }
        scalar => {
            pairs.insert((path, scalar.to_string()));
        }
    }
}
