//! Tolerant extraction of pollen readings from the `currentConditions` body.
//!
//! The upstream schema is not fixed, so extraction is an ordered list of
//! lookups. Each lookup uses "first truthy" selection: a candidate is skipped
//! when it is absent, null, false, zero, an empty string, an empty array or an
//! empty object. The lookup order below is part of the observable behaviour
//! and must not be reordered.
//!
//! Overall index:
//! 1. block = first truthy of `index`, `indexes` (objects only)
//! 2. entry = first truthy of `block.pollen`, `block.overall`, else `block`
//! 3. object entry -> `value`/`category`; scalar entry -> integer coercion
//!
//! Per-type readings, first strategy producing entries wins:
//! 1. first truthy of `types`, `pollenTypes`, `data`
//! 2. `current.pollen`

use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

use super::FetchError;
use crate::models::{PollenSnapshot, PollenTypeReading};

const INDEX_BLOCK_KEYS: &[&str] = &["index", "indexes"];
const INDEX_ENTRY_KEYS: &[&str] = &["pollen", "overall"];
const TYPE_BLOCK_KEYS: &[&str] = &["types", "pollenTypes", "data"];

/// A named place where per-type readings may live
pub struct TypeStrategy {
    pub name: &'static str,
    locate: fn(&Map<String, Value>) -> Option<&Value>,
}

/// Per-type lookup strategies in the order they are attempted
pub const TYPE_STRATEGIES: &[TypeStrategy] = &[
    TypeStrategy {
        name: "types block",
        locate: locate_types_block,
    },
    TypeStrategy {
        name: "current.pollen",
        locate: locate_current_pollen,
    },
];

/// Per-type readings together with the strategy that produced them
#[derive(Debug, Default, PartialEq)]
pub struct ParsedTypes {
    pub strategy: Option<&'static str>,
    pub readings: BTreeMap<String, PollenTypeReading>,
}

/// Decode a raw response body and extract a snapshot from it
pub fn parse_body(bytes: &[u8]) -> Result<PollenSnapshot, FetchError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|source| FetchError::Decode { source })?;
    parse_snapshot(&value)
}

/// Extract a snapshot from an already decoded JSON document.
///
/// Missing, extra or oddly typed fields never fail; only a non-object
/// document does.
pub fn parse_snapshot(body: &Value) -> Result<PollenSnapshot, FetchError> {
    let root = body.as_object().ok_or(FetchError::UnexpectedShape {
        found: json_type_name(body),
    })?;

    let (index, category) = extract_index(root);
    let types = extract_types(root);
    trace!(
        strategy = types.strategy.unwrap_or("none"),
        type_count = types.readings.len(),
        "Extracted pollen readings"
    );

    Ok(PollenSnapshot {
        index,
        category,
        types: types.readings,
        fetched_at: Utc::now(),
    })
}

/// Overall index and category
pub fn extract_index(root: &Map<String, Value>) -> (Option<i64>, Option<String>) {
    let Some(Value::Object(block)) = first_truthy(root, INDEX_BLOCK_KEYS) else {
        return (None, None);
    };

    match first_truthy(block, INDEX_ENTRY_KEYS) {
        Some(Value::Object(entry)) => read_index_entry(entry),
        Some(scalar) => (coerce_integer(scalar), None),
        None => read_index_entry(block),
    }
}

fn read_index_entry(entry: &Map<String, Value>) -> (Option<i64>, Option<String>) {
    (
        entry.get("value").and_then(coerce_integer),
        entry.get("category").and_then(coerce_text),
    )
}

/// Per-type readings, walking [`TYPE_STRATEGIES`] until one yields entries
pub fn extract_types(root: &Map<String, Value>) -> ParsedTypes {
    for strategy in TYPE_STRATEGIES {
        let readings = (strategy.locate)(root)
            .map(read_type_entries)
            .unwrap_or_default();
        if !readings.is_empty() {
            return ParsedTypes {
                strategy: Some(strategy.name),
                readings,
            };
        }
    }
    ParsedTypes::default()
}

fn locate_types_block(root: &Map<String, Value>) -> Option<&Value> {
    first_truthy(root, TYPE_BLOCK_KEYS)
}

fn locate_current_pollen(root: &Map<String, Value>) -> Option<&Value> {
    match root.get("current") {
        Some(Value::Object(current)) => current.get("pollen").filter(|v| is_truthy(v)),
        _ => None,
    }
}

fn read_type_entries(block: &Value) -> BTreeMap<String, PollenTypeReading> {
    let Value::Object(entries) = block else {
        return BTreeMap::new();
    };

    entries
        .iter()
        .map(|(name, raw)| {
            let reading = match raw {
                Value::Object(fields) => PollenTypeReading {
                    value: fields.get("value").and_then(coerce_number),
                    category: fields.get("category").and_then(coerce_text),
                },
                scalar => PollenTypeReading {
                    value: coerce_number(scalar),
                    category: None,
                },
            };
            (name.clone(), reading)
        })
        .collect()
}

fn first_truthy<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| is_truthy(value))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Integer coercion: floats truncate toward zero, strings are trimmed and parsed
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
