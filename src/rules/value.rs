use ahash::AHashMap;
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Submitted or in-progress form data, keyed by element id or field name.
pub type ValueMap = AHashMap<String, FieldValue>;

/// Runtime value of a field, or the expected value of a condition.
///
/// Reading goes through `serde_json::Value`, so any JSON shape is accepted; objects
/// end up as their JSON text.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Empty lists, empty strings and null are empty.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Bool(_) | FieldValue::Number(_) => false,
        }
    }

    /// Numeric reading of the value; numeric strings parse, booleans do not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// String reading of the value used by loose comparisons. Lists join with ",".
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Null => Cow::Borrowed(""),
            FieldValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            FieldValue::Number(n) => Cow::Owned(format_number(*n)),
            FieldValue::Text(s) => Cow::Borrowed(s),
            FieldValue::List(items) => Cow::Owned(items.iter().map(|v| v.as_text()).join(",")),
        }
    }

    /// Checkbox reading: `true`, `1` and "1"/"on"/"yes"/"true" in any case are checked.
    pub fn is_checked(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => *n == 1.0,
            FieldValue::Text(s) => {
                let s = s.trim();
                ["1", "on", "yes", "true"]
                    .iter()
                    .any(|truthy| s.eq_ignore_ascii_case(truthy))
            }
            FieldValue::Null | FieldValue::List(_) => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", format_number(*n)),
            FieldValue::Text(s) => write!(f, "\"{}\"", s),
            FieldValue::List(items) => write!(f, "[{}]", items.iter().join(", ")),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Number(f64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Nested objects have no comparison semantics and are carried as their JSON text.
impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Number),
            serde_json::Value::String(s) => FieldValue::Text(s),
            serde_json::Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            object @ serde_json::Value::Object(_) => FieldValue::Text(object.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(FieldValue::from)
    }
}

/// Builds a `ValueMap` from a JSON object; any other JSON shape yields an empty map.
pub fn values_from_json(value: serde_json::Value) -> ValueMap {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| (k, FieldValue::from(v)))
            .collect(),
        _ => ValueMap::new(),
    }
}
