use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A primitive value as it appears in a catalog item.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Arrays and objects are not expected in items; only their size is kept.
    Composite(usize),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => Self::Number(number.as_f64().unwrap_or(f64::NAN)),
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::Composite(items.len()),
            Value::Object(entries) => Self::Composite(entries.len()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from)
    }
}

/// Whether an item carried a key at all. `Missing` is distinct from a present `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldSlot {
    #[default]
    Missing,
    Present(FieldValue),
}

impl FieldSlot {
    pub fn value(&self) -> Option<&FieldValue> {
        match self {
            Self::Missing => None,
            Self::Present(value) => Some(value),
        }
    }
}

impl<'de> Deserialize<'de> for FieldSlot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        FieldValue::deserialize(deserializer).map(Self::Present)
    }
}

/// Conventional truthiness: null, `false`, zero, the empty string and empty
/// composites are absent; everything else is present.
///
/// Zero is absent even for numeric fields such as `price` or `quantity`.
pub fn is_present(value: &FieldValue) -> bool {
    match value {
        FieldValue::Null => false,
        FieldValue::Bool(flag) => *flag,
        // NaN stands in for numbers that do not fit an f64; those are truthy.
        FieldValue::Number(number) => *number != 0.0,
        FieldValue::Text(text) => !text.is_empty(),
        FieldValue::Composite(len) => *len > 0,
    }
}
