use crate::AttributeMap;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::{Display, Formatter};

/// Every runtime shape a span value can take before being coerced into a column.
/// A missing value is represented by the absence of the key, not by a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    Time(DateTime<Utc>),
    Map(AttributeMap),
}

impl RawValue {
    /// Json null has no RawValue counterpart and becomes None.
    /// Arrays are kept as their json text since no column type can hold them natively.
    pub fn from_json(value: serde_json::Value) -> Option<RawValue> {
        let raw = match value {
            serde_json::Value::Null => return None,
            serde_json::Value::Bool(b) => RawValue::Bool(b),
            serde_json::Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    RawValue::Int(int)
                } else if let Some(uint) = number.as_u64() {
                    RawValue::UInt(uint)
                } else {
                    RawValue::Float(number.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(text) => RawValue::Text(text),
            array @ serde_json::Value::Array(_) => RawValue::Text(array.to_string()),
            serde_json::Value::Object(map) => RawValue::Map(map),
        };
        Some(raw)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

impl From<u64> for RawValue {
    fn from(value: u64) -> Self {
        RawValue::UInt(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        RawValue::Time(value)
    }
}

impl From<AttributeMap> for RawValue {
    fn from(value: AttributeMap) -> Self {
        RawValue::Map(value)
    }
}

/// Generic textual rendering, used whenever a value lands in a text column
impl Display for RawValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Int(int) => write!(f, "{int}"),
            RawValue::UInt(uint) => write!(f, "{uint}"),
            RawValue::Float(float) => write!(f, "{float}"),
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Text(text) => f.write_str(text),
            RawValue::Time(time) => {
                f.write_str(&time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            RawValue::Map(map) => {
                let json = serde_json::to_string(map).map_err(|_| std::fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}
