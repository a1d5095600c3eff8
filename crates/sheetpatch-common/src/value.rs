use std::fmt::{self, Display};

use serde_json::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Typed content written into a single cell.
///
/// This is deliberately narrower than an interpreter value: a cell holds
/// text, a double, a boolean, or nothing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Blank,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl CellContent {
    pub fn is_blank(&self) -> bool {
        matches!(self, CellContent::Blank)
    }
}

impl Display for CellContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellContent::Blank => Ok(()),
            CellContent::Text(s) => write!(f, "{s}"),
            CellContent::Number(n) => write!(f, "{n}"),
            CellContent::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Map an untyped input value onto cell content.
///
/// | input          | content                         |
/// |----------------|---------------------------------|
/// | `null`         | `Blank`                         |
/// | string         | `Text`, verbatim                |
/// | number         | `Number`                        |
/// | bool           | `Boolean`                       |
/// | array / object | `Text` of its JSON form         |
///
/// Never fails. Numbers are stored as `f64`, so integers with magnitude above
/// 2^53 may not survive exactly.
pub fn coerce(value: &Value) -> CellContent {
    match value {
        Value::Null => CellContent::Blank,
        Value::String(s) => CellContent::Text(s.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) => CellContent::Number(f),
            None => CellContent::Text(n.to_string()),
        },
        Value::Bool(b) => CellContent::Boolean(*b),
        other @ (Value::Array(_) | Value::Object(_)) => CellContent::Text(other.to_string()),
    }
}

impl From<&Value> for CellContent {
    fn from(value: &Value) -> Self {
        coerce(value)
    }
}

impl From<Value> for CellContent {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => CellContent::Text(s),
            other => coerce(&other),
        }
    }
}

impl From<f64> for CellContent {
    fn from(value: f64) -> Self {
        CellContent::Number(value)
    }
}

impl From<i64> for CellContent {
    fn from(value: i64) -> Self {
        CellContent::Number(value as f64)
    }
}

impl From<i32> for CellContent {
    fn from(value: i32) -> Self {
        CellContent::Number(value as f64)
    }
}

impl From<bool> for CellContent {
    fn from(value: bool) -> Self {
        CellContent::Boolean(value)
    }
}

impl From<String> for CellContent {
    fn from(value: String) -> Self {
        CellContent::Text(value)
    }
}

impl<'a> From<&'a str> for CellContent {
    fn from(value: &'a str) -> Self {
        CellContent::Text(value.to_string())
    }
}

impl<T: Into<CellContent>> From<Option<T>> for CellContent {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellContent::Blank, Into::into)
    }
}
