//! Untyped answer trees
//!
//! Reference and candidate answers are both coerced into a [`ComparisonValue`]
//! before grading. JSON text becomes a structured tree; anything else is kept
//! as a bare [`ComparisonValue::Text`] leaf.

use std::fmt;

use indexmap::IndexMap;

/// Mapping storage. Key order is kept for display only; comparison ignores it.
pub type Mapping = IndexMap<String, ComparisonValue>;

// =============================================================================
// ComparisonValue
// =============================================================================

/// A reference or candidate answer in comparable form
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Mapping(Mapping),
    Sequence(Vec<ComparisonValue>),
}

/// Shape tag of a [`ComparisonValue`], used for the strict shape check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    Text,
    Mapping,
    Sequence,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::Text => "text",
            ValueKind::Mapping => "mapping",
            ValueKind::Sequence => "sequence",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ComparisonValue {
    /// Coerce a raw answer into a comparable value.
    ///
    /// The text is trimmed and parsed as JSON; when that fails the trimmed
    /// text becomes a `Text` leaf. Never fails.
    ///
    /// ```
    /// use grader::ComparisonValue;
    ///
    /// assert_eq!(ComparisonValue::parse(" 42 "), ComparisonValue::Number(42.0));
    /// assert_eq!(
    ///     ComparisonValue::parse("Paris"),
    ///     ComparisonValue::Text("Paris".to_string())
    /// );
    /// ```
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(json) => Self::from(json),
            Err(_) => ComparisonValue::Text(trimmed.to_string()),
        }
    }

    /// Parse strictly as JSON, without the bare-text fallback
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<serde_json::Value>(raw.trim()).map(Self::from)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ComparisonValue::Null => ValueKind::Null,
            ComparisonValue::Bool(_) => ValueKind::Bool,
            ComparisonValue::Number(_) => ValueKind::Number,
            ComparisonValue::Text(_) => ValueKind::Text,
            ComparisonValue::Mapping(_) => ValueKind::Mapping,
            ComparisonValue::Sequence(_) => ValueKind::Sequence,
        }
    }

    /// True for mappings and sequences
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            ComparisonValue::Mapping(_) | ComparisonValue::Sequence(_)
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ComparisonValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ComparisonValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            ComparisonValue::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ComparisonValue]> {
        match self {
            ComparisonValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Convert back to JSON, e.g. for pretty-printing a graded answer.
    ///
    /// Non-finite numbers have no JSON form and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ComparisonValue::Null => serde_json::Value::Null,
            ComparisonValue::Bool(b) => serde_json::Value::Bool(*b),
            ComparisonValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ComparisonValue::Text(s) => serde_json::Value::String(s.clone()),
            ComparisonValue::Mapping(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            ComparisonValue::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(ComparisonValue::to_json).collect())
            }
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<serde_json::Value> for ComparisonValue {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => ComparisonValue::Null,
            serde_json::Value::Bool(b) => ComparisonValue::Bool(b),
            // Integers and floats share one numeric shape
            serde_json::Value::Number(n) => ComparisonValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => ComparisonValue::Text(s),
            serde_json::Value::Array(arr) => {
                ComparisonValue::Sequence(arr.into_iter().map(ComparisonValue::from).collect())
            }
            serde_json::Value::Object(obj) => ComparisonValue::Mapping(
                obj.into_iter()
                    .map(|(k, v)| (k, ComparisonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for ComparisonValue {
    fn from(b: bool) -> Self {
        ComparisonValue::Bool(b)
    }
}

impl From<f64> for ComparisonValue {
    fn from(n: f64) -> Self {
        ComparisonValue::Number(n)
    }
}

impl From<i64> for ComparisonValue {
    fn from(n: i64) -> Self {
        ComparisonValue::Number(n as f64)
    }
}

impl From<&str> for ComparisonValue {
    fn from(s: &str) -> Self {
        ComparisonValue::Text(s.to_string())
    }
}

impl From<String> for ComparisonValue {
    fn from(s: String) -> Self {
        ComparisonValue::Text(s)
    }
}

impl From<Vec<ComparisonValue>> for ComparisonValue {
    fn from(items: Vec<ComparisonValue>) -> Self {
        ComparisonValue::Sequence(items)
    }
}

impl From<Mapping> for ComparisonValue {
    fn from(map: Mapping) -> Self {
        ComparisonValue::Mapping(map)
    }
}

impl fmt::Display for ComparisonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Bare text prints as-is, without JSON quoting
            ComparisonValue::Text(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}
