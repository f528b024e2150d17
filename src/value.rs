//! Typed values and the coercion of literal tokens and `$n` placeholders.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::{TranslationError, TranslationResult};

/// A value stored in a document, bound as a parameter, or returned in a row.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    /// Identifier minted by `gen_random_uuid()` or by the store on insert.
    GeneratedId(Uuid),
}

impl TypedValue {
    /// Timestamp captured at the moment of the call.
    pub fn now() -> Self {
        TypedValue::Timestamp(Utc::now())
    }

    /// A fresh lowercase hyphenated version-4 identifier.
    pub fn generate_id() -> Self {
        TypedValue::GeneratedId(Uuid::new_v4())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            TypedValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Name of the variant, used in error messages and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Bool(_) => "bool",
            TypedValue::Number(_) => "number",
            TypedValue::Text(_) => "text",
            TypedValue::Timestamp(_) => "timestamp",
            TypedValue::GeneratedId(_) => "id",
        }
    }

    /// Ordering between two values of comparable kinds.
    ///
    /// Values of different kinds do not compare, except that a generated id
    /// compares with its text form. `Null` only compares equal to `Null`.
    pub fn compare(&self, other: &TypedValue) -> Option<Ordering> {
        use TypedValue::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Number(a), Number(b)) => a.partial_cmp(b),
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (GeneratedId(a), GeneratedId(b)) => Some(a.cmp(b)),
            (GeneratedId(a), Text(b)) => Some(a.to_string().as_str().cmp(b.as_str())),
            (Text(a), GeneratedId(b)) => Some(a.as_str().cmp(b.to_string().as_str())),
            _ => None,
        }
    }

    /// Equality under [`TypedValue::compare`].
    pub fn matches(&self, other: &TypedValue) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Convert a JSON scalar into a typed value. Arrays and objects have no
    /// counterpart and are rejected.
    pub fn from_json(value: &serde_json::Value) -> Option<TypedValue> {
        match value {
            serde_json::Value::Null => Some(TypedValue::Null),
            serde_json::Value::Bool(b) => Some(TypedValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(TypedValue::Number),
            serde_json::Value::String(s) => Some(TypedValue::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => write!(f, "NULL"),
            TypedValue::Bool(b) => write!(f, "{}", b),
            TypedValue::Number(n) => match as_integer(*n) {
                Some(i) => write!(f, "{}", i),
                None => write!(f, "{}", n),
            },
            TypedValue::Text(s) => write!(f, "{}", s),
            TypedValue::Timestamp(t) => {
                write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            TypedValue::GeneratedId(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TypedValue::Null => serializer.serialize_none(),
            TypedValue::Bool(b) => serializer.serialize_bool(*b),
            TypedValue::Number(n) => match as_integer(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            TypedValue::Text(s) => serializer.serialize_str(s),
            TypedValue::Timestamp(_) | TypedValue::GeneratedId(_) => {
                serializer.collect_str(self)
            }
        }
    }
}

/// Integral numbers inside the exactly-representable range print without a fraction.
fn as_integer(n: f64) -> Option<i64> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        Some(n as i64)
    } else {
        None
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Bool(v)
    }
}

impl From<i32> for TypedValue {
    fn from(v: i32) -> Self {
        TypedValue::Number(v as f64)
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Number(v as f64)
    }
}

impl From<u32> for TypedValue {
    fn from(v: u32) -> Self {
        TypedValue::Number(v as f64)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Number(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::Text(v.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::Text(v)
    }
}

impl From<DateTime<Utc>> for TypedValue {
    fn from(v: DateTime<Utc>) -> Self {
        TypedValue::Timestamp(v)
    }
}

impl From<Uuid> for TypedValue {
    fn from(v: Uuid) -> Self {
        TypedValue::GeneratedId(v)
    }
}

impl<T: Into<TypedValue>> From<Option<T>> for TypedValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(TypedValue::Null)
    }
}

/// Where a value in a statement comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// Fixed when the statement was parsed.
    Literal(TypedValue),
    /// 1-based reference into the caller's parameter list.
    Param(u32),
}

impl ValueSource {
    /// Resolve against the caller-supplied parameters.
    pub fn resolve(&self, params: &[TypedValue]) -> TranslationResult<TypedValue> {
        match self {
            ValueSource::Literal(v) => Ok(v.clone()),
            ValueSource::Param(index) => {
                let slot = (*index as usize).checked_sub(1);
                slot.and_then(|i| params.get(i))
                    .cloned()
                    .ok_or(TranslationError::ParamOutOfRange {
                        index: *index,
                        supplied: params.len(),
                    })
            }
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Literal(TypedValue::Text(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            ValueSource::Literal(v) => write!(f, "{}", v),
            ValueSource::Param(n) => write!(f, "${}", n),
        }
    }
}

/// Special tokens recognized in value position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `NOW()`, `CURRENT_TIMESTAMP`
    CurrentTimestamp,
    /// `gen_random_uuid()`, `uuid_generate_v4()`
    GenerateId,
}

impl Marker {
    /// Match a bare function-like token, case-insensitively.
    pub fn from_name(name: &str) -> Option<Marker> {
        match name.to_ascii_lowercase().as_str() {
            "now" | "current_timestamp" => Some(Marker::CurrentTimestamp),
            "gen_random_uuid" | "uuid_generate_v4" => Some(Marker::GenerateId),
            _ => None,
        }
    }

    /// Materialize the marker into a literal.
    pub fn resolve(self) -> ValueSource {
        match self {
            Marker::CurrentTimestamp => ValueSource::Literal(TypedValue::now()),
            Marker::GenerateId => ValueSource::Literal(TypedValue::generate_id()),
        }
    }
}
