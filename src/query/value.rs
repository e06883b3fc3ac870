//! Canonical scalar value held in entity columns and bound into statements.
use base64::Engine;
use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Scalar column value.
///
/// Serializes to the same plain JSON as [`Value::to_json`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absent value; SQL `NULL`.
    #[default]
    Null,
    /// Boolean, stored by SQLite as `0`/`1`.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 text.
    String(String),
    /// Arbitrary binary payload.
    Bytes(Vec<u8>),
    /// Nanoseconds since Unix epoch in UTC.
    DateTime(i128),
    /// UUID, stored as a 16-byte blob.
    Uuid(Uuid),
}

impl Value {
    /// Current wall-clock time as a [`Value::DateTime`].
    pub fn now() -> Self {
        Value::DateTime(OffsetDateTime::now_utc().unix_timestamp_nanos())
    }

    /// Strict null test; `0`, `""` and `false` are values, not absences.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer payload, if this is an [`Value::Int`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload, if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Datetime payload converted to an [`OffsetDateTime`].
    pub fn as_datetime(&self) -> Option<OffsetDateTime> {
        match self {
            Value::DateTime(nanos) => OffsetDateTime::from_unix_timestamp_nanos(*nanos).ok(),
            _ => None,
        }
    }

    /// Renders the value as plain JSON: bytes become base64, datetimes
    /// RFC 3339, UUIDs hyphenated.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => {
                Json::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Value::DateTime(_) => match self.as_datetime().and_then(|dt| dt.format(&Rfc3339).ok())
            {
                Some(text) => Json::String(text),
                None => Json::Null,
            },
            Value::Uuid(id) => Json::String(id.hyphenated().to_string()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Value::DateTime(value.unix_timestamp_nanos())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
