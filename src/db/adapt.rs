//! Conversion between [`Value`] and SQLite storage classes.
//!
//! Writes are driven by the value's own variant. Reads are driven by the
//! column's declared type, since SQLite only reports a storage class.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::query::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeclaredKind {
    Timestamp,
    Uuid,
    Boolean,
    Plain,
}

impl DeclaredKind {
    fn of(declared_type: &str) -> Self {
        let head = declared_type
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default();
        if head.eq_ignore_ascii_case("timestamp") || head.eq_ignore_ascii_case("datetime") {
            DeclaredKind::Timestamp
        } else if head.eq_ignore_ascii_case("uuid") {
            DeclaredKind::Uuid
        } else if head.eq_ignore_ascii_case("boolean") || head.eq_ignore_ascii_case("bool") {
            DeclaredKind::Boolean
        } else {
            DeclaredKind::Plain
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
            Value::DateTime(nanos) => {
                let text = OffsetDateTime::from_unix_timestamp_nanos(*nanos)
                    .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?
                    .format(&Rfc3339)
                    .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
                ToSqlOutput::Owned(SqlValue::Text(text))
            }
            Value::Uuid(id) => ToSqlOutput::Owned(SqlValue::Blob(id.as_bytes().to_vec())),
        };
        Ok(out)
    }
}

/// Converts a raw SQLite value read from a column declared as `declared_type`.
pub(crate) fn value_from_sql(raw: ValueRef<'_>, declared_type: &str) -> Value {
    let kind = DeclaredKind::of(declared_type);
    match raw {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if kind == DeclaredKind::Boolean && (i == 0 || i == 1) => {
            Value::Bool(i == 1)
        }
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if kind == DeclaredKind::Timestamp {
                if let Some(nanos) = parse_timestamp(&text) {
                    return Value::DateTime(nanos);
                }
            }
            Value::String(text)
        }
        ValueRef::Blob(bytes) => match Uuid::from_slice(bytes) {
            Ok(id) if kind == DeclaredKind::Uuid => Value::Uuid(id),
            _ => Value::Bytes(bytes.to_vec()),
        },
    }
}

/// Accepts RFC 3339 as written by [`ToSql`], plus the offset-less forms
/// SQLite's own `CURRENT_TIMESTAMP` and `datetime()` produce (read as UTC).
fn parse_timestamp(text: &str) -> Option<i128> {
    if let Ok(dt) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(dt.unix_timestamp_nanos());
    }
    let spaced = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let tee = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(text, &spaced)
        .or_else(|_| PrimitiveDateTime::parse(text, &tee))
        .ok()
        .map(|dt| dt.assume_utc().unix_timestamp_nanos())
}
