use rusqlite::types::Value as SqliteValue;

use crate::types::Value;

/// Text form used for dates bound to `SQLite`, which has no native date type.
pub(crate) const DATE_BIND_FORMAT: &str = "%F";
pub(crate) const TIMESTAMP_BIND_FORMAT: &str = "%F %T%.f";

/// Convert a crate value into the value `SQLite` stores.
#[must_use]
pub fn to_sqlite_value(value: Value) -> SqliteValue {
    match value {
        Value::Int(i) => SqliteValue::Integer(i),
        Value::Float(f) => SqliteValue::Real(f),
        Value::Text(s) => SqliteValue::Text(s),
        Value::Bool(b) => SqliteValue::Integer(i64::from(b)),
        Value::Date(date) => SqliteValue::Text(date.format(DATE_BIND_FORMAT).to_string()),
        Value::Timestamp(ts) => SqliteValue::Text(ts.format(TIMESTAMP_BIND_FORMAT).to_string()),
        Value::Json(json) => SqliteValue::Text(json.to_string()),
        Value::Blob(bytes) => SqliteValue::Blob(bytes),
        Value::Null => SqliteValue::Null,
    }
}

/// Convert a stored `SQLite` value back. Typed readers on the cursor take it
/// from there (dates come back as text and are parsed on access).
#[must_use]
pub fn from_sqlite_value(value: SqliteValue) -> Value {
    match value {
        SqliteValue::Null => Value::Null,
        SqliteValue::Integer(i) => Value::Int(i),
        SqliteValue::Real(f) => Value::Float(f),
        SqliteValue::Text(s) => Value::Text(s),
        SqliteValue::Blob(b) => Value::Blob(b),
    }
}
