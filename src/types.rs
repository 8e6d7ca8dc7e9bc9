use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

/// Values read from a cursor column or bound as a statement parameter.
///
/// Every driver speaks this one enum so row mappers never branch on driver
/// types:
/// ```rust
/// use scoped_sql::prelude::*;
///
/// let params: Vec<Value> = vec![1_i64.into(), "alice".into(), Value::Null];
/// assert!(params[2].is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Calendar date without time zone
    Date(NaiveDate),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
    /// SQL NULL
    Null,
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

impl Value {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Read the value as an integer. Finite floats are truncated toward zero.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            #[allow(clippy::cast_possible_truncation)]
            Value::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            Value::Bool(flag) => Some(i64::from(*flag)),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::Int(1) => Some(true),
            Value::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Read the value as a calendar date.
    ///
    /// Timestamps are truncated to their date; text is accepted in ISO date or
    /// timestamp form since `SQLite` stores both as text.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(date) => Some(*date),
            Value::Timestamp(ts) => Some(ts.date()),
            Value::Text(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .or_else(|| parse_timestamp(s).map(|ts| ts.date())),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::Date(date) => date.and_hms_opt(0, 0, 0),
            Value::Text(s) => parse_timestamp(s).or_else(|| {
                NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            }),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Short name of the variant, used in conversion error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bool(_) => "boolean",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
            Value::Blob(_) => "blob",
            Value::Null => "null",
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Value::Json(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_dates_stored_as_text() {
        let expected = NaiveDate::from_ymd_opt(2017, 7, 27).unwrap();
        assert_eq!(Value::Text("2017-07-27".into()).as_date(), Some(expected));
        assert_eq!(
            Value::Text("2017-07-27 10:30:00".into()).as_date(),
            Some(expected)
        );
        assert_eq!(Value::Text("yesterday".into()).as_date(), None);
    }

    #[test]
    fn optional_none_becomes_null() {
        let absent: Option<&str> = None;
        assert!(Value::from(absent).is_null());
        assert_eq!(Value::from(Some(3_i32)), Value::Int(3));
    }

    #[test]
    fn finite_floats_truncate_to_integers() {
        assert_eq!(Value::Float(3.9).as_int(), Some(3));
        assert_eq!(Value::Float(-3.9).as_int(), Some(-3));
        assert_eq!(Value::Float(f64::INFINITY).as_int(), None);
    }

    #[test]
    fn integers_double_as_booleans() {
        assert_eq!(Value::Int(1).as_bool(), Some(true));
        assert_eq!(Value::Int(0).as_bool(), Some(false));
        assert_eq!(Value::Int(2).as_bool(), None);
    }
}
