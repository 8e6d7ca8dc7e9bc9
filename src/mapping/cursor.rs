use std::fmt;
use std::hash::Hash;

use chrono::{NaiveDate, NaiveDateTime};

use crate::driver::RawCursor;
use crate::error::DataAccessError;
use crate::types::Value;

use super::key_value::KeyValue;
use super::one_to_many::OneToMany;

/// Forward-only, single pass view over a query result.
///
/// Column indexes are 1-based. Two accessor families coexist:
///
/// * `get_int` and `get_string` return `0` and `""` when the column is NULL.
///   NULL does not survive a round trip through them.
/// * the `get_optional_*` accessors return `None` for NULL and are the only
///   ones that preserve it.
///
/// `get_float`, `get_bool`, `get_date` and `get_timestamp` have no zero value
/// to fall back on: NULL is a [`DataAccessError::ConversionError`] pointing at
/// the optional accessor. Every accessor fails with a [`DataAccessError`] when
/// the driver cannot read the column or the stored value has an incompatible
/// type.
pub struct Cursor<'c> {
    raw: Box<dyn RawCursor + 'c>,
    on_row: bool,
    exhausted: bool,
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("columns", &self.raw.column_count())
            .field("on_row", &self.on_row)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl<'c> Cursor<'c> {
    #[must_use]
    pub fn new(raw: Box<dyn RawCursor + 'c>) -> Self {
        Self {
            raw,
            on_row: false,
            exhausted: false,
        }
    }

    /// Advance to the next row. Once `false` is returned the cursor stays exhausted.
    ///
    /// # Errors
    /// Returns a driver error when the next row cannot be fetched.
    pub fn next_row(&mut self) -> Result<bool, DataAccessError> {
        if self.exhausted {
            return Ok(false);
        }
        self.on_row = false;
        let advanced = self.raw.advance()?;
        self.on_row = advanced;
        self.exhausted = !advanced;
        Ok(advanced)
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.raw.column_count()
    }

    /// Raw value of column `index` on the current row.
    ///
    /// # Errors
    /// Returns [`DataAccessError::NoCurrentRow`] when the cursor is not on a
    /// row, or a driver error when the column cannot be read.
    pub fn get_value(&self, index: usize) -> Result<Value, DataAccessError> {
        if !self.on_row {
            return Err(DataAccessError::NoCurrentRow);
        }
        self.raw.read_column(index)
    }

    /// Finite floats are truncated toward zero, the way `avg(..)` results are
    /// usually read back as whole numbers.
    ///
    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is not an integer.
    pub fn get_int(&self, index: usize) -> Result<i64, DataAccessError> {
        Ok(self.get_optional_int(index)?.unwrap_or_default())
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is not text.
    pub fn get_string(&self, index: usize) -> Result<String, DataAccessError> {
        Ok(self.get_optional_string(index)?.unwrap_or_default())
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is NULL or not numeric.
    pub fn get_float(&self, index: usize) -> Result<f64, DataAccessError> {
        let value = self.read_optional(index, "float", Value::as_float)?;
        value.ok_or_else(|| null_column(index, "get_optional_float"))
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is NULL or not a boolean.
    pub fn get_bool(&self, index: usize) -> Result<bool, DataAccessError> {
        let value = self.read_optional(index, "boolean", Value::as_bool)?;
        value.ok_or_else(|| null_column(index, "get_optional_bool"))
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is NULL or not a date.
    pub fn get_date(&self, index: usize) -> Result<NaiveDate, DataAccessError> {
        self.get_optional_local_date(index)?
            .ok_or_else(|| null_column(index, "get_optional_local_date"))
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is NULL or not a timestamp.
    pub fn get_timestamp(&self, index: usize) -> Result<NaiveDateTime, DataAccessError> {
        self.get_optional_timestamp(index)?
            .ok_or_else(|| null_column(index, "get_optional_timestamp"))
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is not an integer.
    pub fn get_optional_int(&self, index: usize) -> Result<Option<i64>, DataAccessError> {
        self.read_optional(index, "integer", Value::as_int)
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is not numeric.
    pub fn get_optional_float(&self, index: usize) -> Result<Option<f64>, DataAccessError> {
        self.read_optional(index, "float", Value::as_float)
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is not a boolean.
    pub fn get_optional_bool(&self, index: usize) -> Result<Option<bool>, DataAccessError> {
        self.read_optional(index, "boolean", Value::as_bool)
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is not text.
    pub fn get_optional_string(&self, index: usize) -> Result<Option<String>, DataAccessError> {
        match self.get_value(index)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s)),
            Value::Json(json) => Ok(Some(json.to_string())),
            Value::Int(i) => Ok(Some(i.to_string())),
            Value::Float(f) => Ok(Some(f.to_string())),
            other => Err(mismatch(index, "text", &other)),
        }
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is not a date.
    pub fn get_optional_local_date(
        &self,
        index: usize,
    ) -> Result<Option<NaiveDate>, DataAccessError> {
        self.read_optional(index, "date", Value::as_date)
    }

    /// # Errors
    /// See [`Cursor::get_value`]; also fails when the value is not a timestamp.
    pub fn get_optional_timestamp(
        &self,
        index: usize,
    ) -> Result<Option<NaiveDateTime>, DataAccessError> {
        self.read_optional(index, "timestamp", Value::as_timestamp)
    }

    fn read_optional<T>(
        &self,
        index: usize,
        expected: &str,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<Option<T>, DataAccessError> {
        let value = self.get_value(index)?;
        if value.is_null() {
            return Ok(None);
        }
        convert(&value)
            .map(Some)
            .ok_or_else(|| mismatch(index, expected, &value))
    }

    /// Advance once and map the row if there is one.
    ///
    /// # Errors
    /// Propagates driver failures and any error returned by `mapper`.
    pub fn map_one<T, F>(&mut self, mapper: F) -> Result<Option<T>, DataAccessError>
    where
        F: FnOnce(&Cursor<'c>) -> Result<T, DataAccessError>,
    {
        if self.next_row()? {
            mapper(&*self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Map every remaining row, in row order.
    ///
    /// # Errors
    /// Propagates driver failures and the first error returned by `mapper`.
    pub fn map_all<T, F>(mut self, mut mapper: F) -> Result<Vec<T>, DataAccessError>
    where
        F: FnMut(&Cursor<'c>) -> Result<T, DataAccessError>,
    {
        let mut mapped = Vec::new();
        while self.next_row()? {
            mapped.push(mapper(&self)?);
        }
        Ok(mapped)
    }

    /// Flatten a one-to-many join result into parent groups.
    ///
    /// `mapper` turns each row into a parent key and an optional child. It is
    /// responsible for spotting a left join row without a match (typically a
    /// NULL child key column) and returning `None` for the child; the parent
    /// is then kept with an empty list of children.
    ///
    /// # Errors
    /// Propagates driver failures and the first error returned by `mapper`.
    pub fn normalize_one_to_many<K, V, F>(
        mut self,
        mut mapper: F,
    ) -> Result<OneToMany<K, V>, DataAccessError>
    where
        K: Eq + Hash,
        F: FnMut(&Cursor<'c>) -> Result<KeyValue<K, Option<V>>, DataAccessError>,
    {
        let mut one_to_many = OneToMany::new();
        while self.next_row()? {
            one_to_many.put(mapper(&self)?);
        }
        Ok(one_to_many)
    }
}

fn mismatch(index: usize, expected: &str, found: &Value) -> DataAccessError {
    DataAccessError::ConversionError {
        index,
        message: format!("expected {expected}, found {}", found.type_name()),
    }
}

fn null_column(index: usize, optional_accessor: &str) -> DataAccessError {
    DataAccessError::ConversionError {
        index,
        message: format!("NULL; use {optional_accessor}"),
    }
}
