//! Narrow interface consumed from the underlying database driver.
//!
//! Pooling, wire protocols and connection policy live behind these traits.
//! The rest of the crate only ever acquires a connection, prepares or runs a
//! statement, binds positional parameters and walks a forward-only cursor.

use crate::error::DataAccessError;
use crate::translation::PlaceholderStyle;
use crate::types::Value;

/// Source of borrowed connections, usually a pool.
pub trait DataSource {
    type Connection: RawConnection;

    /// Borrow one connection.
    ///
    /// # Errors
    /// Returns [`DataAccessError::ConnectionError`] when no connection can be obtained.
    fn acquire(&self) -> Result<Self::Connection, DataAccessError>;

    /// Whether statement text should be rewritten to the connection's
    /// native placeholder style before it is prepared.
    fn translate_placeholders(&self) -> bool {
        false
    }
}

/// One physical connection, exclusively owned while borrowed.
pub trait RawConnection {
    /// Prepare a parameterized statement.
    ///
    /// # Errors
    /// Returns a driver error when the statement text cannot be prepared.
    fn prepare<'c>(&'c self, sql: &str)
    -> Result<Box<dyn PreparedHandle<'c> + 'c>, DataAccessError>;

    /// Create a statement that runs fixed SQL text without parameters.
    ///
    /// # Errors
    /// Returns a driver error when the statement cannot be created.
    fn create_plain_statement<'c>(
        &'c self,
    ) -> Result<Box<dyn PlainStatementHandle + 'c>, DataAccessError>;

    /// Statement text that reads the next value of `sequence`.
    ///
    /// `sequence` has already been validated as a plain identifier.
    fn next_value_sql(&self, sequence: &str) -> String {
        format!("select nextval('{sequence}')")
    }

    /// Placeholder style the driver understands natively.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }

    /// Give the connection back to its source.
    ///
    /// # Errors
    /// Returns a driver error when the connection cannot be closed cleanly.
    fn close(self) -> Result<(), DataAccessError>;
}

/// A prepared statement awaiting positional parameters.
///
/// `'c` is the lifetime of the connection the statement was prepared on.
pub trait PreparedHandle<'c> {
    /// Bind `value` at the 1-based `index`.
    ///
    /// # Errors
    /// Returns a driver error when the position or value is rejected.
    fn bind_positional(&mut self, index: usize, value: Value) -> Result<(), DataAccessError>;

    /// Run the statement for its side effect and release it.
    ///
    /// # Errors
    /// Returns a driver error when execution fails.
    fn execute_update(self: Box<Self>) -> Result<usize, DataAccessError>;

    /// Run the statement and hand over its result as a raw cursor.
    ///
    /// The cursor owns whatever statement resources it still needs.
    ///
    /// # Errors
    /// Returns a driver error when execution fails.
    fn execute_query(self: Box<Self>) -> Result<Box<dyn RawCursor + 'c>, DataAccessError>;
}

/// A statement for fixed SQL text (DDL, batch commands).
pub trait PlainStatementHandle {
    /// # Errors
    /// Returns a driver error when execution fails.
    fn execute(self: Box<Self>, sql: &str) -> Result<(), DataAccessError>;
}

/// Forward-only, single pass view over a query result.
pub trait RawCursor {
    /// Move to the next row, returning `false` once exhausted.
    ///
    /// # Errors
    /// Returns a driver error when the next row cannot be fetched.
    fn advance(&mut self) -> Result<bool, DataAccessError>;

    /// Read the 1-based column `index` of the current row. SQL NULL is [`Value::Null`].
    ///
    /// # Errors
    /// Returns a driver error when there is no current row or the index is out of range.
    fn read_column(&self, index: usize) -> Result<Value, DataAccessError>;

    /// Number of columns in each row.
    fn column_count(&self) -> usize;
}
