use std::collections::VecDeque;

use rusqlite::Statement;
use rusqlite::types::Value as SqliteValue;

use crate::driver::RawCursor;
use crate::error::DataAccessError;
use crate::types::Value;

use super::params::from_sqlite_value;

/// Rows of one `SQLite` query, read eagerly so the statement can be finalized
/// before the cursor is handed out.
#[derive(Debug, Clone, Default)]
pub struct BufferedCursor {
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    columns: usize,
}

impl RawCursor for BufferedCursor {
    fn advance(&mut self) -> Result<bool, DataAccessError> {
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn read_column(&self, index: usize) -> Result<Value, DataAccessError> {
        let row = self
            .current
            .as_ref()
            .ok_or(DataAccessError::NoCurrentRow)?;
        index
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .cloned()
            .ok_or_else(|| {
                DataAccessError::driver(format!(
                    "column index {index} out of range (query has {} columns)",
                    self.columns
                ))
            })
    }

    fn column_count(&self) -> usize {
        self.columns
    }
}

/// Run an already bound statement and read every row.
///
/// # Errors
/// Returns `DataAccessError::DriverError` if stepping the statement or
/// reading a column fails.
pub fn build_buffered_cursor(stmt: &mut Statement<'_>) -> Result<BufferedCursor, DataAccessError> {
    let columns = stmt.column_count();
    let mut rows_iter = stmt.raw_query();
    let mut rows = VecDeque::new();

    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(columns);
        for i in 0..columns {
            let value: SqliteValue = row.get(i)?;
            values.push(from_sqlite_value(value));
        }
        rows.push_back(values);
    }

    Ok(BufferedCursor {
        rows,
        current: None,
        columns,
    })
}
