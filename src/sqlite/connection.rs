use std::fmt;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Statement;
use tracing::{error, warn};

use crate::driver::{PlainStatementHandle, PreparedHandle, RawConnection, RawCursor};
use crate::error::DataAccessError;
use crate::translation::PlaceholderStyle;
use crate::types::Value;

use super::params::to_sqlite_value;
use super::query::build_buffered_cursor;

pub(crate) type SqlitePooledConnection = PooledConnection<SqliteConnectionManager>;

/// Connection wrapper backed by an r2d2 pooled `SQLite` connection.
pub struct SqliteConnection {
    conn: SqlitePooledConnection,
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("autocommit", &self.conn.is_autocommit())
            .finish()
    }
}

impl SqliteConnection {
    pub(crate) fn new(conn: SqlitePooledConnection) -> Self {
        Self { conn }
    }

    /// Borrow the rusqlite connection for driver-specific work.
    #[must_use]
    pub fn as_rusqlite(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl RawConnection for SqliteConnection {
    fn prepare<'c>(
        &'c self,
        sql: &str,
    ) -> Result<Box<dyn PreparedHandle<'c> + 'c>, DataAccessError> {
        let stmt = self.conn.prepare(sql)?;
        Ok(Box::new(SqlitePrepared { stmt }))
    }

    fn create_plain_statement<'c>(
        &'c self,
    ) -> Result<Box<dyn PlainStatementHandle + 'c>, DataAccessError> {
        Ok(Box::new(SqlitePlain { conn: &self.conn }))
    }

    /// `SQLite` has no sequences; each one is a single-row table advanced
    /// with `UPDATE ... RETURNING` (see [`create_sequence_sql`](super::create_sequence_sql)).
    fn next_value_sql(&self, sequence: &str) -> String {
        format!(
            "UPDATE \"{sequence}\" SET next_value = next_value + 1 RETURNING next_value - 1"
        )
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }

    /// Hand the connection back to the pool. A transaction left open by
    /// caller code is rolled back first so the next borrower starts clean.
    fn close(self) -> Result<(), DataAccessError> {
        if !self.conn.is_autocommit() {
            warn!("connection returned with an open transaction; rolling back");
        }
        rollback_open_transaction(&self.conn).inspect_err(|err| {
            error!(error = %err, "rollback on release failed; next checkout retries it");
        })
    }
}

/// Roll back a transaction left open on `conn`, if any.
///
/// r2d2 cannot tell that a pooled `SQLite` connection is mid-transaction, so
/// this runs both when a connection is released and when it is checked out.
pub(crate) fn rollback_open_transaction(
    conn: &rusqlite::Connection,
) -> Result<(), DataAccessError> {
    if !conn.is_autocommit() {
        conn.execute_batch("ROLLBACK")?;
    }
    Ok(())
}

struct SqlitePrepared<'c> {
    stmt: Statement<'c>,
}

impl<'c> PreparedHandle<'c> for SqlitePrepared<'c> {
    fn bind_positional(&mut self, index: usize, value: Value) -> Result<(), DataAccessError> {
        self.stmt.raw_bind_parameter(index, to_sqlite_value(value))?;
        Ok(())
    }

    fn execute_update(self: Box<Self>) -> Result<usize, DataAccessError> {
        let mut stmt = self.stmt;
        Ok(stmt.raw_execute()?)
    }

    fn execute_query(self: Box<Self>) -> Result<Box<dyn RawCursor + 'c>, DataAccessError> {
        let mut stmt = self.stmt;
        let cursor = build_buffered_cursor(&mut stmt)?;
        Ok(Box::new(cursor))
    }
}

struct SqlitePlain<'c> {
    conn: &'c rusqlite::Connection,
}

impl PlainStatementHandle for SqlitePlain<'_> {
    fn execute(self: Box<Self>, sql: &str) -> Result<(), DataAccessError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
