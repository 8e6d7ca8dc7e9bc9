// Connection module - scoped ownership of one borrowed connection
//
// - prepared: positional parameter binding and update/query execution
// - plain: fixed statements (DDL and other parameterless commands)

pub mod plain;
pub mod prepared;

use std::fmt;

use tracing::{debug, warn};

use crate::driver::RawConnection;
use crate::error::DataAccessError;
use crate::translation::translate_placeholders;

pub use plain::PlainStatement;
pub use prepared::StatementBuilder;

/// Exclusive owner of one borrowed connection for the length of one call.
///
/// The connection is closed exactly once: explicitly through
/// [`ScopedConnection::release`], or on drop if the scope is left any other
/// way (including a panic in caller code).
pub struct ScopedConnection<C>
where
    C: RawConnection,
{
    conn: Option<C>,
    translate_placeholders: bool,
}

impl<C> fmt::Debug for ScopedConnection<C>
where
    C: RawConnection,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedConnection")
            .field("open", &self.conn.is_some())
            .field("translate_placeholders", &self.translate_placeholders)
            .finish()
    }
}

impl<C> ScopedConnection<C>
where
    C: RawConnection,
{
    #[must_use]
    pub fn new(conn: C, translate_placeholders: bool) -> Self {
        Self {
            conn: Some(conn),
            translate_placeholders,
        }
    }

    /// Borrow the underlying driver connection.
    ///
    /// # Errors
    /// Returns [`DataAccessError::ConnectionReleased`] once the connection is gone.
    pub fn raw(&self) -> Result<&C, DataAccessError> {
        self.conn.as_ref().ok_or(DataAccessError::ConnectionReleased)
    }

    /// Prepare a parameterized statement.
    ///
    /// # Errors
    /// Returns a driver error when the statement cannot be prepared.
    pub fn prepare_statement(&self, sql: &str) -> Result<StatementBuilder<'_>, DataAccessError> {
        let conn = self.raw()?;
        let sql = translate_placeholders(sql, conn.placeholder_style(), self.translate_placeholders);
        debug!(sql = %sql, "preparing statement");
        let handle = conn.prepare(&sql)?;
        Ok(StatementBuilder::new(handle))
    }

    /// Create a fixed statement for `sql` (DDL and other parameterless commands).
    ///
    /// # Errors
    /// Returns a driver error when the statement cannot be created.
    pub fn statement(&self, sql: &str) -> Result<PlainStatement<'_>, DataAccessError> {
        let handle = self.raw()?.create_plain_statement()?;
        Ok(PlainStatement::new(handle, sql.to_string()))
    }

    /// Close the connection now, reporting any failure.
    ///
    /// # Errors
    /// Returns a driver error when the connection cannot be closed cleanly.
    pub fn release(mut self) -> Result<(), DataAccessError> {
        match self.conn.take() {
            Some(conn) => {
                debug!("releasing connection");
                conn.close()
            }
            None => Ok(()),
        }
    }
}

impl<C> Drop for ScopedConnection<C>
where
    C: RawConnection,
{
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take()
            && let Err(err) = conn.close()
        {
            warn!(error = %err, "failed to close connection on drop");
        }
    }
}
