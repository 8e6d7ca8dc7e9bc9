use crate::driver::PlainStatementHandle;
use crate::error::DataAccessError;

/// A fixed, parameterless statement such as DDL.
pub struct PlainStatement<'c> {
    handle: Box<dyn PlainStatementHandle + 'c>,
    sql: String,
}

impl std::fmt::Debug for PlainStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainStatement")
            .field("sql", &self.sql)
            .finish_non_exhaustive()
    }
}

impl<'c> PlainStatement<'c> {
    pub(crate) fn new(handle: Box<dyn PlainStatementHandle + 'c>, sql: String) -> Self {
        Self { handle, sql }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Run the statement text and release the statement.
    ///
    /// # Errors
    /// Returns a driver error when execution fails.
    pub fn execute(self) -> Result<(), DataAccessError> {
        self.handle.execute(&self.sql)
    }
}
