//! Scoped execution: acquire, run caller code, release on every exit path.

use tracing::{debug, warn};

use crate::connection::ScopedConnection;
use crate::driver::{DataSource, RawConnection};
use crate::error::{DataAccessError, Wrapping, translate_with};

/// Runs caller functions against a freshly acquired connection.
///
/// Every call gets its own [`ScopedConnection`]. The connection is released
/// exactly once before the result or error reaches the caller, including
/// when the caller function panics. Failures come back as
/// [`DataAccessError`] unless a [`Wrapping`] strategy says otherwise.
///
/// ```
/// use scoped_sql::prelude::*;
/// use scoped_sql::test_utils::ScriptedDataSource;
///
/// let source = ScriptedDataSource::new().with_sequence("ids", 10);
/// let executor = SqlExecutor::new(source.clone());
/// assert_eq!(executor.next_id("ids")?, 10);
/// assert_eq!(source.calls().closed, 1);
/// # Ok::<(), DataAccessError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SqlExecutor<D>
where
    D: DataSource,
{
    source: D,
}

/// The scoped connection handed to caller functions by [`SqlExecutor`].
pub type Scope<D> = ScopedConnection<<D as DataSource>::Connection>;

impl<D> SqlExecutor<D>
where
    D: DataSource,
{
    #[must_use]
    pub fn new(source: D) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn data_source(&self) -> &D {
        &self.source
    }

    fn acquire(&self) -> Result<Scope<D>, DataAccessError> {
        let conn = self.source.acquire()?;
        debug!("connection acquired");
        Ok(ScopedConnection::new(
            conn,
            self.source.translate_placeholders(),
        ))
    }

    /// Acquire, run `work`, release. A close failure only surfaces when
    /// `work` itself succeeded.
    fn scoped<T, E, F>(&self, work: F) -> Result<T, DataAccessError>
    where
        F: FnOnce(&Scope<D>) -> Result<T, E>,
        E: Into<DataAccessError>,
    {
        let conn = self.acquire()?;
        let outcome = work(&conn).map_err(Into::into);
        let released = conn.release();
        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "closing connection failed after an earlier error");
                Err(err)
            }
        }
    }

    /// Run `query` with a scoped connection and return its result.
    ///
    /// # Errors
    /// Returns the acquisition, driver or caller failure, normalised into
    /// [`DataAccessError`].
    pub fn execute_query<T, E, F>(&self, query: F) -> Result<T, DataAccessError>
    where
        F: FnOnce(&Scope<D>) -> Result<T, E>,
        E: Into<DataAccessError>,
    {
        self.scoped(query)
    }

    /// [`execute_query`](Self::execute_query) with an explicit wrapping strategy.
    ///
    /// # Errors
    /// Returns the normalised failure passed through `wrapping`.
    pub fn execute_query_with<T, E, F, X>(&self, query: F, wrapping: &Wrapping<X>) -> Result<T, X>
    where
        F: FnOnce(&Scope<D>) -> Result<T, E>,
        E: Into<DataAccessError>,
        X: From<DataAccessError>,
    {
        translate_with(self.scoped(query), wrapping)
    }

    /// Run `command` with a scoped connection for its side effects.
    ///
    /// # Errors
    /// Returns the acquisition, driver or caller failure, normalised into
    /// [`DataAccessError`].
    pub fn execute_command<E, F>(&self, command: F) -> Result<(), DataAccessError>
    where
        F: FnOnce(&Scope<D>) -> Result<(), E>,
        E: Into<DataAccessError>,
    {
        self.scoped(command)
    }

    /// # Errors
    /// Returns the normalised failure passed through `wrapping`.
    pub fn execute_command_with<E, F, X>(&self, command: F, wrapping: &Wrapping<X>) -> Result<(), X>
    where
        F: FnOnce(&Scope<D>) -> Result<(), E>,
        E: Into<DataAccessError>,
        X: From<DataAccessError>,
    {
        translate_with(self.scoped(command), wrapping)
    }

    /// Same path as [`execute_command`](Self::execute_command); kept apart so
    /// schema changes read as such at the call site.
    ///
    /// # Errors
    /// Returns the acquisition, driver or caller failure, normalised into
    /// [`DataAccessError`].
    pub fn execute_ddl_command<E, F>(&self, command: F) -> Result<(), DataAccessError>
    where
        F: FnOnce(&Scope<D>) -> Result<(), E>,
        E: Into<DataAccessError>,
    {
        debug!("running schema command");
        self.scoped(command)
    }

    /// # Errors
    /// Returns the normalised failure passed through `wrapping`.
    pub fn execute_ddl_command_with<E, F, X>(
        &self,
        command: F,
        wrapping: &Wrapping<X>,
    ) -> Result<(), X>
    where
        F: FnOnce(&Scope<D>) -> Result<(), E>,
        E: Into<DataAccessError>,
        X: From<DataAccessError>,
    {
        debug!("running schema command");
        translate_with(self.scoped(command), wrapping)
    }

    /// Read the next value of `sequence`.
    ///
    /// # Errors
    /// Returns [`DataAccessError::InvalidSequenceName`] for names outside
    /// `[A-Za-z0-9_.]`, [`DataAccessError::EmptySequence`] when the read
    /// produced no row, or the usual acquisition and driver failures.
    pub fn next_id(&self, sequence: &str) -> Result<i64, DataAccessError> {
        self.next_id_with(sequence, |id| id)
    }

    /// Read the next value of `sequence` and convert it with `convert`.
    ///
    /// The sequence name is spliced into the statement text, so it is
    /// validated before any connection is acquired.
    ///
    /// # Errors
    /// See [`next_id`](Self::next_id).
    pub fn next_id_with<T, F>(&self, sequence: &str, convert: F) -> Result<T, DataAccessError>
    where
        F: FnOnce(i64) -> T,
    {
        validate_sequence_name(sequence)?;
        self.scoped(|conn| {
            let sql = conn.raw()?.next_value_sql(sequence);
            let mut cursor = conn.prepare_statement(&sql)?.execute_query()?;
            let id = cursor
                .map_one(|row| row.get_int(1))?
                .ok_or_else(|| DataAccessError::EmptySequence(sequence.to_string()))?;
            debug!(sequence, id, "sequence advanced");
            Ok::<_, DataAccessError>(convert(id))
        })
    }
}

pub(crate) fn validate_sequence_name(name: &str) -> Result<(), DataAccessError> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.');
    if valid {
        Ok(())
    } else {
        Err(DataAccessError::InvalidSequenceName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::ScriptedDataSource;
    use crate::types::Value;

    #[derive(Debug)]
    struct OrderRejected(String);

    impl From<DataAccessError> for OrderRejected {
        fn from(err: DataAccessError) -> Self {
            OrderRejected(err.to_string())
        }
    }

    fn rejected(err: DataAccessError) -> OrderRejected {
        OrderRejected(format!("rejected: {err}"))
    }

    #[test]
    fn releases_once_after_success() -> Result<(), DataAccessError> {
        let source = ScriptedDataSource::new()
            .with_result(vec![vec![Value::Int(1), Value::from("Entity 1")]]);
        let executor = SqlExecutor::new(source.clone());

        let names = executor.execute_query(|conn| {
            conn.prepare_statement("select id, name from entity")?
                .execute_query()?
                .map_all(|row| row.get_string(2))
        })?;

        assert_eq!(names, vec!["Entity 1".to_string()]);
        let calls = source.calls();
        assert_eq!((calls.acquired, calls.closed), (1, 1));
        Ok(())
    }

    #[test]
    fn releases_once_after_caller_error() {
        let source = ScriptedDataSource::new();
        let executor = SqlExecutor::new(source.clone());

        let err = executor
            .execute_command(|_conn| Err(DataAccessError::caller(io::Error::other("mapper failed"))))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Caller);
        assert_eq!(source.calls().closed, 1);
    }

    #[test]
    fn releases_once_after_driver_error() {
        let source = ScriptedDataSource::new().failing_on("broken");
        let executor = SqlExecutor::new(source.clone());

        let err = executor
            .execute_command(|conn| {
                conn.prepare_statement("update broken set a = $1")?
                    .with_param(1)
                    .execute_update()
                    .map(|_| ())
            })
            .unwrap_err();

        assert!(matches!(err, DataAccessError::DriverError(_)));
        assert_eq!(source.calls().closed, 1);
    }

    #[test]
    fn releases_once_when_caller_panics() {
        let source = ScriptedDataSource::new();
        let executor = SqlExecutor::new(source.clone());

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _ = executor.execute_query(|_conn| -> Result<(), DataAccessError> {
                panic!("caller bug");
            });
        }));

        assert!(outcome.is_err());
        assert_eq!(source.calls().closed, 1);
    }

    #[test]
    fn acquire_failure_runs_nothing() {
        let source = ScriptedDataSource::new().failing_acquire();
        let executor = SqlExecutor::new(source.clone());
        let mut ran = false;

        let err = executor
            .execute_command(|_conn| {
                ran = true;
                Ok::<_, DataAccessError>(())
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(!ran);
        assert_eq!(source.calls().closed, 0);
    }

    #[test]
    fn close_failure_surfaces_after_success() {
        let source = ScriptedDataSource::new().failing_close();
        let executor = SqlExecutor::new(source.clone());

        let err = executor
            .execute_command(|_conn| Ok::<_, DataAccessError>(()))
            .unwrap_err();

        assert!(matches!(err, DataAccessError::DriverError(_)));
        assert_eq!(source.calls().closed, 1);
    }

    #[test]
    fn body_error_wins_over_close_failure() {
        let source = ScriptedDataSource::new().failing_close();
        let executor = SqlExecutor::new(source.clone());

        let err = executor
            .execute_command(|_conn| Err(DataAccessError::NoCurrentRow))
            .unwrap_err();

        assert!(matches!(err, DataAccessError::NoCurrentRow));
    }

    #[test]
    fn wrapping_strategies() {
        let source = ScriptedDataSource::new().failing_on("orders");
        let executor = SqlExecutor::new(source);
        let insert = |conn: &Scope<ScriptedDataSource>| -> Result<(), DataAccessError> {
            conn.prepare_statement("insert into orders values ($1)")?
                .with_param(7)
                .execute_update()
                .map(|_| ())
        };

        let default = executor
            .execute_command_with(insert, &Wrapping::<OrderRejected>::Default)
            .unwrap_err();
        assert!(default.0.starts_with("Driver error"));

        let custom = executor
            .execute_command_with(insert, &Wrapping::Custom(rejected))
            .unwrap_err();
        assert!(custom.0.starts_with("rejected: Driver error"));
    }

    #[test]
    fn ddl_commands_run_plain_statements() -> Result<(), DataAccessError> {
        let source = ScriptedDataSource::new();
        let executor = SqlExecutor::new(source.clone());

        executor.execute_ddl_command(|conn| {
            conn.statement("CREATE TABLE users (id integer primary key)")?
                .execute()?;
            conn.statement("CREATE INDEX users_id ON users (id)")?.execute()
        })?;

        let calls = source.calls();
        assert_eq!(calls.plain.len(), 2);
        assert_eq!(calls.closed, 1);
        Ok(())
    }

    #[test]
    fn next_id_advances_the_sequence() -> Result<(), DataAccessError> {
        let source = ScriptedDataSource::new().with_sequence("s", 10);
        let executor = SqlExecutor::new(source.clone());

        assert_eq!(executor.next_id("s")?, 10);
        assert_eq!(executor.next_id_with("s", |id| format!("ORD-{id}"))?, "ORD-11");
        let calls = source.calls();
        assert_eq!((calls.acquired, calls.closed), (2, 2));
        Ok(())
    }

    #[test]
    fn next_id_rejects_unsafe_names_before_acquiring() {
        let source = ScriptedDataSource::new();
        let executor = SqlExecutor::new(source.clone());

        for name in ["", "s'); drop table users; --", "seq name"] {
            let err = executor.next_id(name).unwrap_err();
            assert!(matches!(err, DataAccessError::InvalidSequenceName(_)));
        }
        assert_eq!(source.calls().acquired, 0);
    }

    #[test]
    fn next_id_on_unknown_sequence_is_a_driver_error() {
        let source = ScriptedDataSource::new();
        let executor = SqlExecutor::new(source.clone());

        let err = executor.next_id("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Driver);
        assert_eq!(source.calls().closed, 1);
    }
}
