// SQLite module - rusqlite driver behind the narrow driver traits
//
// - config: options, builder and r2d2 pool setup
// - connection: pooled connection, prepared and plain statements
// - params: value conversion between crate and SQLite types
// - query: buffered result reading

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

use std::fmt;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, warn};

use crate::driver::DataSource;
use crate::error::DataAccessError;
use crate::executor::validate_sequence_name;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteConnection;
pub use query::BufferedCursor;

/// r2d2-backed pool of `SQLite` connections.
#[derive(Clone)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    translate_placeholders: bool,
}

impl fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.pool.state();
        f.debug_struct("SqlitePool")
            .field("connections", &state.connections)
            .field("idle", &state.idle_connections)
            .field("translate_placeholders", &self.translate_placeholders)
            .finish()
    }
}

impl SqlitePool {
    pub(crate) fn from_parts(
        pool: Pool<SqliteConnectionManager>,
        translate_placeholders: bool,
    ) -> Self {
        Self {
            pool,
            translate_placeholders,
        }
    }

    /// Current connection counts, mostly useful to check that nothing leaked.
    #[must_use]
    pub fn state(&self) -> r2d2::State {
        self.pool.state()
    }
}

impl DataSource for SqlitePool {
    type Connection = SqliteConnection;

    fn acquire(&self) -> Result<SqliteConnection, DataAccessError> {
        let conn = self.pool.get()?;
        if !conn.is_autocommit() {
            warn!("pooled connection still inside a transaction; rolling back before use");
            connection::rollback_open_transaction(&conn)?;
        }
        debug!(idle = self.pool.state().idle_connections, "sqlite connection checked out");
        Ok(SqliteConnection::new(conn))
    }

    fn translate_placeholders(&self) -> bool {
        self.translate_placeholders
    }
}

/// DDL that creates sequence `name` so its first value is `start`.
///
/// Run it through a plain statement (for example inside
/// [`execute_ddl_command`](crate::executor::SqlExecutor::execute_ddl_command)).
/// Running it again leaves an existing sequence untouched.
///
/// # Errors
/// Returns `DataAccessError::InvalidSequenceName` for names outside `[A-Za-z0-9_.]`.
pub fn create_sequence_sql(name: &str, start: i64) -> Result<String, DataAccessError> {
    validate_sequence_name(name)?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS \"{name}\" (next_value INTEGER NOT NULL);\n\
         INSERT INTO \"{name}\" (next_value) SELECT {start} \
         WHERE NOT EXISTS (SELECT 1 FROM \"{name}\");"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RawConnection;
    use crate::executor::SqlExecutor;

    fn memory_executor(name: &str) -> Result<SqlExecutor<SqlitePool>, DataAccessError> {
        let pool = SqlitePool::new(SqliteOptions::in_memory(name))?;
        Ok(SqlExecutor::new(pool))
    }

    #[test]
    fn emulated_sequence_counts_up_from_start() -> Result<(), DataAccessError> {
        let executor = memory_executor("sqlite_mod_sequence")?;
        let ddl = create_sequence_sql("s", 10)?;
        executor.execute_ddl_command(|conn| conn.statement(&ddl)?.execute())?;

        assert_eq!(executor.next_id("s")?, 10);
        assert_eq!(executor.next_id_with("s", |id| id * 100)?, 1100);
        Ok(())
    }

    #[test]
    fn sequence_ddl_is_idempotent() -> Result<(), DataAccessError> {
        let executor = memory_executor("sqlite_mod_sequence_twice")?;
        let ddl = create_sequence_sql("orders_seq", 1)?;
        executor.execute_ddl_command(|conn| conn.statement(&ddl)?.execute())?;
        assert_eq!(executor.next_id("orders_seq")?, 1);
        executor.execute_ddl_command(|conn| conn.statement(&ddl)?.execute())?;
        assert_eq!(executor.next_id("orders_seq")?, 2);
        Ok(())
    }

    #[test]
    fn rejects_unsafe_sequence_names() {
        assert!(matches!(
            create_sequence_sql("x\"; drop table y", 1),
            Err(DataAccessError::InvalidSequenceName(_))
        ));
    }

    #[test]
    fn open_transaction_is_rolled_back_on_release() -> Result<(), DataAccessError> {
        let executor = memory_executor("sqlite_mod_rollback")?;
        executor.execute_ddl_command(|conn| {
            conn.statement("CREATE TABLE t (a INTEGER)")?.execute()
        })?;
        executor.execute_command(|conn| {
            conn.statement("BEGIN")?.execute()?;
            conn.prepare_statement("INSERT INTO t (a) VALUES (?1)")?
                .with_param(1)
                .execute_update()
                .map(|_| ())
        })?;

        let count = executor.execute_query(|conn| {
            conn.prepare_statement("SELECT COUNT(*) FROM t")?
                .execute_query()?
                .map_one(|row| row.get_int(1))
        })?;
        assert_eq!(count, Some(0));
        Ok(())
    }

    #[test]
    fn checkout_rolls_back_a_connection_left_mid_transaction() -> Result<(), DataAccessError> {
        let db_path = SqliteOptions::in_memory("sqlite_mod_dirty_checkout").db_path;
        let pool = SqlitePool::builder(db_path).pool_size(1).build()?;
        let executor = SqlExecutor::new(pool.clone());
        executor.execute_ddl_command(|conn| {
            conn.statement("CREATE TABLE t (a INTEGER)")?.execute()
        })?;

        // Bypass release so the transaction goes back to r2d2 still open.
        {
            let raw = pool.pool.get()?;
            raw.execute_batch("BEGIN; INSERT INTO t (a) VALUES (1);")?;
            assert!(!raw.is_autocommit());
        }

        let conn = pool.acquire()?;
        assert!(conn.as_rusqlite().is_autocommit());
        conn.close()?;

        let count = executor.execute_query(|conn| {
            conn.prepare_statement("SELECT COUNT(*) FROM t")?
                .execute_query()?
                .map_one(|row| row.get_int(1))
        })?;
        assert_eq!(count, Some(0));
        Ok(())
    }
}
