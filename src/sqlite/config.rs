use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::Deserialize;
use tracing::info;

use crate::error::DataAccessError;

use super::SqlitePool;

fn default_pool_size() -> u32 {
    4
}

fn default_connection_timeout_secs() -> u64 {
    30
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_wal() -> bool {
    true
}

/// Options for configuring a `SQLite` pool.
///
/// Deserializable so it can sit inside an application's own config file;
/// only `db_path` is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub translate_placeholders: bool,
    /// Switch file databases to WAL journaling. Ignored for in-memory databases.
    #[serde(default = "default_wal")]
    pub wal: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            pool_size: default_pool_size(),
            connection_timeout_secs: default_connection_timeout_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
            translate_placeholders: false,
            wal: default_wal(),
        }
    }

    /// Named in-memory database shared by every connection in the pool.
    ///
    /// The database lives as long as at least one pooled connection is open.
    #[must_use]
    pub fn in_memory(name: &str) -> Self {
        Self::new(format!("file:{name}?mode=memory&cache=shared"))
    }

    #[must_use]
    pub fn with_translation(mut self, translate_placeholders: bool) -> Self {
        self.translate_placeholders = translate_placeholders;
        self
    }

    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.db_path == ":memory:" || self.db_path.contains("mode=memory")
    }

    fn validate(&self) -> Result<(), DataAccessError> {
        if self.db_path.is_empty() {
            return Err(DataAccessError::ConfigError(
                "db_path must not be empty".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(DataAccessError::ConfigError(
                "pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn translation(mut self, translate_placeholders: bool) -> Self {
        self.opts.translate_placeholders = translate_placeholders;
        self
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: u32) -> Self {
        self.opts.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.opts.connection_timeout_secs = timeout.as_secs();
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a [`SqlitePool`].
    ///
    /// # Errors
    ///
    /// Returns `DataAccessError::ConfigError` for invalid options, or
    /// `DataAccessError::ConnectionError` if the pool cannot open its connections.
    pub fn build(self) -> Result<SqlitePool, DataAccessError> {
        SqlitePool::new(self.finish())
    }
}

impl SqlitePool {
    #[must_use]
    pub fn builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Open a pool for `opts`. Every new connection gets the busy timeout and,
    /// for file databases, WAL journaling.
    ///
    /// # Errors
    /// Returns `DataAccessError::ConfigError` for invalid options, or
    /// `DataAccessError::ConnectionError` if pool creation fails.
    pub fn new(opts: SqliteOptions) -> Result<Self, DataAccessError> {
        opts.validate()?;

        let busy_timeout = Duration::from_millis(opts.busy_timeout_ms);
        let wal = opts.wal && !opts.is_memory();
        let manager = SqliteConnectionManager::file(&opts.db_path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if wal {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            }
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(opts.pool_size)
            .connection_timeout(Duration::from_secs(opts.connection_timeout_secs))
            .build(manager)?;

        info!(
            db_path = %opts.db_path,
            pool_size = opts.pool_size,
            wal,
            "sqlite pool ready"
        );

        Ok(SqlitePool::from_parts(pool, opts.translate_placeholders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let opts: SqliteOptions = serde_json::from_str(r#"{ "db_path": "app.db" }"#)?;
        assert_eq!(opts, SqliteOptions::new("app.db".to_string()));
        assert_eq!(opts.pool_size, 4);
        assert!(opts.wal);
        assert!(!opts.translate_placeholders);
        Ok(())
    }

    #[test]
    fn rejects_empty_pool() {
        let err = SqlitePool::builder(":memory:".to_string())
            .pool_size(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, DataAccessError::ConfigError(_)));
    }

    #[test]
    fn recognises_memory_databases() {
        assert!(SqliteOptions::in_memory("unit").is_memory());
        assert!(SqliteOptions::new(":memory:".to_string()).is_memory());
        assert!(!SqliteOptions::new("/tmp/app.db".to_string()).is_memory());
    }
}
