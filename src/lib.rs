//! Scoped execution of parameterized SQL and one-to-many join flattening.
//!
//! [`SqlExecutor`] borrows a connection from a [`DataSource`] for exactly one
//! caller function and gives it back on every exit path. Inside that function
//! callers prepare statements, bind positional parameters, and map the
//! resulting [`Cursor`] into values or, for parent/child joins, into a
//! [`OneToMany`] grouping.

pub mod connection;
pub mod driver;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod prelude;
pub mod translation;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use connection::{PlainStatement, ScopedConnection, StatementBuilder};
pub use driver::{DataSource, PlainStatementHandle, PreparedHandle, RawConnection, RawCursor};
pub use error::{DataAccessError, ErrorKind, Wrapping, translate, translate_with};
pub use executor::{Scope, SqlExecutor};
pub use mapping::{Cursor, Group, KeyValue, OneToMany};
pub use translation::{PlaceholderStyle, translate_placeholders};
pub use types::Value;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteOptions, SqliteOptionsBuilder, SqlitePool, create_sequence_sql};
