//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::connection::{PlainStatement, ScopedConnection, StatementBuilder};
pub use crate::driver::{DataSource, RawConnection};
pub use crate::error::{DataAccessError, ErrorKind, Wrapping, translate, translate_with};
pub use crate::executor::{Scope, SqlExecutor};
pub use crate::mapping::{Cursor, Group, KeyValue, OneToMany};
pub use crate::translation::PlaceholderStyle;
pub use crate::types::Value;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder, SqlitePool, create_sequence_sql};
