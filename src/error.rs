use thiserror::Error;

/// Boxed cause carried by the wrapping variants of [`DataAccessError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The single error type surfaced by every scoped operation.
///
/// Driver, pool and caller failures are all normalised into this enum at the
/// orchestration boundary. The original failure stays reachable through
/// [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum DataAccessError {
    /// Acquiring a connection failed; no work was attempted.
    #[error("Connection error: {0}")]
    ConnectionError(#[source] BoxError),

    /// A statement or cursor operation failed inside the driver.
    #[error("Driver error: {0}")]
    DriverError(#[source] BoxError),

    /// A caller-supplied mapping or command function failed.
    #[error("Caller error: {0}")]
    CallerError(#[source] BoxError),

    /// A column value could not be read as the requested type.
    #[error("Conversion error at column {index}: {message}")]
    ConversionError { index: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A column accessor was used while the cursor was not positioned on a row.
    #[error("Cursor is not positioned on a row")]
    NoCurrentRow,

    #[error("Connection already released")]
    ConnectionReleased,

    #[error("Invalid sequence name: {0:?}")]
    InvalidSequenceName(String),

    #[error("Sequence {0} returned no value")]
    EmptySequence(String),
}

/// Coarse classification of a [`DataAccessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Driver,
    Caller,
    Config,
}

impl DataAccessError {
    /// Wrap a failure raised by caller code (for example inside a row mapper).
    pub fn caller<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        DataAccessError::CallerError(err.into())
    }

    /// Wrap a failure raised by a driver implementation.
    pub fn driver<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        DataAccessError::DriverError(err.into())
    }

    /// Wrap a failure raised while acquiring a connection.
    pub fn connection<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        DataAccessError::ConnectionError(err.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataAccessError::ConnectionError(_) | DataAccessError::ConnectionReleased => {
                ErrorKind::Connection
            }
            DataAccessError::DriverError(_)
            | DataAccessError::ConversionError { .. }
            | DataAccessError::NoCurrentRow
            | DataAccessError::EmptySequence(_) => ErrorKind::Driver,
            DataAccessError::CallerError(_) => ErrorKind::Caller,
            DataAccessError::ConfigError(_) | DataAccessError::InvalidSequenceName(_) => {
                ErrorKind::Config
            }
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DataAccessError {
    fn from(err: rusqlite::Error) -> Self {
        DataAccessError::DriverError(Box::new(err))
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for DataAccessError {
    fn from(err: r2d2::Error) -> Self {
        DataAccessError::ConnectionError(Box::new(err))
    }
}

/// How a boundary failure is handed back to the invoker.
///
/// `Default` converts through `From<DataAccessError>` (the identity for
/// `DataAccessError` itself); `Custom` lets a command surface its own typed
/// failure instead.
#[derive(Debug, Clone, Copy)]
pub enum Wrapping<X = DataAccessError> {
    Default,
    Custom(fn(DataAccessError) -> X),
}

impl<X> Default for Wrapping<X> {
    fn default() -> Self {
        Wrapping::Default
    }
}

impl<X> Wrapping<X>
where
    X: From<DataAccessError>,
{
    pub fn wrap(&self, err: DataAccessError) -> X {
        match self {
            Wrapping::Default => X::from(err),
            Wrapping::Custom(wrap) => wrap(err),
        }
    }
}

/// Normalise any failure convertible into [`DataAccessError`].
///
/// # Errors
/// Returns the converted error when `result` is an `Err`.
pub fn translate<T, E>(result: Result<T, E>) -> Result<T, DataAccessError>
where
    E: Into<DataAccessError>,
{
    result.map_err(Into::into)
}

/// Normalise a failure and hand it to the chosen wrapping strategy.
///
/// # Errors
/// Returns the wrapped error when `result` is an `Err`.
pub fn translate_with<T, E, X>(result: Result<T, E>, wrapping: &Wrapping<X>) -> Result<T, X>
where
    E: Into<DataAccessError>,
    X: From<DataAccessError>,
{
    result.map_err(|err| wrapping.wrap(err.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[derive(Debug)]
    struct CommandFailed(DataAccessError);

    impl From<DataAccessError> for CommandFailed {
        fn from(err: DataAccessError) -> Self {
            CommandFailed(err)
        }
    }

    fn tagged(err: DataAccessError) -> CommandFailed {
        CommandFailed(DataAccessError::ConfigError(format!("tagged: {err}")))
    }

    #[test]
    fn passes_success_through() {
        let ok: Result<i32, DataAccessError> = Ok(7);
        assert_eq!(translate(ok).ok(), Some(7));
    }

    #[test]
    fn does_not_rewrap_data_access_errors() {
        let failed: Result<(), DataAccessError> = Err(DataAccessError::NoCurrentRow);
        let err = translate(failed).unwrap_err();
        assert!(matches!(err, DataAccessError::NoCurrentRow));
    }

    #[test]
    fn keeps_original_cause_for_caller_errors() {
        let err = DataAccessError::caller(io::Error::other("mapper blew up"));
        assert_eq!(err.kind(), ErrorKind::Caller);
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "mapper blew up");
    }

    #[test]
    fn default_wrapping_uses_from() {
        let failed: Result<(), DataAccessError> = Err(DataAccessError::NoCurrentRow);
        let err = translate_with(failed, &Wrapping::<CommandFailed>::Default).unwrap_err();
        assert!(matches!(err.0, DataAccessError::NoCurrentRow));
    }

    #[test]
    fn custom_wrapping_overrides_default() {
        let failed: Result<(), DataAccessError> = Err(DataAccessError::NoCurrentRow);
        let err = translate_with(failed, &Wrapping::Custom(tagged)).unwrap_err();
        match err.0 {
            DataAccessError::ConfigError(message) => assert!(message.starts_with("tagged: ")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
