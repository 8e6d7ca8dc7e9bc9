use chrono::NaiveDate;
use tracing::debug;

use crate::driver::PreparedHandle;
use crate::error::DataAccessError;
use crate::mapping::Cursor;
use crate::types::Value;

/// Builds a parameterized statement one positional parameter at a time.
///
/// Each `with_*` call binds exactly one placeholder, in call order, starting
/// at position 1. Positions are not validated against the statement text:
/// the call order must match the placeholder order.
///
/// Binding failures are held back and reported by the terminal
/// [`execute_update`](Self::execute_update) or
/// [`execute_query`](Self::execute_query) call so the chain stays fluent.
pub struct StatementBuilder<'c> {
    handle: Box<dyn PreparedHandle<'c> + 'c>,
    param_index: usize,
    bind_error: Option<DataAccessError>,
}

impl std::fmt::Debug for StatementBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementBuilder")
            .field("param_index", &self.param_index)
            .field("bind_error", &self.bind_error)
            .finish_non_exhaustive()
    }
}

impl<'c> StatementBuilder<'c> {
    pub(crate) fn new(handle: Box<dyn PreparedHandle<'c> + 'c>) -> Self {
        Self {
            handle,
            param_index: 0,
            bind_error: None,
        }
    }

    /// Bind the next positional parameter.
    #[must_use]
    pub fn with_param(mut self, param: impl Into<Value>) -> Self {
        self.param_index += 1;
        if self.bind_error.is_none()
            && let Err(err) = self.handle.bind_positional(self.param_index, param.into())
        {
            self.bind_error = Some(err);
        }
        self
    }

    /// Bind the next parameter, or NULL when `param` is absent.
    #[must_use]
    pub fn with_optional_param<T>(self, param: Option<T>) -> Self
    where
        T: Into<Value>,
    {
        self.with_param(Value::from(param))
    }

    /// Bind the next parameter as text, or an empty string when absent.
    #[must_use]
    pub fn with_optional_string_param(self, param: Option<&str>) -> Self {
        self.with_param(param.unwrap_or_default())
    }

    /// Bind the next parameter as a date, or NULL when absent.
    #[must_use]
    pub fn with_optional_date_param(self, param: Option<NaiveDate>) -> Self {
        self.with_optional_param(param)
    }

    /// Number of parameters bound so far.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_index
    }

    /// Run the statement for its side effect and release it.
    ///
    /// # Errors
    /// Returns the first binding failure, or a driver error from execution.
    pub fn execute_update(self) -> Result<usize, DataAccessError> {
        if let Some(err) = self.bind_error {
            return Err(err);
        }
        let affected = self.handle.execute_update()?;
        debug!(affected, params = self.param_index, "statement executed");
        Ok(affected)
    }

    /// Run the statement and return a cursor over its result.
    ///
    /// # Errors
    /// Returns the first binding failure, or a driver error from execution.
    pub fn execute_query(self) -> Result<Cursor<'c>, DataAccessError> {
        if let Some(err) = self.bind_error {
            return Err(err);
        }
        let raw = self.handle.execute_query()?;
        Ok(Cursor::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::{DataSource, RawConnection};
    use crate::error::DataAccessError;
    use crate::test_utils::ScriptedDataSource;
    use crate::types::Value;
    use chrono::NaiveDate;

    use super::StatementBuilder;

    #[test]
    fn binds_each_param_at_the_next_position() -> Result<(), DataAccessError> {
        let source = ScriptedDataSource::new();
        let conn = source.acquire()?;
        let date = NaiveDate::from_ymd_opt(2017, 7, 27).unwrap();

        let builder = StatementBuilder::new(conn.prepare("insert into t values ($1, $2, $3, $4, $5)")?)
            .with_param(1)
            .with_param("John")
            .with_param(date)
            .with_optional_string_param(None)
            .with_optional_date_param(None);
        assert_eq!(builder.param_count(), 5);
        builder.execute_update()?;

        assert_eq!(
            source.calls().bound,
            vec![
                (1, Value::Int(1)),
                (2, Value::Text("John".into())),
                (3, Value::Date(date)),
                (4, Value::Text(String::new())),
                (5, Value::Null),
            ]
        );
        Ok(())
    }

    #[test]
    fn driver_failure_surfaces_on_execute() -> Result<(), DataAccessError> {
        let source = ScriptedDataSource::new().failing_on("boom");
        let conn = source.acquire()?;
        let err = StatementBuilder::new(conn.prepare("select boom")?)
            .execute_query()
            .unwrap_err();
        assert!(matches!(err, DataAccessError::DriverError(_)));
        Ok(())
    }
}
