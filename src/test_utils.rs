//! In-memory driver double for exercising the scoped execution path without a database.
//!
//! [`ScriptedDataSource`] hands out connections that record every acquire,
//! close, prepare and bind call, replay queued result sets, and emulate
//! `nextval` sequences.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::driver::{DataSource, PlainStatementHandle, PreparedHandle, RawConnection, RawCursor};
use crate::error::DataAccessError;
use crate::translation::PlaceholderStyle;
use crate::types::Value;

/// Everything the double observed, in call order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallLog {
    pub acquired: usize,
    pub closed: usize,
    pub prepared: Vec<String>,
    pub bound: Vec<(usize, Value)>,
    pub updates: Vec<String>,
    pub queries: Vec<String>,
    pub plain: Vec<String>,
}

#[derive(Debug, Default)]
struct Script {
    log: CallLog,
    results: VecDeque<Vec<Vec<Value>>>,
    sequences: HashMap<String, i64>,
    fail_acquire: bool,
    fail_close: bool,
    fail_on: Vec<String>,
}

/// Data source whose connections follow a script instead of a database.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDataSource {
    script: Rc<RefCell<Script>>,
    translate: bool,
}

impl ScriptedDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result set returned by the next query that is not a `nextval` call.
    #[must_use]
    pub fn with_result(self, rows: Vec<Vec<Value>>) -> Self {
        self.script.borrow_mut().results.push_back(rows);
        self
    }

    /// Declare a sequence whose first `nextval` returns `start`.
    #[must_use]
    pub fn with_sequence(self, name: &str, start: i64) -> Self {
        self.script
            .borrow_mut()
            .sequences
            .insert(name.to_string(), start);
        self
    }

    #[must_use]
    pub fn failing_acquire(self) -> Self {
        self.script.borrow_mut().fail_acquire = true;
        self
    }

    #[must_use]
    pub fn failing_close(self) -> Self {
        self.script.borrow_mut().fail_close = true;
        self
    }

    /// Make any statement whose text contains `fragment` fail when executed.
    #[must_use]
    pub fn failing_on(self, fragment: &str) -> Self {
        self.script.borrow_mut().fail_on.push(fragment.to_string());
        self
    }

    #[must_use]
    pub fn with_translation(mut self, translate: bool) -> Self {
        self.translate = translate;
        self
    }

    /// Snapshot of the calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> CallLog {
        self.script.borrow().log.clone()
    }
}

impl DataSource for ScriptedDataSource {
    type Connection = ScriptedConnection;

    fn acquire(&self) -> Result<ScriptedConnection, DataAccessError> {
        if self.script.borrow().fail_acquire {
            return Err(DataAccessError::connection("scripted acquire failure"));
        }
        self.script.borrow_mut().log.acquired += 1;
        Ok(ScriptedConnection {
            script: Rc::clone(&self.script),
        })
    }

    fn translate_placeholders(&self) -> bool {
        self.translate
    }
}

/// Connection handed out by [`ScriptedDataSource`]. Speaks `$N` placeholders.
#[derive(Debug)]
pub struct ScriptedConnection {
    script: Rc<RefCell<Script>>,
}

impl ScriptedConnection {
    fn check(&self, sql: &str) -> Result<(), DataAccessError> {
        let script = self.script.borrow();
        match script.fail_on.iter().find(|fragment| sql.contains(fragment.as_str())) {
            Some(fragment) => Err(DataAccessError::driver(format!(
                "scripted failure on {fragment:?}"
            ))),
            None => Ok(()),
        }
    }
}

impl RawConnection for ScriptedConnection {
    fn prepare<'c>(
        &'c self,
        sql: &str,
    ) -> Result<Box<dyn PreparedHandle<'c> + 'c>, DataAccessError> {
        self.script.borrow_mut().log.prepared.push(sql.to_string());
        Ok(Box::new(ScriptedStatement {
            connection: self,
            sql: sql.to_string(),
        }))
    }

    fn create_plain_statement<'c>(
        &'c self,
    ) -> Result<Box<dyn PlainStatementHandle + 'c>, DataAccessError> {
        Ok(Box::new(ScriptedPlainStatement { connection: self }))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Postgres
    }

    fn close(self) -> Result<(), DataAccessError> {
        let mut script = self.script.borrow_mut();
        script.log.closed += 1;
        if script.fail_close {
            return Err(DataAccessError::driver("scripted close failure"));
        }
        Ok(())
    }
}

struct ScriptedStatement<'c> {
    connection: &'c ScriptedConnection,
    sql: String,
}

impl ScriptedStatement<'_> {
    fn sequence_name(&self) -> Option<&str> {
        self.sql
            .strip_prefix("select nextval('")
            .and_then(|rest| rest.strip_suffix("')"))
    }
}

impl<'c> PreparedHandle<'c> for ScriptedStatement<'c> {
    fn bind_positional(&mut self, index: usize, value: Value) -> Result<(), DataAccessError> {
        self.connection
            .script
            .borrow_mut()
            .log
            .bound
            .push((index, value));
        Ok(())
    }

    fn execute_update(self: Box<Self>) -> Result<usize, DataAccessError> {
        self.connection.check(&self.sql)?;
        self.connection
            .script
            .borrow_mut()
            .log
            .updates
            .push(self.sql.clone());
        Ok(1)
    }

    fn execute_query(self: Box<Self>) -> Result<Box<dyn RawCursor + 'c>, DataAccessError> {
        self.connection.check(&self.sql)?;
        let mut script = self.connection.script.borrow_mut();
        script.log.queries.push(self.sql.clone());
        let rows = match self.sequence_name() {
            Some(name) => {
                let next = script.sequences.get_mut(name).ok_or_else(|| {
                    DataAccessError::driver(format!("sequence {name} does not exist"))
                })?;
                let value = *next;
                *next += 1;
                vec![vec![Value::Int(value)]]
            }
            None => script.results.pop_front().unwrap_or_default(),
        };
        Ok(Box::new(ScriptedCursor::new(rows)))
    }
}

struct ScriptedPlainStatement<'c> {
    connection: &'c ScriptedConnection,
}

impl PlainStatementHandle for ScriptedPlainStatement<'_> {
    fn execute(self: Box<Self>, sql: &str) -> Result<(), DataAccessError> {
        self.connection.check(sql)?;
        self.connection
            .script
            .borrow_mut()
            .log
            .plain
            .push(sql.to_string());
        Ok(())
    }
}

/// Raw cursor over rows held in memory.
#[derive(Debug, Clone)]
pub struct ScriptedCursor {
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    columns: usize,
}

impl ScriptedCursor {
    #[must_use]
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        let columns = rows.first().map_or(0, Vec::len);
        Self {
            rows: rows.into(),
            current: None,
            columns,
        }
    }
}

impl RawCursor for ScriptedCursor {
    fn advance(&mut self) -> Result<bool, DataAccessError> {
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn read_column(&self, index: usize) -> Result<Value, DataAccessError> {
        let row = self
            .current
            .as_ref()
            .ok_or(DataAccessError::NoCurrentRow)?;
        index
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .cloned()
            .ok_or_else(|| DataAccessError::driver(format!("column index {index} out of range")))
    }

    fn column_count(&self) -> usize {
        self.columns
    }
}
