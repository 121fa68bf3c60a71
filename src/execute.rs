//! Shared execution base for every statement.
//!
//! A statement renders itself into a [`Rendered`] and hands it to its [`Execution`], which
//! owns the prepared handle and the result cursor. Result accessors on the [`Statement`]
//! trait run the statement on demand.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{
    connection::{Connection, Cursor, DriverResult, Outcome, Prepared},
    dialect::Dialect,
    error::{DriverError, QueryError, Result},
    row::Row,
    settings::Settings,
    value::Value,
    writer::{FormatContext, FormatWriter},
};

/// Rendered SQL text and the values for its placeholders, in placeholder order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub binds: Vec<Value>,
}

impl Rendered {
    pub(crate) fn of<T: FormatWriter>(node: &T, dialect: Dialect) -> Self {
        let size_hint = 64;
        let mut sql = String::with_capacity(size_hint);
        let mut context = FormatContext::new(&mut sql, dialect);
        node.format_writer(&mut context)
            .expect("should not fail on a string writer");
        let binds = context.take_binds();
        Self { sql, binds }
    }

    pub fn placeholders(&self) -> usize {
        self.sql.matches('?').count()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum State {
    #[default]
    Unexecuted,
    Executed,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Fetch {
    Next,
    Current,
    First,
    Last,
    At(usize),
}

pub struct Execution {
    connection: Arc<dyn Connection>,
    dialect: Dialect,
    debug: bool,
    auto_execute: bool,
    state: State,
    prepared: Option<(String, Box<dyn Prepared>)>,
    cursor: Option<Box<dyn Cursor>>,
    // a fresh cursor still sits on the header position
    fresh: bool,
    affected: Option<u64>,
    last_run: Option<Rendered>,
    last_error: Option<QueryError>,
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("dialect", &self.dialect)
            .field("debug", &self.debug)
            .field("auto_execute", &self.auto_execute)
            .field("state", &self.state)
            .field("prepared", &self.prepared.as_ref().map(|(sql, _)| sql))
            .field("affected", &self.affected)
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Clones share the connection and start unexecuted.
impl Clone for Execution {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            dialect: self.dialect,
            debug: self.debug,
            auto_execute: self.auto_execute,
            state: State::Unexecuted,
            prepared: None,
            cursor: None,
            fresh: false,
            affected: None,
            last_run: None,
            last_error: None,
        }
    }
}

impl Execution {
    pub(crate) fn new(connection: Arc<dyn Connection>, settings: Settings) -> Self {
        Self {
            connection,
            dialect: settings.dialect,
            debug: settings.debug,
            auto_execute: settings.auto_execute,
            state: State::Unexecuted,
            prepared: None,
            cursor: None,
            fresh: false,
            affected: None,
            last_run: None,
            last_error: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn last_error(&self) -> Option<&QueryError> {
        self.last_error.as_ref()
    }

    pub fn affected(&self) -> Option<u64> {
        self.affected
    }

    pub(crate) fn fail(&mut self, err: QueryError) {
        self.cursor = None;
        self.fresh = false;
        self.state = State::Failed;
        self.last_error = Some(err);
    }

    pub(crate) fn run(&mut self, rendered: &Rendered) -> Result<()> {
        self.cursor = None;
        self.fresh = false;
        self.affected = None;
        self.last_error = None;
        self.last_run = Some(rendered.clone());

        match self.run_with_retry(rendered) {
            Ok(Outcome::Rows(cursor)) => {
                self.cursor = Some(cursor);
                self.fresh = true;
                self.state = State::Executed;
                Ok(())
            }
            Ok(Outcome::Affected(count)) => {
                self.affected = Some(count);
                self.state = State::Executed;
                Ok(())
            }
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn run_with_retry(&mut self, rendered: &Rendered) -> Result<Outcome> {
        if self.debug {
            tracing::debug!(sql = %rendered.sql, binds = ?rendered.binds, "executing statement");
        } else {
            tracing::trace!(sql = %rendered.sql, binds = ?rendered.binds, "executing statement");
        }

        match self.attempt(rendered) {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_connection_lost() => {
                let alive = self.connection.is_alive();
                tracing::warn!(sql = %rendered.sql, error = %err, alive, "connection lost, reconnecting once");
                self.discard_prepared();
                if !self.connection.reconnect() {
                    return Err(QueryError::from_driver(err, &rendered.sql, &rendered.binds));
                }
                self.attempt(rendered).map_err(|err| {
                    self.discard_prepared();
                    QueryError::from_driver(err, &rendered.sql, &rendered.binds)
                })
            }
            Err(err) => {
                self.discard_prepared();
                Err(QueryError::from_driver(err, &rendered.sql, &rendered.binds))
            }
        }
    }

    /// Prepares (or reuses the prepared handle for identical text), binds and runs.
    fn attempt(&mut self, rendered: &Rendered) -> DriverResult<Outcome> {
        let reusable = self
            .prepared
            .as_ref()
            .is_some_and(|(sql, _)| *sql == rendered.sql);
        if !reusable {
            self.discard_prepared();
            let prepared = self.connection.prepare(&rendered.sql)?;
            self.prepared = Some((rendered.sql.clone(), prepared));
        }
        let Some((_, prepared)) = self.prepared.as_mut() else {
            return Err(DriverError::other("statement was not prepared"));
        };
        for (index, value) in rendered.binds.iter().enumerate() {
            prepared.bind(index + 1, value)?;
        }
        prepared.execute()
    }

    fn discard_prepared(&mut self) {
        if let Some((sql, mut prepared)) = self.prepared.take() {
            if let Err(err) = prepared.close() {
                tracing::debug!(sql = %sql, error = %err, "ignoring failure while closing statement");
            }
        }
    }

    /// Forgets the last result or failure; the prepared handle is kept for reuse.
    pub(crate) fn reset(&mut self) {
        self.cursor = None;
        self.fresh = false;
        self.affected = None;
        self.last_error = None;
        self.state = State::Unexecuted;
    }

    pub(crate) fn close(&mut self) {
        self.cursor = None;
        self.fresh = false;
        self.discard_prepared();
        self.state = State::Closed;
    }

    /// Runs `rendered` on a scratch execution sharing this connection and reads the first
    /// column of the first row as a count.
    pub(crate) fn count(&self, rendered: &Rendered) -> Result<u64> {
        let mut scratch = self.clone();
        scratch.run(rendered)?;
        let count = scratch
            .fetch(Fetch::First)?
            .and_then(|row| row.at(0).and_then(Value::as_i64))
            .unwrap_or(0);
        scratch.close();
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// The single cursor primitive behind every row accessor.
    pub(crate) fn fetch(&mut self, fetch: Fetch) -> Result<Option<Row>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        let fresh = std::mem::replace(&mut self.fresh, false);
        let moved = match fetch {
            Fetch::Next => cursor.next(),
            Fetch::Current if fresh => cursor.next(),
            Fetch::Current => Ok(true),
            Fetch::First => cursor.first(),
            Fetch::Last => cursor.last(),
            Fetch::At(row) => cursor.absolute(row),
        };
        match moved {
            Ok(true) => Ok(cursor.current()),
            Ok(false) => Ok(None),
            Err(err) => {
                let (sql, binds) = match &self.last_run {
                    Some(run) => (run.sql.as_str(), run.binds.as_slice()),
                    None => ("", &[][..]),
                };
                let err = QueryError::from_driver(err, sql, binds);
                self.fail(err.clone());
                Err(err)
            }
        }
    }
}

/// Result access and execution control shared by every statement.
pub trait Statement {
    #[doc(hidden)]
    fn execution(&self) -> &Execution;

    #[doc(hidden)]
    fn execution_mut(&mut self) -> &mut Execution;

    /// The SQL text and binds for the current state, re-rendered when stale.
    fn rendered(&mut self) -> &Rendered;

    /// Number of rows the statement matches or touched; see each statement for how it
    /// is obtained.
    fn row_count(&mut self) -> Result<u64>;

    /// Whether the statement can run at all. Auto-execute closes instead of running
    /// statements that are not ready.
    fn is_ready(&self) -> bool {
        true
    }

    /// Checks run before any driver call.
    #[doc(hidden)]
    fn preflight(&mut self) -> Result<()> {
        Ok(())
    }

    fn to_sql(&mut self) -> &str {
        &self.rendered().sql
    }

    fn bound_values(&mut self) -> &[Value] {
        &self.rendered().binds
    }

    fn execute(&mut self) -> Result<&mut Self>
    where
        Self: Sized,
    {
        if let Err(err) = self.preflight() {
            self.execution_mut().fail(err.clone());
            return Err(err);
        }
        let rendered = self.rendered().clone();
        self.execution_mut().run(&rendered)?;
        Ok(self)
    }

    /// When enabled, every mutating builder call re-runs the statement.
    fn auto_execute(&mut self, enabled: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.execution_mut().auto_execute = enabled;
        self
    }

    fn is_auto_execute(&self) -> bool {
        self.execution().auto_execute
    }

    /// Releases the prepared handle and cursor. The next accessor runs the statement again.
    fn close(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self.execution_mut().close();
        self
    }

    fn state(&self) -> State {
        self.execution().state()
    }

    fn last_error(&self) -> Option<&QueryError> {
        self.execution().last_error()
    }

    #[doc(hidden)]
    fn ensure_executed(&mut self) -> Result<()>
    where
        Self: Sized,
    {
        match self.execution().state() {
            State::Executed => Ok(()),
            State::Failed => match self.execution().last_error() {
                Some(err) => Err(err.clone()),
                None => self.execute().map(|_| ()),
            },
            State::Unexecuted | State::Closed => self.execute().map(|_| ()),
        }
    }

    /// Advances to the next row.
    fn row(&mut self) -> Result<Option<Row>>
    where
        Self: Sized,
    {
        self.ensure_executed()?;
        self.execution_mut().fetch(Fetch::Next)
    }

    fn row_first(&mut self) -> Result<Option<Row>>
    where
        Self: Sized,
    {
        self.ensure_executed()?;
        self.execution_mut().fetch(Fetch::First)
    }

    fn row_last(&mut self) -> Result<Option<Row>>
    where
        Self: Sized,
    {
        self.ensure_executed()?;
        self.execution_mut().fetch(Fetch::Last)
    }

    /// Row by 1-based position.
    fn row_at(&mut self, row: usize) -> Result<Option<Row>>
    where
        Self: Sized,
    {
        self.ensure_executed()?;
        self.execution_mut().fetch(Fetch::At(row))
    }

    /// The current row keyed by column; the first call lands on the first row.
    fn map(&mut self) -> Result<Option<IndexMap<SmolStr, Value>>>
    where
        Self: Sized,
    {
        self.ensure_executed()?;
        Ok(self.execution_mut().fetch(Fetch::Current)?.map(|row| row.to_map()))
    }

    /// Every row from the first one on, leaving the cursor past the end.
    fn set(&mut self) -> Result<Vec<IndexMap<SmolStr, Value>>>
    where
        Self: Sized,
    {
        self.ensure_executed()?;
        let execution = self.execution_mut();
        let mut rows = Vec::new();
        let mut next = execution.fetch(Fetch::First)?;
        while let Some(row) = next {
            rows.push(row.to_map());
            next = execution.fetch(Fetch::Next)?;
        }
        Ok(rows)
    }

    fn row_strings(&mut self) -> Result<Option<Vec<Option<String>>>>
    where
        Self: Sized,
    {
        Ok(self.row()?.map(|row| row.to_strings()))
    }

    fn map_strings(&mut self) -> Result<Option<IndexMap<SmolStr, Option<String>>>>
    where
        Self: Sized,
    {
        self.ensure_executed()?;
        Ok(self
            .execution_mut()
            .fetch(Fetch::Current)?
            .map(|row| row.to_string_map()))
    }

    fn set_strings(&mut self) -> Result<Vec<IndexMap<SmolStr, Option<String>>>>
    where
        Self: Sized,
    {
        Ok(self
            .set()?
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(column, value)| (column, value.to_text()))
                    .collect()
            })
            .collect())
    }

    /// Affected-row count reported by the driver for the last run.
    fn affected_rows(&mut self) -> Result<u64>
    where
        Self: Sized,
    {
        self.ensure_executed()?;
        Ok(self.execution().affected().unwrap_or(0))
    }
}

/// Mutation hook shared by the builders: re-run or close under auto-execute, otherwise
/// drop the stale result so the next accessor runs the new text.
pub(crate) fn after_mutation<S: Statement>(statement: &mut S) {
    if !statement.execution().auto_execute {
        statement.execution_mut().reset();
        return;
    }
    if statement.is_ready() {
        // the failure stays in `last_error` for the next accessor
        let _ = statement.execute();
    } else {
        statement.execution_mut().close();
    }
}
