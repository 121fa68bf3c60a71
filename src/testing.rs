//! Scripted in-memory connection for unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    Database, Settings,
    connection::{ColumnInfo, Connection, DriverResult, Outcome, Prepared, RowSet},
    error::DriverError,
    value::Value,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Prepare(String),
    Bind(usize, Value),
    Execute,
    Close,
    IsAlive,
    Reconnect,
    ListTables,
    DescribeColumns(String),
}

#[derive(Debug)]
enum Response {
    Rows(RowSet),
    Affected(u64),
    Fail(DriverError),
}

#[derive(Debug)]
struct MockState {
    calls: Vec<Call>,
    responses: VecDeque<Response>,
    catalog_failures: VecDeque<DriverError>,
    tables: HashMap<String, Vec<ColumnInfo>>,
    alive: bool,
    reconnects: bool,
    // drivers that notice the drop only on the next round trip
    alive_after_loss: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            responses: VecDeque::new(),
            catalog_failures: VecDeque::new(),
            tables: HashMap::new(),
            alive: true,
            reconnects: true,
            alive_after_loss: false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn respond_rows(&self, rows: RowSet) {
        self.lock().responses.push_back(Response::Rows(rows));
    }

    pub(crate) fn respond_affected(&self, count: u64) {
        self.lock().responses.push_back(Response::Affected(count));
    }

    /// The next execute fails; a `ConnectionLost` also marks the connection dead.
    pub(crate) fn fail_next(&self, err: DriverError) {
        self.lock().responses.push_back(Response::Fail(err));
    }

    pub(crate) fn fail_next_catalog(&self, err: DriverError) {
        self.lock().catalog_failures.push_back(err);
    }

    /// Lost connections keep reporting themselves alive.
    pub(crate) fn alive_after_loss(&self) {
        self.lock().alive_after_loss = true;
    }

    pub(crate) fn refuse_reconnect(&self) {
        self.lock().reconnects = false;
    }

    pub(crate) fn with_table(&self, name: &str, columns: Vec<ColumnInfo>) {
        self.lock().tables.insert(name.to_string(), columns);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub(crate) fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Statement calls only, catalog and liveness probes left out.
    pub(crate) fn statements(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Prepare(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    fn catalog_failure(state: &mut MockState) -> DriverResult<()> {
        match state.catalog_failures.pop_front() {
            Some(err) => {
                if err.is_connection_lost() && !state.alive_after_loss {
                    state.alive = false;
                }
                Err(err)
            }
            None => Ok(()),
        }
    }
}

impl Connection for MockConnection {
    fn prepare(&self, sql: &str) -> DriverResult<Box<dyn Prepared>> {
        self.lock().calls.push(Call::Prepare(sql.to_string()));
        Ok(Box::new(MockPrepared {
            sql: sql.to_string(),
            state: self.state.clone(),
        }))
    }

    fn is_alive(&self) -> bool {
        let mut state = self.lock();
        state.calls.push(Call::IsAlive);
        state.alive
    }

    fn reconnect(&self) -> bool {
        let mut state = self.lock();
        state.calls.push(Call::Reconnect);
        if state.reconnects {
            state.alive = true;
        }
        state.reconnects
    }

    fn list_tables(&self) -> DriverResult<Vec<String>> {
        let mut state = self.lock();
        state.calls.push(Call::ListTables);
        Self::catalog_failure(&mut state)?;
        let mut tables: Vec<String> = state.tables.keys().cloned().collect();
        tables.sort();
        Ok(tables)
    }

    fn describe_columns(&self, table: &str) -> DriverResult<Vec<ColumnInfo>> {
        let mut state = self.lock();
        state.calls.push(Call::DescribeColumns(table.to_string()));
        Self::catalog_failure(&mut state)?;
        Ok(state
            .tables
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default())
    }
}

struct MockPrepared {
    sql: String,
    state: Arc<Mutex<MockState>>,
}

impl Prepared for MockPrepared {
    fn bind(&mut self, index: usize, value: &Value) -> DriverResult<()> {
        self.state.lock().unwrap().calls.push(Call::Bind(index, value.clone()));
        Ok(())
    }

    fn execute(&mut self) -> DriverResult<Outcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Execute);
        match state.responses.pop_front() {
            Some(Response::Rows(rows)) => Ok(Outcome::Rows(Box::new(rows))),
            Some(Response::Affected(count)) => Ok(Outcome::Affected(count)),
            Some(Response::Fail(err)) => {
                if err.is_connection_lost() && !state.alive_after_loss {
                    state.alive = false;
                }
                Err(err)
            }
            None if self.sql.trim_start().to_ascii_uppercase().starts_with("SELECT") => {
                Ok(Outcome::Rows(Box::new(RowSet::new(Vec::<String>::new(), Vec::new()))))
            }
            None => Ok(Outcome::Affected(0)),
        }
    }

    fn close(&mut self) -> DriverResult<()> {
        self.state.lock().unwrap().calls.push(Call::Close);
        Ok(())
    }
}

pub(crate) fn database() -> (Database, MockConnection) {
    database_with(Settings::default())
}

pub(crate) fn database_with(settings: Settings) -> (Database, MockConnection) {
    let connection = MockConnection::default();
    let database = Database::new(Arc::new(connection.clone()), settings);
    (database, connection)
}
