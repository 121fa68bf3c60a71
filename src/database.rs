use std::{fmt, sync::Arc};

use crate::{
    connection::Connection,
    execute::Execution,
    ident::IntoIdent,
    query::Query,
    settings::Settings,
    table::Table,
};

/// A shared connection plus the settings every statement created from it inherits.
#[derive(Clone)]
pub struct Database {
    connection: Arc<dyn Connection>,
    settings: Settings,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn new(connection: Arc<dyn Connection>, settings: Settings) -> Self {
        tracing::debug!(dialect = ?settings.dialect, auto_execute = settings.auto_execute, "database handle created");
        Self {
            connection,
            settings,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn table<T: IntoIdent>(&self, name: T) -> Table {
        Table::new(name.into_ident(), self.clone())
    }

    /// Raw SQL with `?` placeholders.
    pub fn query(&self, sql: impl Into<String>) -> Query {
        Query::new(sql, self.execution())
    }

    pub(crate) fn execution(&self) -> Execution {
        Execution::new(self.connection.clone(), self.settings)
    }
}
