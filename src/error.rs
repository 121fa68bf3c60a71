//! Error types for sqlweave

use thiserror::Error;

use crate::{execute::Rendered, value::Value};

/// Result type alias for sqlweave operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// What went wrong inside the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The connection dropped; the engine may reconnect and retry once.
    ConnectionLost,
    /// Anything else: syntax, constraint, type errors.
    Other,
}

/// Error reported by a [`Connection`](crate::Connection) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::ConnectionLost,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn is_connection_lost(&self) -> bool {
        self.kind == DriverErrorKind::ConnectionLost
    }
}

/// Error types for statement building and execution.
///
/// Errors are `Clone` so a statement can keep its last failure and report it again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// No live connection, even after one reconnect attempt.
    #[error("Connection error: {source} (sql: {sql})")]
    Connection {
        sql: String,
        binds: Vec<Value>,
        #[source]
        source: DriverError,
    },

    /// Any other execution failure; never retried.
    #[error("Driver error: {source} (sql: {sql})")]
    Driver {
        sql: String,
        binds: Vec<Value>,
        #[source]
        source: DriverError,
    },

    /// Table or column creation conflict.
    #[error("Schema error on `{table}`: {message}")]
    Schema { table: String, message: String },

    /// Rejected before reaching the driver, e.g. an insert missing required columns.
    #[error("Preflight error on `{table}`: {message}")]
    Preflight {
        table: String,
        message: String,
        missing: Vec<String>,
        sql: String,
        binds: Vec<Value>,
    },

    /// Map-shaped filter that cannot be turned into a predicate.
    #[error("Filter error: {0}")]
    Filter(String),
}

impl QueryError {
    pub(crate) fn from_driver(err: DriverError, sql: &str, binds: &[Value]) -> Self {
        if err.is_connection_lost() {
            Self::Connection {
                sql: sql.to_string(),
                binds: binds.to_vec(),
                source: err,
            }
        } else {
            Self::Driver {
                sql: sql.to_string(),
                binds: binds.to_vec(),
                source: err,
            }
        }
    }

    /// Create a schema error for a table
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    pub(crate) fn missing_columns(table: &str, missing: Vec<String>, rendered: &Rendered) -> Self {
        Self::Preflight {
            table: table.to_string(),
            message: format!("missing required columns {}", missing.join(", ")),
            missing,
            sql: rendered.sql.clone(),
            binds: rendered.binds.clone(),
        }
    }

    pub(crate) fn preflight(table: &str, message: impl Into<String>, rendered: &Rendered) -> Self {
        Self::Preflight {
            table: table.to_string(),
            message: message.into(),
            missing: Vec::new(),
            sql: rendered.sql.clone(),
            binds: rendered.binds.clone(),
        }
    }

    /// Required columns an insert was missing, empty for other errors.
    pub fn missing(&self) -> &[String] {
        match self {
            Self::Preflight { missing, .. } => missing,
            _ => &[],
        }
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Check if this is a non-retryable driver error
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver { .. })
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    pub fn is_preflight(&self) -> bool {
        matches!(self, Self::Preflight { .. })
    }

    /// The SQL text involved, when the error came from a statement.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Connection { sql, .. } | Self::Driver { sql, .. } | Self::Preflight { sql, .. } => {
                Some(sql)
            }
            Self::Schema { .. } | Self::Filter(_) => None,
        }
    }

    pub fn binds(&self) -> &[Value] {
        match self {
            Self::Connection { binds, .. }
            | Self::Driver { binds, .. }
            | Self::Preflight { binds, .. } => binds,
            Self::Schema { .. } | Self::Filter(_) => &[],
        }
    }
}
