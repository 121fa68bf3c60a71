//! The driver seam.
//!
//! The engine never owns a socket or a pool. Everything it sends to the database goes
//! through [`Connection`], which implementations are expected to serialize or pool
//! internally.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::{error::DriverError, row::Row, value::Value};

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// A live (or recoverable) database handle.
pub trait Connection: Send + Sync {
    fn prepare(&self, sql: &str) -> DriverResult<Box<dyn Prepared>>;

    /// Liveness as the driver sees it. Only logged; a lost connection is always followed by
    /// [`Connection::reconnect`], since drivers may report the drop before this flips.
    fn is_alive(&self) -> bool;

    /// Attempts to re-establish the session; `false` when it could not.
    fn reconnect(&self) -> bool;

    /// Names of the tables in the current schema.
    fn list_tables(&self) -> DriverResult<Vec<String>>;

    /// Column metadata for `table`, empty when the table is missing.
    fn describe_columns(&self, table: &str) -> DriverResult<Vec<ColumnInfo>>;
}

/// A prepared statement. Positions are 1-based, like the placeholders they fill.
pub trait Prepared {
    fn bind(&mut self, index: usize, value: &Value) -> DriverResult<()>;

    fn execute(&mut self) -> DriverResult<Outcome>;

    fn close(&mut self) -> DriverResult<()> {
        Ok(())
    }
}

pub enum Outcome {
    Rows(Box<dyn Cursor>),
    Affected(u64),
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Rows(_) => f.write_str("Outcome::Rows(..)"),
            Outcome::Affected(count) => write!(f, "Outcome::Affected({count})"),
        }
    }
}

/// A scrollable result cursor.
///
/// A fresh cursor sits on the header position, before the first row. Row numbers passed
/// to [`Cursor::absolute`] are 1-based.
pub trait Cursor {
    fn next(&mut self) -> DriverResult<bool>;

    fn first(&mut self) -> DriverResult<bool>;

    fn last(&mut self) -> DriverResult<bool>;

    fn absolute(&mut self, row: usize) -> DriverResult<bool>;

    /// The row under the cursor, `None` on the header or past the end.
    fn current(&self) -> Option<Row>;
}

/// Fully buffered cursor. Drivers without native scrolling can collect into one.
#[derive(Debug, Clone)]
pub struct RowSet {
    columns: Arc<[SmolStr]>,
    rows: Vec<Vec<Value>>,
    // 0 is the header, 1..=len are rows, len + 1 is past the end
    position: usize,
}

impl RowSet {
    pub fn new<C, I>(columns: C, rows: Vec<Vec<Value>>) -> Self
    where
        C: IntoIterator<Item = I>,
        I: Into<SmolStr>,
    {
        let columns: Vec<SmolStr> = columns.into_iter().map(Into::into).collect();
        Self {
            columns: Arc::from(columns),
            rows,
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn seek(&mut self, position: usize) -> bool {
        self.position = position.min(self.rows.len() + 1);
        (1..=self.rows.len()).contains(&self.position)
    }
}

impl Cursor for RowSet {
    fn next(&mut self) -> DriverResult<bool> {
        Ok(self.seek(self.position + 1))
    }

    fn first(&mut self) -> DriverResult<bool> {
        Ok(self.seek(1))
    }

    fn last(&mut self) -> DriverResult<bool> {
        Ok(self.seek(self.rows.len()))
    }

    fn absolute(&mut self, row: usize) -> DriverResult<bool> {
        Ok(self.seek(row))
    }

    fn current(&self) -> Option<Row> {
        let values = self.rows.get(self.position.checked_sub(1)?)?;
        Some(Row::new(self.columns.clone(), values.clone()))
    }
}

/// Column metadata as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
    pub primary_key: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            default: None,
            auto_increment: false,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Must be supplied on insert: non-null, no default, not generated.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none() && !self.auto_increment
    }
}
