use std::fmt::Write;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{
    connection::ColumnInfo,
    error::{QueryError, Result},
    table::Table,
    value::Value,
    writer::{FormatContext, FormatWriter},
};

/// Longest `VARCHAR` the engine will create.
pub const MAX_VARCHAR: u16 = 256;

/// Column types the engine can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    BigInt,
    Double,
    Boolean,
    Text,
    Varchar(u16),
    Blob,
    Timestamp,
}

impl ColumnType {
    /// Type picked when auto-migration adds a column for `value`.
    pub fn for_value(value: &Value) -> Self {
        match value {
            Value::Int(_) | Value::UInt(_) => ColumnType::BigInt,
            Value::Float(_) => ColumnType::Double,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Text(text) if text.len() <= usize::from(MAX_VARCHAR) => {
                ColumnType::Varchar(MAX_VARCHAR)
            }
            Value::Text(_) | Value::Null => ColumnType::Text,
            Value::Bytes(_) => ColumnType::Blob,
        }
    }

    pub(crate) fn validate(&self, table: &str) -> Result<()> {
        match self {
            ColumnType::Varchar(0) => Err(QueryError::schema(table, "VARCHAR length must be positive")),
            ColumnType::Varchar(length) if *length > MAX_VARCHAR => Err(QueryError::schema(
                table,
                format!("VARCHAR({length}) exceeds the {MAX_VARCHAR} byte limit"),
            )),
            _ => Ok(()),
        }
    }
}

impl FormatWriter for ColumnType {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        match self {
            ColumnType::Integer => context.writer.write_str("INTEGER"),
            ColumnType::BigInt => context.writer.write_str("BIGINT"),
            ColumnType::Double => context.writer.write_str("DOUBLE"),
            ColumnType::Boolean => context.writer.write_str("BOOLEAN"),
            ColumnType::Text => context.writer.write_str("TEXT"),
            ColumnType::Varchar(length) if context.dialect.has_bounded_varchar() => {
                write!(context.writer, "VARCHAR({length})")
            }
            ColumnType::Varchar(_) => context.writer.write_str("TEXT"),
            ColumnType::Blob => context.writer.write_str("BLOB"),
            ColumnType::Timestamp => context.writer.write_str("TIMESTAMP"),
        }
    }
}

/// Column set of a table as the catalog reported it at load time.
#[derive(Debug, Clone)]
pub struct Columns {
    table: Table,
    columns: IndexMap<SmolStr, ColumnInfo>,
}

impl Columns {
    pub(crate) fn load(table: Table) -> Result<Self> {
        let mut columns = Self {
            table,
            columns: IndexMap::new(),
        };
        columns.refresh()?;
        Ok(columns)
    }

    /// Re-queries the catalog.
    pub fn refresh(&mut self) -> Result<&mut Self> {
        let name = self.table.name().as_str().to_string();
        let described = self
            .table
            .catalog("describe columns", |connection| connection.describe_columns(&name))?;
        self.columns = described
            .into_iter()
            .map(|info| (SmolStr::new(&info.name), info))
            .collect();
        Ok(self)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, info)| info)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(SmolStr::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.values()
    }

    /// Columns an insert has to supply.
    pub fn required(&self) -> Vec<String> {
        self.columns
            .values()
            .filter(|info| info.is_required())
            .map(|info| info.name.clone())
            .collect()
    }

    pub fn is_required(&self, column: &str) -> bool {
        self.get(column).is_some_and(ColumnInfo::is_required)
    }

    pub fn primary_key(&self) -> Vec<String> {
        self.columns
            .values()
            .filter(|info| info.primary_key)
            .map(|info| info.name.clone())
            .collect()
    }
}
