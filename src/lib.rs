//! Fluent SQL statements with a blocking execution engine.
//!
//! Start from a [`Database`], pick a [`Table`] and build a [`Select`], [`Insert`],
//! [`Update`] or [`Delete`]. Statements render to SQL with `?` placeholders and run lazily
//! through the [`Connection`] supplied by the host.

mod col;
mod connection;
mod database;
mod delete;
mod dialect;
mod error;
mod execute;
mod ident;
mod insert;
mod operator;
pub mod predicate;
mod query;
mod row;
mod select;
mod settings;
mod table;
mod update;
mod value;
mod writer;

#[cfg(test)]
mod testing;

pub use col::{ColumnType, Columns, MAX_VARCHAR};
pub use connection::{ColumnInfo, Connection, Cursor, DriverResult, Outcome, Prepared, RowSet};
pub use database::Database;
pub use delete::Delete;
pub use dialect::Dialect;
pub use error::{DriverError, DriverErrorKind, QueryError, Result};
pub use execute::{Execution, Rendered, State, Statement};
pub use ident::{Ident, IntoIdent};
pub use insert::Insert;
pub use operator::Operator;
pub use predicate::{Filter, FilterValue, Group, Predicate};
pub use query::Query;
pub use row::Row;
pub use select::{Ordering, Select};
pub use settings::Settings;
pub use table::Table;
pub use update::Update;
pub use value::{IntoValue, Value};

pub fn ident_static(value: &'static str) -> Ident {
    Ident::new_static(value)
}

pub fn ident(value: &str) -> Ident {
    Ident::new(value)
}

/// Builds a [`Filter`] from `key => value` pairs; see [`Filter`] for the key prefixes.
///
/// ```
/// let filter = sqlweave::filter! { "name" => "bob", "|email" => "bob@example.com" };
/// assert_eq!(2, filter.len());
/// ```
#[macro_export]
macro_rules! filter {
    () => {
        $crate::Filter::new()
    };
    ( $($key:expr => $value:expr),+ $(,)? ) => {
        $crate::Filter::new()$(.with($key, $value))+
    };
}
