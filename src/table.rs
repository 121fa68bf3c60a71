use std::fmt::Write;

use crate::{
    col::{ColumnType, Columns},
    connection::{Connection, DriverResult},
    database::Database,
    delete::Delete,
    error::{QueryError, Result},
    execute::Rendered,
    ident::{Ident, IntoIdent},
    insert::Insert,
    select::Select,
    update::Update,
    value::Value,
    writer::{FormatContext, FormatWriter},
};

/// `CREATE TABLE` with a single column, or `ALTER TABLE … ADD COLUMN`.
struct AddColumn<'a> {
    table: &'a Ident,
    column: &'a Ident,
    ty: ColumnType,
    default: Option<&'a Value>,
    create: bool,
}

impl FormatWriter for AddColumn<'_> {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        if self.create {
            context.writer.write_str("CREATE TABLE ")?;
            self.table.format_writer(context)?;
            context.writer.write_str(" (")?;
        } else {
            context.writer.write_str("ALTER TABLE ")?;
            self.table.format_writer(context)?;
            context.writer.write_str(" ADD COLUMN ")?;
        }
        self.column.format_writer(context)?;
        context.writer.write_char(' ')?;
        self.ty.format_writer(context)?;
        if let Some(default) = self.default {
            context.writer.write_str(" DEFAULT ")?;
            default.write_literal(&mut *context.writer)?;
        }
        if self.create {
            context.writer.write_char(')')?;
        }
        Ok(())
    }
}

struct DropColumn<'a> {
    table: &'a Ident,
    column: &'a Ident,
}

impl FormatWriter for DropColumn<'_> {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        context.writer.write_str("ALTER TABLE ")?;
        self.table.format_writer(context)?;
        context.writer.write_str(" DROP COLUMN ")?;
        self.column.format_writer(context)
    }
}

/// Entry point for statements on one table, plus its schema operations.
///
/// Existence and columns are read from the catalog on every call.
#[derive(Debug, Clone)]
pub struct Table {
    name: Ident,
    database: Database,
}

impl Table {
    pub(crate) fn new(name: Ident, database: Database) -> Self {
        Self { name, database }
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn select(&self) -> Select {
        Select::new(self.name.clone(), self.database.execution())
    }

    /// Loads the required-column set from the catalog for the insert preflight check.
    pub fn insert(&self) -> Result<Insert> {
        let required = if self.exists()? {
            self.columns()?.required()
        } else {
            Vec::new()
        };
        Ok(Insert::new(self.clone(), required, self.database.execution()))
    }

    pub fn update(&self) -> Update {
        Update::new(self.clone(), self.database.execution())
    }

    pub fn delete(&self) -> Delete {
        Delete::new(self.name.clone(), self.database.execution())
    }

    /// Runs a catalog call, reconnecting and retrying once if the connection dropped.
    pub(crate) fn catalog<T, F>(&self, what: &str, call: F) -> Result<T>
    where
        F: Fn(&dyn Connection) -> DriverResult<T>,
    {
        let connection: &dyn Connection = &**self.database.connection();
        match call(connection) {
            Ok(value) => Ok(value),
            Err(err) if err.is_connection_lost() => {
                let alive = connection.is_alive();
                tracing::warn!(table = %self.name, error = %err, alive, "connection lost during {what}, reconnecting once");
                if !connection.reconnect() {
                    return Err(QueryError::from_driver(err, what, &[]));
                }
                call(connection).map_err(|err| QueryError::from_driver(err, what, &[]))
            }
            Err(err) => Err(QueryError::from_driver(err, what, &[])),
        }
    }

    pub fn exists(&self) -> Result<bool> {
        let tables = self.catalog("list tables", |connection| connection.list_tables())?;
        Ok(tables.iter().any(|table| self.name.eq_ignore_case(table)))
    }

    pub fn columns(&self) -> Result<Columns> {
        Columns::load(self.clone())
    }

    pub fn primary_key(&self) -> Result<Vec<String>> {
        Ok(self.columns()?.primary_key())
    }

    /// Adds a column, creating the table with it when the table does not exist yet.
    pub fn add_column<C>(&self, ty: ColumnType, column: C, default: Option<Value>) -> Result<()>
    where
        C: IntoIdent,
    {
        let column = column.into_ident();
        ty.validate(self.name.as_str())?;

        let create = !self.exists()?;
        if !create && self.columns()?.contains(column.as_str()) {
            return Err(QueryError::schema(
                self.name.as_str(),
                format!("column `{column}` already exists"),
            ));
        }

        let ddl = AddColumn {
            table: &self.name,
            column: &column,
            ty,
            default: default.as_ref(),
            create,
        };
        let rendered = Rendered::of(&ddl, self.database.settings().dialect);
        tracing::info!(table = %self.name, column = %column, sql = %rendered.sql, "adding column");
        self.run(&rendered)
    }

    pub fn drop_column<C: IntoIdent>(&self, column: C) -> Result<()> {
        let column = column.into_ident();
        if !self.columns()?.contains(column.as_str()) {
            return Err(QueryError::schema(
                self.name.as_str(),
                format!("column `{column}` does not exist"),
            ));
        }
        let ddl = DropColumn {
            table: &self.name,
            column: &column,
        };
        let rendered = Rendered::of(&ddl, self.database.settings().dialect);
        tracing::info!(table = %self.name, column = %column, sql = %rendered.sql, "dropping column");
        self.run(&rendered)
    }

    /// Adds every column of `values` missing from the live schema; returns the added names.
    pub fn ensure_columns<'a, I>(&self, values: I) -> Result<Vec<Ident>>
    where
        I: IntoIterator<Item = (&'a Ident, &'a Value)>,
    {
        let existing = if self.exists()? {
            Some(self.columns()?)
        } else {
            None
        };
        let mut added = Vec::new();
        for (column, value) in values {
            let known = existing
                .as_ref()
                .is_some_and(|columns| columns.contains(column.as_str()));
            if known || added.contains(column) {
                continue;
            }
            self.add_column(ColumnType::for_value(value), column, None)?;
            added.push(column.clone());
        }
        Ok(added)
    }

    fn run(&self, rendered: &Rendered) -> Result<()> {
        let mut execution = self.database.execution();
        execution.run(rendered)?;
        execution.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Settings,
        connection::ColumnInfo,
        dialect::Dialect,
        error::DriverError,
        testing::{Call, database, database_with},
    };

    use super::*;

    #[test]
    fn test_exists_is_case_insensitive() {
        let (db, connection) = database();
        connection.with_table("Users", vec![ColumnInfo::new("id", "INT")]);
        assert!(db.table("users").exists().unwrap());
        assert!(!db.table("teams").exists().unwrap());
    }

    #[test]
    fn test_exists_retries_once() {
        let (db, connection) = database();
        connection.with_table("users", vec![]);
        connection.fail_next_catalog(DriverError::connection_lost("gone"));
        assert!(db.table("users").exists().unwrap());
        assert_eq!(1, connection.count(|call| matches!(call, Call::Reconnect)));
        assert_eq!(2, connection.count(|call| matches!(call, Call::ListTables)));
    }

    #[test]
    fn test_catalog_reconnects_even_when_reported_alive() {
        let (db, connection) = database();
        connection.alive_after_loss();
        connection.with_table("users", vec![]);
        connection.fail_next_catalog(DriverError::connection_lost("reset by peer"));
        assert!(db.table("users").exists().unwrap());
        assert_eq!(1, connection.count(|call| matches!(call, Call::Reconnect)));
    }

    #[test]
    fn test_exists_gives_up_after_second_drop() {
        let (db, connection) = database();
        connection.fail_next_catalog(DriverError::connection_lost("gone"));
        connection.fail_next_catalog(DriverError::connection_lost("still gone"));
        let err = db.table("users").exists().unwrap_err();
        assert!(err.is_connection());
        assert_eq!(2, connection.count(|call| matches!(call, Call::ListTables)));
    }

    #[test]
    fn test_add_column_creates_missing_table() {
        let (db, connection) = database();
        db.table("logs")
            .add_column(ColumnType::Varchar(64), "message", Some(Value::from("n/a")))
            .unwrap();
        assert_eq!(
            vec!["CREATE TABLE `logs` (`message` VARCHAR(64) DEFAULT 'n/a')".to_string()],
            connection.statements()
        );
    }

    #[test]
    fn test_add_column_alters_existing_table() {
        let (db, connection) = database_with(Settings::new(Dialect::Sqlite));
        connection.with_table("logs", vec![ColumnInfo::new("id", "INTEGER")]);
        db.table("logs")
            .add_column(ColumnType::Varchar(64), "message", None)
            .unwrap();
        assert_eq!(
            vec!["ALTER TABLE `logs` ADD COLUMN `message` TEXT".to_string()],
            connection.statements()
        );
    }

    #[test]
    fn test_add_existing_column_fails() {
        let (db, connection) = database();
        connection.with_table("logs", vec![ColumnInfo::new("message", "TEXT")]);
        let err = db
            .table("logs")
            .add_column(ColumnType::Text, "MESSAGE", None)
            .unwrap_err();
        assert!(err.is_schema());
        assert!(connection.statements().is_empty());
    }

    #[test]
    fn test_add_column_rejects_wide_varchar() {
        let (db, connection) = database();
        let err = db
            .table("logs")
            .add_column(ColumnType::Varchar(300), "message", None)
            .unwrap_err();
        assert!(err.is_schema());
        assert!(connection.calls().is_empty());
    }

    #[test]
    fn test_drop_column() {
        let (db, connection) = database();
        connection.with_table("logs", vec![ColumnInfo::new("message", "TEXT")]);
        let table = db.table("logs");
        assert!(table.drop_column("missing").unwrap_err().is_schema());
        table.drop_column("message").unwrap();
        assert_eq!(
            vec!["ALTER TABLE `logs` DROP COLUMN `message`".to_string()],
            connection.statements()
        );
    }
}
