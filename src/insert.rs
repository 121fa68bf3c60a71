use std::fmt::Write;

use indexmap::IndexMap;

use crate::{
    error::{QueryError, Result},
    execute::{Execution, Rendered, Statement, after_mutation},
    ident::{Ident, IntoIdent},
    table::Table,
    value::{IntoValue, Value},
    writer::{FormatContext, FormatWriter},
};

#[derive(Debug, Default, Clone)]
struct InsertQuery {
    table: Ident,
    values: IndexMap<Ident, Value>,
}

impl FormatWriter for InsertQuery {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        context.writer.write_str("INSERT INTO ")?;
        self.table.format_writer(context)?;
        context.writer.write_str(" (")?;
        for (index, column) in self.values.keys().enumerate() {
            if index > 0 {
                context.writer.write_str(", ")?;
            }
            column.format_writer(context)?;
        }
        context.writer.write_str(") VALUES (")?;
        for (index, value) in self.values.values().enumerate() {
            if index > 0 {
                context.writer.write_str(", ")?;
            }
            value.format_writer(context)?;
        }
        context.writer.write_char(')')
    }
}

/// `INSERT INTO table (cols) VALUES (…)`
///
/// Created by [`Table::insert`], which reads the table's required columns once. Running
/// the insert without all of them fails with a preflight error before the driver is
/// touched.
#[derive(Debug, Clone)]
pub struct Insert {
    query: InsertQuery,
    target: Table,
    required: Vec<String>,
    auto_migrate: bool,
    cache: Option<Rendered>,
    execution: Execution,
}

impl Insert {
    pub(crate) fn new(target: Table, required: Vec<String>, execution: Execution) -> Self {
        Self {
            query: InsertQuery {
                table: target.name().clone(),
                values: IndexMap::new(),
            },
            target,
            required,
            auto_migrate: false,
            cache: None,
            execution,
        }
    }

    fn invalidate(&mut self) {
        self.cache = None;
        after_mutation(self);
    }

    pub fn table(&self) -> &Table {
        &self.target
    }

    pub fn required_columns(&self) -> &[String] {
        &self.required
    }

    /// Sets one column; a repeated column keeps its first position.
    pub fn value<C, V>(&mut self, column: C, value: V) -> &mut Self
    where
        C: IntoIdent,
        V: IntoValue,
    {
        self.query.values.insert(column.into_ident(), value.into_value());
        self.invalidate();
        self
    }

    pub fn values<I, C, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: IntoIdent,
        V: IntoValue,
    {
        for (column, value) in values {
            self.query.values.insert(column.into_ident(), value.into_value());
        }
        self.invalidate();
        self
    }

    pub fn clear_values(&mut self) -> &mut Self {
        self.query.values.clear();
        self.invalidate();
        self
    }

    /// Adds columns missing from the live schema before running.
    pub fn auto_migrate(&mut self, enabled: bool) -> &mut Self {
        self.auto_migrate = enabled;
        self
    }

    /// Required columns absent from the value map, in schema order.
    pub fn missing_columns(&self) -> Vec<String> {
        self.required
            .iter()
            .filter(|required| {
                !self
                    .query
                    .values
                    .keys()
                    .any(|column| column.eq_ignore_case(required))
            })
            .cloned()
            .collect()
    }
}

impl Statement for Insert {
    fn execution(&self) -> &Execution {
        &self.execution
    }

    fn execution_mut(&mut self) -> &mut Execution {
        &mut self.execution
    }

    fn rendered(&mut self) -> &Rendered {
        let dialect = self.execution.dialect();
        self.cache
            .get_or_insert_with(|| Rendered::of(&self.query, dialect))
    }

    /// Rows reported inserted by the driver.
    fn row_count(&mut self) -> Result<u64> {
        self.affected_rows()
    }

    fn is_ready(&self) -> bool {
        !self.query.values.is_empty()
    }

    fn preflight(&mut self) -> Result<()> {
        let missing = self.missing_columns();
        if !missing.is_empty() {
            let table = self.query.table.as_str().to_string();
            return Err(QueryError::missing_columns(&table, missing, self.rendered()));
        }
        if self.query.values.is_empty() {
            let table = self.query.table.as_str().to_string();
            return Err(QueryError::preflight(&table, "no values to insert", self.rendered()));
        }
        if self.auto_migrate {
            let added = self.target.ensure_columns(&self.query.values)?;
            if !added.is_empty() {
                tracing::info!(table = %self.query.table, added = ?added, "migrated columns before insert");
            }
        }
        Ok(())
    }
}
