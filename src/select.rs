use std::fmt::Write;

use crate::{
    error::Result,
    execute::{Execution, Rendered, Statement, after_mutation},
    ident::{Ident, IntoIdent},
    predicate::{Conditions, Predicate},
    row::Row,
    writer::{FormatContext, FormatWriter},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    #[default]
    Asc,
    Desc,
}

impl FormatWriter for Ordering {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        match self {
            Ordering::Asc => context.writer.write_str("ASC"),
            Ordering::Desc => context.writer.write_str("DESC"),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct SelectQuery {
    table: Ident,
    fields: Vec<Ident>,
    conditions: Conditions,
    group_by: Vec<Ident>,
    order_by: Vec<Ident>,
    ordering: Ordering,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQuery {
    fn format_from<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        context.writer.write_str(" FROM ")?;
        self.table.format_writer(context)?;
        if !self.conditions.is_empty() {
            context.writer.write_str(" WHERE ")?;
            self.conditions.format_writer(context)?;
        }
        Ok(())
    }
}

impl FormatWriter for SelectQuery {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        context.writer.write_str("SELECT ")?;
        if self.fields.is_empty() {
            context.writer.write_char('*')?;
        } else {
            context.write_list(&self.fields)?;
        }
        self.format_from(context)?;
        if !self.group_by.is_empty() {
            context.writer.write_str(" GROUP BY ")?;
            context.write_list(&self.group_by)?;
        }
        if !self.order_by.is_empty() {
            context.writer.write_str(" ORDER BY ")?;
            context.write_list(&self.order_by)?;
            context.writer.write_char(' ')?;
            self.ordering.format_writer(context)?;
        }
        if let Some(limit) = self.limit {
            write!(context.writer, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(context.writer, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

/// `SELECT COUNT(*)` over the same table and WHERE tree. A grouped select counts its
/// groups through a subquery. Ordering, LIMIT and OFFSET never apply.
struct CountQuery<'a>(&'a SelectQuery);

impl FormatWriter for CountQuery<'_> {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        let query = self.0;
        context.writer.write_str("SELECT COUNT(*)")?;
        if query.group_by.is_empty() {
            return query.format_from(context);
        }
        context.writer.write_str(" FROM (SELECT ")?;
        context.write_list(&query.group_by)?;
        query.format_from(context)?;
        context.writer.write_str(" GROUP BY ")?;
        context.write_list(&query.group_by)?;
        context.writer.write_str(") AS ")?;
        Ident::new_static("counted").format_writer(context)
    }
}

/// `SELECT fields FROM table [WHERE …] [GROUP BY …] [ORDER BY … ASC|DESC] [LIMIT n] [OFFSET n]`
#[derive(Debug, Clone)]
pub struct Select {
    query: SelectQuery,
    cache: Option<Rendered>,
    execution: Execution,
}

impl Select {
    pub(crate) fn new(table: Ident, execution: Execution) -> Self {
        Self {
            query: SelectQuery {
                table,
                ..Default::default()
            },
            cache: None,
            execution,
        }
    }

    fn invalidate(&mut self) {
        self.cache = None;
        after_mutation(self);
    }

    pub fn table(&self) -> &Ident {
        &self.query.table
    }

    /// Replaces the projection. An empty projection selects `*`.
    pub fn fields<I>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: IntoIdent,
    {
        self.query.fields = fields.into_iter().map(IntoIdent::into_ident).collect();
        self.invalidate();
        self
    }

    pub fn add_field<C: IntoIdent>(&mut self, field: C) -> &mut Self {
        self.query.fields.push(field.into_ident());
        self.invalidate();
        self
    }

    pub fn reset_fields(&mut self) -> &mut Self {
        self.query.fields.clear();
        self.invalidate();
        self
    }

    pub fn group_by<I>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: IntoIdent,
    {
        self.query.group_by = columns.into_iter().map(IntoIdent::into_ident).collect();
        self.invalidate();
        self
    }

    /// Orders ascending by `columns`.
    pub fn order_by<I>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: IntoIdent,
    {
        self.query.order_by = columns.into_iter().map(IntoIdent::into_ident).collect();
        self.query.ordering = Ordering::Asc;
        self.invalidate();
        self
    }

    pub fn order_by_desc<I>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: IntoIdent,
    {
        self.query.order_by = columns.into_iter().map(IntoIdent::into_ident).collect();
        self.query.ordering = Ordering::Desc;
        self.invalidate();
        self
    }

    pub fn ordering(&mut self, ordering: Ordering) -> &mut Self {
        self.query.ordering = ordering;
        self.invalidate();
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.query.limit = Some(limit);
        self.invalidate();
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.query.offset = Some(offset);
        self.invalidate();
        self
    }

    /// Limits to one row and returns it.
    pub fn first(&mut self) -> Result<Option<Row>> {
        if self.query.limit != Some(1) {
            self.limit(1);
        }
        self.row_first()
    }
}

impl Predicate for Select {
    fn conditions(&self) -> &Conditions {
        &self.query.conditions
    }

    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.query.conditions
    }

    fn touched(&mut self) {
        self.invalidate();
    }
}

impl Statement for Select {
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

    /// Issues a secondary `SELECT COUNT(*)` with the same WHERE tree. The count covers every
    /// matching row (or group, when grouped) regardless of LIMIT and OFFSET.
    fn row_count(&mut self) -> Result<u64> {
        let rendered = Rendered::of(&CountQuery(&self.query), self.execution.dialect());
        self.execution.count(&rendered)
    }
}
