use std::fmt::Write;

use crate::{
    error::Result,
    execute::{Execution, Rendered, Statement, after_mutation},
    ident::Ident,
    predicate::{Conditions, Predicate},
    writer::{FormatContext, FormatWriter},
};

#[derive(Debug, Default, Clone)]
struct DeleteQuery {
    table: Ident,
    conditions: Conditions,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl FormatWriter for DeleteQuery {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        context.writer.write_str("DELETE FROM ")?;
        self.table.format_writer(context)?;
        if !self.conditions.is_empty() {
            context.writer.write_str(" WHERE ")?;
            self.conditions.format_writer(context)?;
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

/// `DELETE FROM table [WHERE …] [LIMIT n] [OFFSET n]`
#[derive(Debug, Clone)]
pub struct Delete {
    query: DeleteQuery,
    cache: Option<Rendered>,
    execution: Execution,
}

impl Delete {
    pub(crate) fn new(table: Ident, execution: Execution) -> Self {
        Self {
            query: DeleteQuery {
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
}

impl Predicate for Delete {
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

impl Statement for Delete {
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

    fn row_count(&mut self) -> Result<u64> {
        self.affected_rows()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        predicate::Filter,
        testing::{Call, database},
        value::Value,
    };

    use super::*;

    #[test]
    fn test_delete_all() {
        let (db, _) = database();
        let mut delete = db.table("sessions").delete();
        assert_eq!("DELETE FROM `sessions`", delete.to_sql());
        assert!(!delete.has_where());
    }

    #[test]
    fn test_delete_with_filter_and_paging() {
        let (db, _) = database();
        let mut delete = db.table("sessions").delete();
        delete
            .where_filter(Filter::new().with("user_id", 5).with("|expired", true))
            .limit(100)
            .offset(10);
        assert_eq!(
            "DELETE FROM `sessions` WHERE `user_id` = ? OR `expired` = ? LIMIT 100 OFFSET 10",
            delete.to_sql()
        );
        assert_eq!(&[Value::Int(5), Value::Bool(true)], delete.bound_values());
    }

    #[test]
    fn test_delete_reports_affected_rows() {
        let (db, connection) = database();
        connection.respond_affected(12);
        let mut delete = db.table("sessions").delete();
        delete.where_("expires_at").less_than(1_700_000_000);
        assert_eq!(12, delete.row_count().unwrap());
        assert_eq!(
            vec![
                Call::Prepare("DELETE FROM `sessions` WHERE `expires_at` < ?".to_string()),
                Call::Bind(1, Value::Int(1_700_000_000)),
                Call::Execute,
            ],
            connection.calls()
        );
    }

    #[test]
    fn test_where_group_on_delete() {
        let (db, _) = database();
        let mut delete = db.table("t").delete();
        delete.where_("a").matches(1).group(|group| {
            group.where_("b").matches(2).or().where_("c").matches(3);
        });
        assert_eq!(
            "DELETE FROM `t` WHERE `a` = ? AND (`b` = ? OR `c` = ?)",
            delete.to_sql()
        );
    }
}
