use std::fmt::Write;

use indexmap::IndexMap;

use crate::{
    error::{QueryError, Result},
    execute::{Execution, Rendered, Statement, after_mutation},
    ident::{Ident, IntoIdent},
    predicate::{Conditions, Predicate},
    table::Table,
    value::{IntoValue, Value},
    writer::{FormatContext, FormatWriter},
};

#[derive(Debug, Default, Clone)]
struct UpdateQuery {
    table: Ident,
    values: IndexMap<Ident, Value>,
    conditions: Conditions,
    limit: Option<u64>,
}

impl FormatWriter for UpdateQuery {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        context.writer.write_str("UPDATE ")?;
        self.table.format_writer(context)?;
        for (index, (column, value)) in self.values.iter().enumerate() {
            context
                .writer
                .write_str(if index == 0 { " SET " } else { ", " })?;
            column.format_writer(context)?;
            context.writer.write_str(" = ")?;
            value.format_writer(context)?;
        }
        if !self.conditions.is_empty() {
            context.writer.write_str(" WHERE ")?;
            self.conditions.format_writer(context)?;
        }
        if let Some(limit) = self.limit {
            write!(context.writer, " LIMIT {limit}")?;
        }
        Ok(())
    }
}

/// `UPDATE table SET col = ?, … [WHERE …] [LIMIT n]`
///
/// SET values bind before the WHERE values.
#[derive(Debug, Clone)]
pub struct Update {
    query: UpdateQuery,
    target: Table,
    auto_migrate: bool,
    cache: Option<Rendered>,
    execution: Execution,
}

impl Update {
    pub(crate) fn new(target: Table, execution: Execution) -> Self {
        Self {
            query: UpdateQuery {
                table: target.name().clone(),
                ..Default::default()
            },
            target,
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

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.query.limit = Some(limit);
        self.invalidate();
        self
    }

    /// Adds SET columns missing from the live schema before running.
    pub fn auto_migrate(&mut self, enabled: bool) -> &mut Self {
        self.auto_migrate = enabled;
        self
    }
}

impl Predicate for Update {
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

impl Statement for Update {
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

    /// Rows reported changed by the driver.
    fn row_count(&mut self) -> Result<u64> {
        self.affected_rows()
    }

    fn is_ready(&self) -> bool {
        !self.query.values.is_empty()
    }

    fn preflight(&mut self) -> Result<()> {
        if self.query.values.is_empty() {
            let table = self.query.table.as_str().to_string();
            return Err(QueryError::preflight(&table, "no values to set", self.rendered()));
        }
        if self.auto_migrate {
            let added = self.target.ensure_columns(&self.query.values)?;
            if !added.is_empty() {
                tracing::info!(table = %self.query.table, added = ?added, "migrated columns before update");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        State,
        connection::ColumnInfo,
        error::DriverError,
        testing::{Call, database},
    };

    use super::*;

    #[test]
    fn test_set_binds_before_where() {
        let (db, _) = database();
        let mut update = db.table("users").update();
        update
            .value("name", "ann")
            .value("visits", 4)
            .where_("id")
            .matches(7)
            .or()
            .where_("email")
            .like("%@old.org");
        update.limit(10);
        assert_eq!(
            "UPDATE `users` SET `name` = ?, `visits` = ? WHERE `id` = ? OR `email` LIKE ? LIMIT 10",
            update.to_sql()
        );
        assert_eq!(
            &[
                Value::from("ann"),
                Value::Int(4),
                Value::Int(7),
                Value::from("%@old.org"),
            ],
            update.bound_values()
        );
    }

    #[test]
    fn test_repeated_column_keeps_position() {
        let (db, _) = database();
        let mut update = db.table("users").update();
        update.values([("a", 1), ("b", 2)]).value("a", 3);
        assert_eq!("UPDATE `users` SET `a` = ?, `b` = ?", update.to_sql());
        assert_eq!(&[Value::Int(3), Value::Int(2)], update.bound_values());
    }

    #[test]
    fn test_empty_set_is_a_preflight_error() {
        let (db, connection) = database();
        let mut update = db.table("users").update();
        update.where_("id").matches(1);
        let err = update.execute().unwrap_err();
        assert!(err.is_preflight());
        assert_eq!(Some("UPDATE `users` WHERE `id` = ?"), err.sql());
        assert_eq!(Some(&err), update.last_error());
        assert!(connection.calls().is_empty());
    }

    #[test]
    fn test_row_count_is_affected_rows() {
        let (db, connection) = database();
        connection.respond_affected(3);
        let mut update = db.table("users").update();
        update.value("active", false).where_("team").matches(2);
        assert_eq!(3, update.row_count().unwrap());
        // cached until the statement changes
        assert_eq!(3, update.row_count().unwrap());
        assert_eq!(1, connection.count(|call| matches!(call, Call::Execute)));

        connection.respond_affected(1);
        update.where_("id").matches(9);
        assert_eq!(State::Unexecuted, update.state());
        assert_eq!(1, update.row_count().unwrap());
        assert_eq!(
            vec![
                "UPDATE `users` SET `active` = ? WHERE `team` = ?".to_string(),
                "UPDATE `users` SET `active` = ? WHERE `team` = ? AND `id` = ?".to_string(),
            ],
            connection.statements()
        );
    }

    #[test]
    fn test_mutation_clears_stored_failure() {
        let (db, connection) = database();
        let mut update = db.table("users").update();
        update.where_("id").matches(1);
        let err = update.execute().unwrap_err();
        assert_eq!(Some("UPDATE `users` WHERE `id` = ?"), err.sql());

        connection.respond_affected(1);
        update.value("name", "x");
        assert_eq!(None, update.last_error());
        assert_eq!(1, update.row_count().unwrap());
        assert_eq!(
            vec!["UPDATE `users` SET `name` = ? WHERE `id` = ?".to_string()],
            connection.statements()
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let (db, _) = database();
        let mut base = db.table("users").update();
        base.value("active", false);
        let mut narrowed = base.clone();
        narrowed.where_("id").matches(1);
        assert_eq!("UPDATE `users` SET `active` = ?", base.to_sql());
        assert_eq!(
            "UPDATE `users` SET `active` = ? WHERE `id` = ?",
            narrowed.to_sql()
        );
        assert_eq!(&[Value::Bool(false)], base.bound_values());
        assert_eq!(&[Value::Bool(false), Value::Int(1)], narrowed.bound_values());

        // the other direction, on a statement that already has a WHERE tree
        let mut original = db.table("users").update();
        original.value("active", true).where_("team").matches(2);
        let mut copy = original.clone();
        copy.or().where_("team").matches(3);
        copy.value("active", false);
        assert_eq!(
            "UPDATE `users` SET `active` = ? WHERE `team` = ?",
            original.to_sql()
        );
        assert_eq!(&[Value::Bool(true), Value::Int(2)], original.bound_values());
        assert_eq!(
            &[Value::Bool(false), Value::Int(2), Value::Int(3)],
            copy.bound_values()
        );
    }

    #[test]
    fn test_retry_once_on_connection_loss() {
        let (db, connection) = database();
        connection.fail_next(DriverError::connection_lost("server closed the connection"));
        connection.respond_affected(1);
        let mut update = db.table("users").update();
        update.value("name", "bob");
        assert_eq!(1, update.row_count().unwrap());
        assert_eq!(1, connection.count(|call| matches!(call, Call::Reconnect)));
        assert_eq!(2, connection.count(|call| matches!(call, Call::Prepare(_))));
        assert_eq!(2, connection.count(|call| matches!(call, Call::Execute)));
    }

    #[test]
    fn test_second_connection_loss_fails() {
        let (db, connection) = database();
        connection.fail_next(DriverError::connection_lost("gone"));
        connection.fail_next(DriverError::connection_lost("gone again"));
        connection.respond_affected(1);
        let mut update = db.table("users").update();
        update.value("name", "bob");
        let err = update.execute().unwrap_err();
        assert!(err.is_connection());
        assert_eq!(&[Value::from("bob")], err.binds());
        assert_eq!(2, connection.count(|call| matches!(call, Call::Execute)));

        // accessors report the stored failure without another round trip
        assert_eq!(err, update.row_count().unwrap_err());
        assert_eq!(2, connection.count(|call| matches!(call, Call::Execute)));
    }

    #[test]
    fn test_reconnects_even_when_reported_alive() {
        let (db, connection) = database();
        connection.alive_after_loss();
        connection.fail_next(DriverError::connection_lost("reset by peer"));
        connection.respond_affected(2);
        let mut update = db.table("users").update();
        update.value("name", "bob");
        assert_eq!(2, update.row_count().unwrap());
        assert_eq!(1, connection.count(|call| matches!(call, Call::Reconnect)));
        assert_eq!(2, connection.count(|call| matches!(call, Call::Execute)));
    }

    #[test]
    fn test_refused_reconnect_fails_without_retry() {
        let (db, connection) = database();
        connection.refuse_reconnect();
        connection.fail_next(DriverError::connection_lost("gone"));
        let mut update = db.table("users").update();
        update.value("name", "bob");
        assert!(update.execute().unwrap_err().is_connection());
        assert_eq!(1, connection.count(|call| matches!(call, Call::Execute)));
    }

    #[test]
    fn test_auto_migrate_adds_set_columns() {
        let (db, connection) = database();
        connection.with_table("users", vec![ColumnInfo::new("id", "INT")]);
        let mut update = db.table("users").update();
        update.auto_migrate(true).value("nickname", "bo").where_("id").matches(1);
        update.execute().unwrap();
        assert_eq!(
            vec![
                "ALTER TABLE `users` ADD COLUMN `nickname` VARCHAR(256)".to_string(),
                "UPDATE `users` SET `nickname` = ? WHERE `id` = ?".to_string(),
            ],
            connection.statements()
        );
    }
}
