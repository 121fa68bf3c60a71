use crate::{
    error::Result,
    execute::{Execution, Rendered, Statement, after_mutation},
    value::IntoValue,
};

/// Hand-written SQL run through the same execution engine as the builders.
///
/// `?` placeholders are bound in the order [`Query::bind`] was called. The text is sent
/// as given.
#[derive(Debug, Clone)]
pub struct Query {
    rendered: Rendered,
    execution: Execution,
}

impl Query {
    pub(crate) fn new(sql: impl Into<String>, execution: Execution) -> Self {
        Self {
            rendered: Rendered {
                sql: sql.into(),
                binds: Vec::new(),
            },
            execution,
        }
    }

    pub fn bind<V: IntoValue>(&mut self, value: V) -> &mut Self {
        self.rendered.binds.push(value.into_value());
        after_mutation(self);
        self
    }

    pub fn binds<I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: IntoValue,
    {
        self.rendered
            .binds
            .extend(values.into_iter().map(IntoValue::into_value));
        after_mutation(self);
        self
    }

    pub fn clear_binds(&mut self) -> &mut Self {
        self.rendered.binds.clear();
        after_mutation(self);
        self
    }

    fn is_select(&self) -> bool {
        let sql = self.rendered.sql.trim_start();
        sql.get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("select"))
    }
}

impl Statement for Query {
    fn execution(&self) -> &Execution {
        &self.execution
    }

    fn execution_mut(&mut self) -> &mut Execution {
        &mut self.execution
    }

    fn rendered(&mut self) -> &Rendered {
        &self.rendered
    }

    /// Text starting with `SELECT` is wrapped in a `SELECT COUNT(*)` subquery with the same
    /// binds; anything else reports the driver's affected-row count. `WITH …` and other
    /// prefixes take the affected-row path.
    fn row_count(&mut self) -> Result<u64> {
        if !self.is_select() {
            return self.affected_rows();
        }
        let inner = self.rendered.sql.trim().trim_end_matches(';');
        let counted = Rendered {
            sql: format!("SELECT COUNT(*) FROM ({inner}) AS `counted`"),
            binds: self.rendered.binds.clone(),
        };
        self.execution.count(&counted)
    }
}
