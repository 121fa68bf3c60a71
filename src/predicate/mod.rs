//! The WHERE tree.
//!
//! Leaves are [`KeyValue`] comparisons, composites are [`Group`]s. Every node records the
//! [`Separator`] joining it to its previous sibling; the first node of a group always holds
//! [`Separator::None`].

use std::fmt::Write;

use crate::{
    ident::{Ident, IntoIdent},
    value::IntoValue,
    writer::{FormatContext, FormatWriter},
};

pub mod filter;
mod key_value;

pub use filter::{Filter, FilterValue};
pub use key_value::{KeyValue, KeyValueBuilder};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    #[default]
    None,
    And,
    Or,
}

impl FormatWriter for Separator {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        match self {
            Separator::None => Ok(()),
            Separator::And => context.writer.write_str(" AND "),
            Separator::Or => context.writer.write_str(" OR "),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConditionKind {
    KeyValue(KeyValue),
    Group(Group),
}

impl FormatWriter for ConditionKind {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        match self {
            ConditionKind::KeyValue(leaf) => leaf.format_writer(context),
            ConditionKind::Group(group) => group.format_writer(context),
        }
    }
}

/// One element of a group: a leaf or a nested group, plus how it joins the previous one.
#[derive(Debug, Clone)]
pub struct Condition {
    separator: Separator,
    kind: ConditionKind,
}

impl Condition {
    pub fn separator(&self) -> Separator {
        self.separator
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }
}

impl FormatWriter for Condition {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        self.separator.format_writer(context)?;
        self.kind.format_writer(context)
    }
}

/// Ordered elements of a group with the separator cursor for the next append.
#[derive(Debug, Default, Clone)]
pub struct Conditions {
    items: Vec<Condition>,
    next: Option<Separator>,
}

impl Conditions {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.items.iter()
    }

    pub(crate) fn set_next(&mut self, separator: Separator) {
        self.next = Some(separator);
    }

    /// Appends with the pending separator (AND when none was requested) and resets the cursor.
    pub(crate) fn push(&mut self, kind: ConditionKind) {
        let requested = self.next.take().unwrap_or(Separator::And);
        let separator = if self.items.is_empty() {
            Separator::None
        } else {
            requested
        };
        self.items.push(Condition { separator, kind });
    }
}

impl FormatWriter for Conditions {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        for condition in &self.items {
            condition.format_writer(context)?;
        }
        Ok(())
    }
}

/// A parenthesized sub-predicate. Empty groups render as nothing and are never appended.
#[derive(Debug, Default, Clone)]
pub struct Group {
    conditions: Conditions,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl FormatWriter for Group {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        if self.conditions.is_empty() {
            return Ok(());
        }
        context.writer.write_char('(')?;
        self.conditions.format_writer(context)?;
        context.writer.write_char(')')
    }
}

impl Predicate for Group {
    fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }
}

/// The fluent WHERE surface shared by groups and the filtering statements.
pub trait Predicate {
    fn conditions(&self) -> &Conditions;

    #[doc(hidden)]
    fn conditions_mut(&mut self) -> &mut Conditions;

    /// Called after every append; statements use it to drop their render cache.
    #[doc(hidden)]
    fn touched(&mut self) {}

    #[doc(hidden)]
    fn push_condition(&mut self, kind: ConditionKind) {
        self.conditions_mut().push(kind);
        self.touched();
    }

    /// Joins the next appended element with AND.
    fn and(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self.conditions_mut().set_next(Separator::And);
        self
    }

    /// Joins the next appended element with OR.
    fn or(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self.conditions_mut().set_next(Separator::Or);
        self
    }

    /// Starts a leaf on `column`. Nothing is appended until an operator method is called.
    fn where_<C>(&mut self, column: C) -> KeyValueBuilder<'_, Self>
    where
        C: IntoIdent,
        Self: Sized,
    {
        KeyValueBuilder::new(self, column.into_ident())
    }

    /// Builds a nested group. A group left empty by `build` is discarded.
    fn group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut Group),
        Self: Sized,
    {
        let mut group = Group::new();
        build(&mut group);
        self.where_group(group)
    }

    /// Appends an already built group.
    fn where_group(&mut self, group: Group) -> &mut Self
    where
        Self: Sized,
    {
        if group.is_empty() {
            // the pending separator still applies to whatever comes next
            return self;
        }
        self.push_condition(ConditionKind::Group(group));
        self
    }

    /// Appends `(a = ? AND b = ? …)` joined to the previous element with OR.
    fn where_matches<I, C, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: IntoIdent,
        V: IntoValue,
        Self: Sized,
    {
        let mut group = Group::new();
        for (column, value) in pairs {
            group.where_(column).matches(value);
        }
        if group.is_empty() {
            return self;
        }
        self.or().where_group(group)
    }

    /// Column/value list form of [`Predicate::where_matches`]. Extra entries on the longer
    /// side are ignored.
    fn where_matches_columns<CI, VI>(&mut self, columns: CI, values: VI) -> &mut Self
    where
        CI: IntoIterator,
        CI::Item: IntoIdent,
        VI: IntoIterator,
        VI::Item: IntoValue,
        Self: Sized,
    {
        let columns: Vec<Ident> = columns.into_iter().map(IntoIdent::into_ident).collect();
        let values: Vec<_> = values.into_iter().map(IntoValue::into_value).collect();
        if columns.len() != values.len() {
            tracing::warn!(
                columns = columns.len(),
                values = values.len(),
                "where_matches_columns called with mismatched lengths"
            );
        }
        self.where_matches(columns.into_iter().zip(values))
    }

    /// Applies a map-shaped filter; see [`Filter`] for the key conventions.
    fn where_filter(&mut self, filter: Filter) -> &mut Self
    where
        Self: Sized,
    {
        for (separator, kind) in filter::normalize(filter) {
            self.conditions_mut().set_next(separator);
            self.push_condition(kind);
        }
        self
    }

    fn has_where(&self) -> bool {
        !self.conditions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{dialect::Dialect, tests::format_writer_binds, value::Value};

    use super::*;

    #[test]
    fn test_first_element_drops_separator() {
        let mut group = Group::new();
        group.or().where_("a").matches(1);
        group.where_("b").matches(2);
        group.or().where_("c").less_than(3);
        let (sql, binds) = format_writer_binds(group, Dialect::MySql);
        assert_eq!("(`a` = ? AND `b` = ? OR `c` < ?)", sql);
        assert_eq!(vec![Value::Int(1), Value::Int(2), Value::Int(3)], binds);
    }

    #[test]
    fn test_separator_applies_to_next_only() {
        let mut group = Group::new();
        group.where_("a").matches(1);
        group.or().where_("b").matches(2);
        group.where_("c").matches(3);
        let (sql, _) = format_writer_binds(group, Dialect::MySql);
        assert_eq!("(`a` = ? OR `b` = ? AND `c` = ?)", sql);
    }

    #[test]
    fn test_nested_groups() {
        let mut group = Group::new();
        group.where_("a").matches(1).or().group(|inner| {
            inner.where_("b").like("x%").group(|deeper| {
                deeper.where_("c").regexp("^z").or().where_("d").not_matches(4);
            });
        });
        let (sql, binds) = format_writer_binds(group, Dialect::MySql);
        assert_eq!(
            "(`a` = ? OR (`b` LIKE ? AND (`c` REGEXP ? OR `d` != ?)))",
            sql
        );
        assert_eq!(4, binds.len());
    }

    #[test]
    fn test_empty_group() {
        let group = Group::new();
        let (sql, binds) = format_writer_binds(group, Dialect::MySql);
        assert_eq!("", sql);
        assert!(binds.is_empty());

        let mut group = Group::new();
        group.group(|_| {}).where_("a").matches(1);
        let (sql, _) = format_writer_binds(group, Dialect::MySql);
        assert_eq!("(`a` = ?)", sql);
    }

    #[test]
    fn test_null_value_is_inlined() {
        let mut group = Group::new();
        group.where_("deleted_at").matches(Value::Null).where_("id").greater_or_equal(3);
        let (sql, binds) = format_writer_binds(group, Dialect::MySql);
        assert_eq!("(`deleted_at` = null AND `id` >= ?)", sql);
        assert_eq!(vec![Value::Int(3)], binds);
    }

    #[test]
    fn test_where_matches_equals_manual_group() {
        let mut helper = Group::new();
        helper.where_("id").matches(9);
        helper.where_matches([("a", 1), ("b", 2)]);

        let mut manual = Group::new();
        manual.where_("id").matches(9);
        manual.or().group(|group| {
            group.where_("a").matches(1).and().where_("b").matches(2);
        });

        let helper = format_writer_binds(helper, Dialect::MySql);
        let manual = format_writer_binds(manual, Dialect::MySql);
        assert_eq!("(`id` = ? OR (`a` = ? AND `b` = ?))", helper.0);
        assert_eq!(manual, helper);
    }

    #[test]
    fn test_where_matches_columns() {
        let mut group = Group::new();
        group
            .where_matches_columns(["a", "b"], [1, 2])
            .where_matches_columns(["a", "b"], [3, 4]);
        let (sql, binds) = format_writer_binds(group, Dialect::MySql);
        assert_eq!("((`a` = ? AND `b` = ?) OR (`a` = ? AND `b` = ?))", sql);
        assert_eq!(
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)],
            binds
        );
    }

    #[test]
    fn test_dropped_builder_appends_nothing() {
        let mut group = Group::new();
        let _ = group.where_("never");
        assert!(group.is_empty());
    }
}
