use std::fmt::Write;

use crate::{
    ident::Ident,
    operator::Operator,
    value::Value,
    writer::{FormatContext, FormatWriter},
};

use super::{ConditionKind, Predicate};

/// A `column OP value` leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub(crate) column: Ident,
    pub(crate) operator: Operator,
    pub(crate) value: Value,
}

impl KeyValue {
    pub fn column(&self) -> &Ident {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl FormatWriter for KeyValue {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        self.column.format_writer(context)?;
        context.writer.write_char(' ')?;
        self.operator.format_writer(context)?;
        context.writer.write_char(' ')?;
        self.value.format_writer(context)
    }
}

/// First phase of a leaf: holds the column and a borrow of the parent.
///
/// The operator methods (`matches`, `like`, `less_than`, ...) consume the builder, append
/// the finished leaf to the parent and hand the parent back. The builder has no
/// `PartialEq`, so `where_("a") == 1` does not compile; use `matches`.
#[must_use = "a leaf is only appended once an operator method is called"]
pub struct KeyValueBuilder<'a, P: ?Sized> {
    parent: &'a mut P,
    column: Ident,
}

impl<'a, P> KeyValueBuilder<'a, P>
where
    P: Predicate + ?Sized,
{
    pub(crate) fn new(parent: &'a mut P, column: Ident) -> Self {
        Self { parent, column }
    }

    pub(crate) fn finish(self, operator: Operator, value: Value) -> &'a mut P {
        let leaf = KeyValue {
            column: self.column,
            operator,
            value,
        };
        self.parent.push_condition(ConditionKind::KeyValue(leaf));
        self.parent
    }

    /// Finishes the leaf with an explicit operator.
    pub fn compare<V>(self, operator: Operator, value: V) -> &'a mut P
    where
        V: crate::IntoValue,
    {
        self.finish(operator, value.into_value())
    }
}
