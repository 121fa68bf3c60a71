use sqlweave_derive::KeyValueOperator;

use crate::writer::FormatWriter;

/// Comparison carried by a `KeyValue` leaf.
///
/// Each variant becomes a finishing method on `KeyValueBuilder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, KeyValueOperator)]
pub enum Operator {
    #[key_value(method = "matches")]
    Equal,
    #[key_value(method = "not_matches")]
    NotEqual,
    Like,
    NotLike,
    #[key_value(method = "greater_than")]
    Greater,
    #[key_value(method = "greater_or_equal")]
    GreaterEqual,
    #[key_value(method = "less_than")]
    Lesser,
    #[key_value(method = "less_or_equal")]
    LesserEqual,
    Regexp,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Lesser => "<",
            Operator::LesserEqual => "<=",
            Operator::Regexp => "REGEXP",
        }
    }
}

impl FormatWriter for Operator {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut crate::writer::FormatContext<'_, W>,
    ) -> std::fmt::Result {
        context.writer.write_str(self.as_sql())
    }
}
