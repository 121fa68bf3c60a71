use std::{fmt::Write, ops::Deref};

use crate::{dialect::Dialect, value::Value};

pub(crate) trait FormatWriter {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result;
}

/// Render state shared by every node of a statement.
///
/// Placeholders and bound values are produced together so the two can never drift apart.
pub(crate) struct FormatContext<'a, W: Write> {
    pub(crate) writer: &'a mut W,
    pub(crate) dialect: Dialect,
    pub(crate) binds: Vec<Value>,
}

impl<'a, W: Write> FormatContext<'a, W> {
    pub fn new(writer: &'a mut W, dialect: Dialect) -> Self {
        Self {
            writer,
            dialect,
            binds: Vec::new(),
        }
    }

    pub(crate) fn write_table(&mut self, ident: &str) -> std::fmt::Result {
        for (i, part) in ident.split('.').enumerate() {
            if i > 0 {
                self.writer.write_char('.')?;
            }
            self.write_ident(part)?;
        }
        Ok(())
    }

    pub(crate) fn write_ident(&mut self, part: &str) -> std::fmt::Result {
        if part == "*" {
            return self.writer.write_char('*');
        }

        self.writer.write_char('`')?;
        // duplicate the quote if present
        let mut last = 0;
        for (index, char) in part.char_indices() {
            if char == '`' {
                if index != last {
                    self.writer.write_str(&part[last..index])?;
                }
                self.writer.write_str("``")?;
                last = index + char.len_utf8();
            }
        }

        // write trailing slice
        if last < part.len() {
            self.writer.write_str(&part[last..])?;
        }

        self.writer.write_char('`')?;
        Ok(())
    }

    /// Null is written inline, anything else becomes a `?` and is bound.
    pub(crate) fn write_value(&mut self, value: &Value) -> std::fmt::Result {
        if value.is_null() {
            return self.writer.write_str("null");
        }
        self.binds.push(value.clone());
        self.writer.write_char('?')
    }

    pub(crate) fn write_list<T: FormatWriter>(&mut self, items: &[T]) -> std::fmt::Result {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.writer.write_str(", ")?;
            }
            item.format_writer(self)?;
        }
        Ok(())
    }

    pub(crate) fn take_binds(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.binds)
    }
}

impl<D> FormatWriter for D
where
    D: Deref,
    D::Target: FormatWriter,
{
    fn format_writer<W: std::fmt::Write>(
        &self,
        ctx: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        self.deref().format_writer(ctx)
    }
}
