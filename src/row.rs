use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::value::Value;

/// A fetched row: ordered values with shared column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[SmolStr]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[SmolStr]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[SmolStr] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value by position.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value by column label, compared case-insensitively.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|label| label.eq_ignore_ascii_case(column))
            .and_then(|index| self.values.get(index))
    }

    pub fn to_map(&self) -> IndexMap<SmolStr, Value> {
        self.columns
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    pub fn to_strings(&self) -> Vec<Option<String>> {
        self.values.iter().map(Value::to_text).collect()
    }

    pub fn to_string_map(&self) -> IndexMap<SmolStr, Option<String>> {
        self.columns
            .iter()
            .cloned()
            .zip(self.values.iter().map(Value::to_text))
            .collect()
    }
}
