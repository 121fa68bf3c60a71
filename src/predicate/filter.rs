//! Map-shaped filters, for payloads that arrive as data rather than builder calls.
//!
//! Each entry becomes `column = value`. A key prefixed with `|` joins its entry with OR,
//! `&` forces AND, anything else joins with AND. A [`FilterValue::Map`] becomes a nested
//! group; its key only contributes the prefix.

use indexmap::IndexMap;

use crate::{
    ident::Ident,
    operator::Operator,
    value::{IntoValue, Value},
};

use super::{ConditionKind, Group, KeyValue, Predicate, Separator};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Value(Value),
    Map(Filter),
}

impl<T: IntoValue> From<T> for FilterValue {
    fn from(value: T) -> Self {
        FilterValue::Value(value.into_value())
    }
}

impl From<Filter> for FilterValue {
    fn from(value: Filter) -> Self {
        FilterValue::Map(value)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Filter(IndexMap<String, FilterValue>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<FilterValue>,
    {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FilterValue>,
    {
        self.insert(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K, V> FromIterator<(K, V)> for Filter
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn split_key(key: &str) -> (Separator, &str) {
    if let Some(rest) = key.strip_prefix('|') {
        (Separator::Or, rest)
    } else if let Some(rest) = key.strip_prefix('&') {
        (Separator::And, rest)
    } else {
        (Separator::And, key)
    }
}

/// Flattens one filter level into typed elements with their requested separators.
pub(crate) fn normalize(filter: Filter) -> Vec<(Separator, ConditionKind)> {
    let mut out = Vec::with_capacity(filter.len());
    for (key, value) in filter.0 {
        let (separator, column) = split_key(&key);
        match value {
            FilterValue::Value(value) => {
                let leaf = KeyValue {
                    column: Ident::new(column),
                    operator: Operator::Equal,
                    value,
                };
                out.push((separator, ConditionKind::KeyValue(leaf)));
            }
            FilterValue::Map(nested) => {
                let mut group = Group::new();
                group.where_filter(nested);
                if !group.is_empty() {
                    out.push((separator, ConditionKind::Group(group)));
                }
            }
        }
    }
    out
}

#[cfg(feature = "json")]
impl TryFrom<serde_json::Value> for Filter {
    type Error = crate::QueryError;

    /// Objects map to filters, nested objects to nested groups. Arrays are rejected.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let serde_json::Value::Object(object) = value else {
            return Err(crate::QueryError::Filter(
                "a filter must be a JSON object".to_string(),
            ));
        };
        let mut filter = Filter::new();
        for (key, value) in object {
            let entry = match value {
                nested @ serde_json::Value::Object(_) => FilterValue::Map(Filter::try_from(nested)?),
                scalar => match Value::try_from(scalar) {
                    Ok(value) => FilterValue::Value(value),
                    Err(_) => {
                        return Err(crate::QueryError::Filter(format!(
                            "unsupported value for filter key `{key}`"
                        )));
                    }
                },
            };
            filter.0.insert(key, entry);
        }
        Ok(filter)
    }
}
