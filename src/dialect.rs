/// Backend portability switch.
///
/// Generated SQL is dialect-neutral except for column type mapping.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    #[default]
    MySql,
    Sqlite,
}

impl Dialect {
    /// File-based engines have no bounded string type.
    pub fn has_bounded_varchar(self) -> bool {
        match self {
            Dialect::MySql => true,
            Dialect::Sqlite => false,
        }
    }
}
