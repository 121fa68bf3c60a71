use crate::dialect::Dialect;

/// Engine settings handed to [`Database::new`](crate::Database::new).
///
/// Loading them is up to the host application; with the `serde` feature they can be
/// embedded in its own config structure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    pub dialect: Dialect,
    /// Log every statement at `debug` instead of `trace`.
    pub debug: bool,
    /// Default auto-execute mode for new statements.
    pub auto_execute: bool,
}

impl Settings {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn auto_execute(mut self, auto_execute: bool) -> Self {
        self.auto_execute = auto_execute;
        self
    }
}
