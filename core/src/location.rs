//! Source positions attached to tree nodes.

use core::fmt;

use ecow::EcoString;

/// Immutable source position: file, line and column.
///
/// Locations are optional on every node and compare structurally, so two
/// nodes parsed from the same place in the same file carry equal locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    file: EcoString,
    line: u32,
    column: u32,
}

impl Location {
    pub fn new(file: impl Into<EcoString>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
