//! Joining values into separated strings.

use std::fmt::{Display, Write as _};

/// Formats values into a string separated by a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinFormat {
    separator: char,
}

impl JoinFormat {
    /// Create a formatter that joins with `separator`.
    pub const fn new(separator: char) -> Self {
        Self { separator }
    }

    /// A comma-separated formatter, the layout of CSV payloads.
    pub const fn csv() -> Self {
        Self::new(',')
    }

    /// Return the separator character.
    pub const fn separator(&self) -> char {
        self.separator
    }

    /// Join `values` into a single string.
    pub fn serialize(&self, values: &[&dyn Display]) -> String {
        let mut out = String::new();
        for (idx, value) in values.iter().enumerate() {
            if idx > 0 {
                out.push(self.separator);
            }
            // Writing into a String cannot fail.
            let _ = write!(out, "{value}");
        }
        out
    }
}
