//! Source locations carried by every CAST node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open region of the source file, rows and columns both 1-based.
/// The front-end attaches one to every node; a zeroed span means the node
/// was synthesized without a source counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub row_start: u32,
    pub row_end: u32,
    pub col_start: u32,
    pub col_end: u32,
}

impl SourceSpan {
    pub fn new(row_start: u32, row_end: u32, col_start: u32, col_end: u32) -> Self {
        SourceSpan {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    /// A one-row span, the common case.
    pub fn row(row: u32) -> Self {
        SourceSpan::new(row, row, 0, 0)
    }

    pub fn is_synthetic(&self) -> bool {
        *self == SourceSpan::default()
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.row_start == self.row_end {
            write!(f, "line {}", self.row_start)
        } else {
            write!(f, "lines {}-{}", self.row_start, self.row_end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_single_and_multi_row() {
        assert_eq!(SourceSpan::row(12).to_string(), "line 12");
        assert_eq!(SourceSpan::new(3, 7, 0, 0).to_string(), "lines 3-7");
    }

    #[test]
    fn default_is_synthetic() {
        assert!(SourceSpan::default().is_synthetic());
        assert!(!SourceSpan::row(1).is_synthetic());
    }
}
