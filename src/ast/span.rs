//! Source spans.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source location span with byte offsets and line/column positions.
///
/// Lines and columns are 1-indexed and columns count characters, not
/// bytes. The end position points just past the last character of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Span covering the given line/column range, without byte offsets.
    pub fn lines(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start_byte: 0,
            end_byte: 0,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a span from a tree-sitter node of `source`.
    ///
    /// tree-sitter columns count bytes; the span counts characters.
    #[cfg(feature = "tree-sitter")]
    pub fn from_ts_node(node: tree_sitter::Node, source: &str) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: char_column(source, node.start_byte(), start.column) + 1,
            end_line: end.row + 1,
            end_col: char_column(source, node.end_byte(), end.column) + 1,
        }
    }

    /// Number of source lines this span touches.
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Characters between the start of the line and `byte`, given the byte
/// column of `byte` on its line.
pub fn char_column(source: &str, byte: usize, byte_column: usize) -> usize {
    source
        .get(byte.saturating_sub(byte_column)..byte)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(byte_column)
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}
