//! Tree-sitter backed parsing.
//!
//! Converts a tree-sitter concrete syntax tree into an engine [`Tree`].
//! Named nodes become tree nodes; anonymous tokens are kept on their parent
//! (under their grammar field, or under `keyword` for bare words); comments
//! are dropped.

use tree_sitter::{Language, Node as TsNode};

use crate::ast::{ParseError, Parser, Span, Tree, TreeBuilder};

/// Field used for anonymous keyword tokens without a grammar field.
pub const KEYWORD_FIELD: &str = "keyword";

/// A [`Parser`] over a tree-sitter grammar.
///
/// Holds a `tree_sitter::Parser`, which is not `Sync`; create one per
/// worker through the language's handler.
pub struct TreeSitterParser {
    language_id: &'static str,
    parser: tree_sitter::Parser,
}

impl TreeSitterParser {
    pub fn new(language_id: &'static str, language: &Language) -> Result<Self, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(language)
            .map_err(|e| ParseError::Language(e.to_string()))?;
        Ok(Self {
            language_id,
            parser,
        })
    }
}

impl Parser for TreeSitterParser {
    fn parse(&mut self, source: &str, file_id: &str) -> Result<Tree, ParseError> {
        let ts_tree = self.parser.parse(source, None).ok_or(ParseError::Aborted)?;
        let root = ts_tree.root_node();
        if root.has_error() {
            return Err(first_error(root, source));
        }
        convert(self.language_id, root, source, file_id)
    }
}

/// The first ERROR or MISSING node in document order.
fn first_error(root: TsNode<'_>, source: &str) -> ParseError {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            let span = Span::from_ts_node(node, source);
            let kind = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                let text = node.utf8_text(source.as_bytes()).unwrap_or("");
                text.lines().next().unwrap_or("").chars().take(20).collect()
            };
            return ParseError::Syntax {
                line: span.start_line,
                column: span.start_col,
                kind,
            };
        }

        // Only descend into subtrees that contain an error.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                // has_error() was set but no node claimed it.
                let span = Span::from_ts_node(root, source);
                return ParseError::Syntax {
                    line: span.start_line,
                    column: span.start_col,
                    kind: root.kind().to_string(),
                };
            }
        }
    }
}

/// Convert a tree-sitter tree iteratively, so deep trees cannot overflow
/// the stack.
fn convert(language_id: &'static str, root: TsNode<'_>, source: &str, file_id: &str) -> Result<Tree, ParseError> {
    let mut builder = TreeBuilder::new(language_id, file_id, source);
    let bytes = source.as_bytes();
    let mut cursor = root.walk();

    builder.open(root.kind(), None, Span::from_ts_node(root, source));
    if !cursor.goto_first_child() {
        builder.close();
        return builder.finish();
    }

    loop {
        let node = cursor.node();
        let field = cursor.field_name();

        if node.is_named() && !node.is_extra() {
            builder.open(node.kind(), field, Span::from_ts_node(node, source));
            if cursor.goto_first_child() {
                continue;
            }
            builder.close();
        } else if !node.is_named() {
            let text = node.utf8_text(bytes).unwrap_or("");
            match field {
                Some(field) => builder.token(field, text),
                None if !text.is_empty() && text.chars().all(|c| c.is_alphabetic() || c == '_') => {
                    builder.token(KEYWORD_FIELD, text)
                }
                None => {}
            }
        }

        // Advance to the next sibling, closing finished parents.
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return builder.finish();
            }
            builder.close();
        }
    }
}
