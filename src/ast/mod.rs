//! Language-agnostic syntax tree model.
//!
//! Every language parser produces a [`Tree`]: an immutable, rooted, ordered
//! tree of nodes with spans, structural names and a language tag. Engine code
//! only ever looks at trees through this module.

mod dispatch;
mod span;
mod tree;
mod walk;

pub use dispatch::{Arm, KindDispatch};
pub use span::Span;
pub use tree::{structural_name, Ancestors, Node, NodeId, Tree, TreeBuilder};
pub use walk::{Descendants, PostOrder, Walk};

use thiserror::Error;

/// Errors produced while turning source text into a tree.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column} near '{kind}'")]
    Syntax {
        line: usize,
        column: usize,
        kind: String,
    },
    #[error("grammar could not be loaded: {0}")]
    Language(String),
    #[error("parser produced no tree")]
    Aborted,
    #[error("malformed tree: {0}")]
    Malformed(String),
}

/// Turns source text into a [`Tree`].
///
/// Parsers are created per file by a language's parser factory, so an
/// implementation does not need to be shareable between threads.
pub trait Parser {
    fn parse(&mut self, source: &str, file_id: &str) -> Result<Tree, ParseError>;
}
