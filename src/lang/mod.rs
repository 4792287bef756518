//! Per-language capabilities.
//!
//! A [`LanguageHandler`] bundles everything the engine needs to know about a
//! language: how to parse it, which attributes and metrics its nodes have,
//! which query functions it adds and how a viewer should display its nodes.
//! The engine only ever talks to languages through this trait.
//!
//! # Adding a New Language
//!
//! Implement [`LanguageHandler`] in a submodule (see `java/` and `python/`)
//! and register it in [`LanguageRegistry::builtin`].

pub mod bindings;
mod registry;

#[cfg(feature = "tree-sitter")]
pub mod java;
#[cfg(feature = "tree-sitter")]
pub mod python;
#[cfg(feature = "tree-sitter")]
pub mod treesitter;

pub use bindings::{main_attribute, DefaultDesignerBindings, DesignerBindings, TreeIcon};
pub use registry::{registry, LanguageRegistry, LanguageRegistryBuilder, RegistryError};

use crate::ast::{Node, ParseError, Parser};
use crate::metrics::MetricsProvider;
use crate::query::{AttributeProvider, FunctionDef};
use crate::report::ViolationScope;

/// Everything the engine knows about one language.
///
/// Handlers are immutable and shared between worker threads. Parsers are
/// not: [`parser`](Self::parser) creates a fresh one per call.
pub trait LanguageHandler: Send + Sync {
    /// Stable identifier, e.g. `"java"`. Also the language's function prefix.
    fn language_id(&self) -> &'static str;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// File extensions without the dot.
    fn file_extensions(&self) -> &'static [&'static str];

    /// Create a parser for this language.
    fn parser(&self) -> Result<Box<dyn Parser>, ParseError>;

    fn attributes(&self) -> &dyn AttributeProvider;

    fn metrics(&self) -> &dyn MetricsProvider;

    fn designer_bindings(&self) -> &dyn DesignerBindings {
        &DefaultDesignerBindings
    }

    /// Query functions specific to this language.
    fn functions(&self) -> &[FunctionDef] {
        &[]
    }

    /// Enclosing package, type and method names of a node.
    fn violation_scope(&self, _node: Node<'_>) -> ViolationScope {
        ViolationScope::default()
    }

    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

impl std::fmt::Debug for dyn LanguageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LanguageHandler({})", self.language_id())
    }
}
