//! Java support (tree-sitter-java).

mod attributes;
mod bindings;
mod functions;
mod metrics;

use tree_sitter::Language;

use crate::ast::{KindDispatch, Node, ParseError, Parser};
use crate::lang::treesitter::{TreeSitterParser, KEYWORD_FIELD};
use crate::lang::{DesignerBindings, LanguageHandler};
use crate::metrics::{MetricsProvider, StaticMetrics};
use crate::query::{Attribute, AttributeProvider, FunctionDef};
use crate::report::ViolationScope;

pub use bindings::JavaDesignerBindings;

/// Type declaration kinds.
pub(crate) const TYPE_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// Method-like declaration kinds.
pub(crate) const CALLABLE_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
];

pub(crate) fn is_type(node: Node<'_>) -> bool {
    TYPE_KINDS.contains(&node.kind())
}

pub(crate) fn is_callable(node: Node<'_>) -> bool {
    CALLABLE_KINDS.contains(&node.kind())
}

/// Modifier keywords of a declaration, e.g. `["public", "static"]`.
pub(crate) fn modifiers<'t>(node: Node<'t>) -> Vec<&'t str> {
    node.child_of_kind("modifiers")
        .map(|m| m.tokens(KEYWORD_FIELD).collect())
        .unwrap_or_default()
}

pub(crate) fn has_modifier(node: Node<'_>, modifier: &str) -> bool {
    modifiers(node).contains(&modifier)
}

/// Text of the `name` field, if the node has one.
pub(crate) fn declared_name<'t>(node: Node<'t>) -> Option<&'t str> {
    node.child_by_field("name").map(|n| n.text())
}

/// Language handler for Java.
pub struct JavaHandler {
    language: Language,
    attributes: KindDispatch<Vec<Attribute>>,
    metrics: StaticMetrics,
    bindings: JavaDesignerBindings,
}

impl JavaHandler {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
            attributes: attributes::dispatch(),
            metrics: StaticMetrics(metrics::METRICS),
            bindings: JavaDesignerBindings,
        }
    }
}

impl Default for JavaHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageHandler for JavaHandler {
    fn language_id(&self) -> &'static str {
        "java"
    }

    fn display_name(&self) -> &'static str {
        "Java"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn parser(&self) -> Result<Box<dyn Parser>, ParseError> {
        Ok(Box::new(TreeSitterParser::new("java", &self.language)?))
    }

    fn attributes(&self) -> &dyn AttributeProvider {
        &self.attributes
    }

    fn metrics(&self) -> &dyn MetricsProvider {
        &self.metrics
    }

    fn designer_bindings(&self) -> &dyn DesignerBindings {
        &self.bindings
    }

    fn functions(&self) -> &[FunctionDef] {
        functions::FUNCTIONS
    }

    fn violation_scope(&self, node: Node<'_>) -> ViolationScope {
        let package_name = node
            .tree()
            .root()
            .child_of_kind("package_declaration")
            .and_then(|p| p.children().next())
            .map(|n| n.text().to_string());

        let mut type_names: Vec<&str> = std::iter::once(node)
            .chain(node.ancestors())
            .filter(|n| is_type(*n))
            .filter_map(declared_name)
            .collect();
        type_names.reverse();

        let method_name = std::iter::once(node)
            .chain(node.ancestors())
            .take_while(|n| !is_type(*n))
            .find(|n| is_callable(*n))
            .and_then(declared_name)
            .map(str::to_string);

        ViolationScope {
            package_name,
            class_name: (!type_names.is_empty()).then(|| type_names.join("$")),
            method_name,
        }
    }
}
