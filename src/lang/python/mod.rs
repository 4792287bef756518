//! Python support (tree-sitter-python).

mod attributes;
mod bindings;
mod functions;
mod metrics;

use tree_sitter::Language;

use crate::ast::{KindDispatch, Node, ParseError, Parser};
use crate::lang::treesitter::TreeSitterParser;
use crate::lang::{DesignerBindings, LanguageHandler};
use crate::metrics::{MetricsProvider, StaticMetrics};
use crate::query::{Attribute, AttributeProvider, FunctionDef};
use crate::report::ViolationScope;

pub use bindings::PythonDesignerBindings;

pub(crate) fn is_function(node: Node<'_>) -> bool {
    node.kind() == "function_definition"
}

pub(crate) fn is_class(node: Node<'_>) -> bool {
    node.kind() == "class_definition"
}

pub(crate) fn declared_name<'t>(node: Node<'t>) -> Option<&'t str> {
    node.child_by_field("name").map(|n| n.text())
}

/// Definitions directly inside a class body, unwrapping decorators.
pub(crate) fn class_members<'t>(class: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    class
        .child_by_field("body")
        .into_iter()
        .flat_map(|body| body.children())
        .map(|member| {
            if member.kind() == "decorated_definition" {
                member.child_by_field("definition").unwrap_or(member)
            } else {
                member
            }
        })
}

/// The class whose body directly contains a definition, if any.
pub(crate) fn owning_class(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent()?;
    if current.kind() == "decorated_definition" {
        current = current.parent()?;
    }
    // The body block, then the class itself.
    let class = current.parent()?;
    is_class(class).then_some(class)
}

/// Language handler for Python.
pub struct PythonHandler {
    language: Language,
    attributes: KindDispatch<Vec<Attribute>>,
    metrics: StaticMetrics,
    bindings: PythonDesignerBindings,
}

impl PythonHandler {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
            attributes: attributes::dispatch(),
            metrics: StaticMetrics(metrics::METRICS),
            bindings: PythonDesignerBindings,
        }
    }
}

impl Default for PythonHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageHandler for PythonHandler {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn display_name(&self) -> &'static str {
        "Python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn parser(&self) -> Result<Box<dyn Parser>, ParseError> {
        Ok(Box::new(TreeSitterParser::new("python", &self.language)?))
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
        let mut class_names: Vec<&str> = std::iter::once(node)
            .chain(node.ancestors())
            .filter(|n| is_class(*n))
            .filter_map(declared_name)
            .collect();
        class_names.reverse();

        let method_name = std::iter::once(node)
            .chain(node.ancestors())
            .take_while(|n| !is_class(*n))
            .find(|n| is_function(*n))
            .and_then(declared_name)
            .map(str::to_string);

        ViolationScope {
            package_name: None,
            class_name: (!class_names.is_empty()).then(|| class_names.join(".")),
            method_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Tree;

    pub(crate) fn parse(source: &str) -> Tree {
        PythonHandler::new()
            .parser()
            .unwrap()
            .parse(source, "test.py")
            .unwrap()
    }

    #[test]
    fn test_violation_scope() {
        let tree = parse("class Outer:\n    class Inner:\n        def run(self):\n            return 1\n");
        let ret = tree
            .root()
            .descendants()
            .find(|n| n.kind() == "return_statement")
            .unwrap();
        let scope = PythonHandler::new().violation_scope(ret);
        assert_eq!(scope.class_name.as_deref(), Some("Outer.Inner"));
        assert_eq!(scope.method_name.as_deref(), Some("run"));
        assert_eq!(scope.package_name, None);
    }

    #[test]
    fn test_class_members_unwrap_decorators() {
        let tree = parse("class A:\n    @staticmethod\n    def f():\n        pass\n    def g(self):\n        pass\n");
        let class = tree.root().child(0).unwrap();
        let names: Vec<_> = class_members(class).filter_map(declared_name).collect();
        assert_eq!(names, vec!["f", "g"]);

        let f = class_members(class).next().unwrap();
        assert_eq!(owning_class(f), Some(class));
    }
}
