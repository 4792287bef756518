//! Python display hints.

use crate::ast::Node;
use crate::lang::{DesignerBindings, TreeIcon};

use super::{declared_name, is_class, is_function, owning_class};

/// Display hints for Python trees.
pub struct PythonDesignerBindings;

impl DesignerBindings for PythonDesignerBindings {
    fn main_attribute_name(&self, node: Node<'_>) -> Option<&'static str> {
        (is_function(node) || is_class(node)).then_some("Name")
    }

    fn icon(&self, node: Node<'_>) -> TreeIcon {
        if is_class(node) {
            TreeIcon::Class
        } else if is_function(node) {
            if owning_class(node).is_some() && declared_name(node) == Some("__init__") {
                TreeIcon::Constructor
            } else {
                TreeIcon::Method
            }
        } else if node.kind() == "expression_statement" && owning_class(node).is_some() {
            // Class-level assignment.
            TreeIcon::Field
        } else {
            TreeIcon::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse;
    use super::*;

    #[test]
    fn test_icons() {
        let tree = parse("class A:\n    size = 3\n    def __init__(self):\n        pass\n    def run(self):\n        pass\n");
        let bindings = PythonDesignerBindings;
        let class = tree.root().child(0).unwrap();
        assert_eq!(bindings.icon(class), TreeIcon::Class);
        assert_eq!(bindings.main_attribute_name(class), Some("Name"));

        let icons: Vec<TreeIcon> = class
            .child_by_field("body")
            .unwrap()
            .children()
            .map(|m| bindings.icon(m))
            .collect();
        assert_eq!(
            icons,
            vec![TreeIcon::Field, TreeIcon::Constructor, TreeIcon::Method]
        );
        assert_eq!(bindings.icon(tree.root()), TreeIcon::Other);
    }
}
