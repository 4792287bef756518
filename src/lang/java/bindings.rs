//! Java display hints.

use phf::phf_map;

use crate::ast::Node;
use crate::lang::{DesignerBindings, TreeIcon};

use super::{is_callable, is_type};

/// Icon per grammar kind. Everything else is [`TreeIcon::Other`].
static ICONS: phf::Map<&'static str, TreeIcon> = phf_map! {
    "field_declaration" => TreeIcon::Field,
    "class_declaration" => TreeIcon::Class,
    "interface_declaration" => TreeIcon::Class,
    "enum_declaration" => TreeIcon::Class,
    "record_declaration" => TreeIcon::Class,
    "annotation_type_declaration" => TreeIcon::Class,
    "method_declaration" => TreeIcon::Method,
    "constructor_declaration" => TreeIcon::Constructor,
    "compact_constructor_declaration" => TreeIcon::Constructor,
    "variable_declarator" => TreeIcon::Variable,
    "formal_parameter" => TreeIcon::Variable,
    "spread_parameter" => TreeIcon::Variable,
};

/// Display hints for Java trees.
pub struct JavaDesignerBindings;

impl DesignerBindings for JavaDesignerBindings {
    fn main_attribute_name(&self, node: Node<'_>) -> Option<&'static str> {
        if is_type(node) {
            Some("SimpleName")
        } else if is_callable(node) || node.kind() == "variable_declarator" {
            Some("Name")
        } else {
            None
        }
    }

    fn icon(&self, node: Node<'_>) -> TreeIcon {
        ICONS.get(node.kind()).copied().unwrap_or(TreeIcon::Other)
    }

    fn additional_info(&self, node: Node<'_>) -> Vec<String> {
        let typed = match node.kind() {
            "field_declaration" | "local_variable_declaration" | "formal_parameter"
            | "spread_parameter" | "method_declaration" => node.child_by_field("type"),
            _ => None,
        };
        typed
            .map(|t| vec![format!("Type: {}", t.text())])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse;
    use super::super::JavaHandler;
    use super::*;
    use crate::lang::{main_attribute, LanguageHandler};
    use crate::query::AttrValue;

    #[test]
    fn test_bindings() {
        let tree = parse("class Shape { private int sides; Shape() {} double area() { int n = sides; return n; } }");
        let handler = JavaHandler::new();
        let bindings = handler.designer_bindings();

        let find = |kind: &str| {
            tree.root()
                .descendants()
                .find(|n| n.kind() == kind)
                .unwrap()
        };

        let class = find("class_declaration");
        assert_eq!(bindings.icon(class), TreeIcon::Class);
        assert_eq!(
            main_attribute(bindings, handler.attributes(), class),
            Some(AttrValue::from("Shape"))
        );

        let field = find("field_declaration");
        assert_eq!(bindings.icon(field), TreeIcon::Field);
        assert_eq!(bindings.additional_info(field), vec!["Type: int".to_string()]);

        let method = find("method_declaration");
        assert_eq!(bindings.icon(method), TreeIcon::Method);
        assert_eq!(
            main_attribute(bindings, handler.attributes(), method),
            Some(AttrValue::from("area"))
        );

        assert_eq!(bindings.icon(find("constructor_declaration")), TreeIcon::Constructor);

        // Declarators carry the variable icon, not the statements around them.
        let declarators: Vec<_> = tree
            .root()
            .descendants()
            .filter(|n| n.kind() == "variable_declarator")
            .collect();
        assert_eq!(declarators.len(), 2);
        for declarator in declarators {
            assert_eq!(bindings.icon(declarator), TreeIcon::Variable);
        }
        assert_eq!(bindings.icon(find("local_variable_declaration")), TreeIcon::Other);

        assert_eq!(bindings.icon(find("return_statement")), TreeIcon::Other);
        assert!(bindings.additional_info(find("return_statement")).is_empty());
    }
}
