//! Java node attributes.

use crate::ast::{KindDispatch, Node};
use crate::lang::treesitter::KEYWORD_FIELD;
use crate::query::Attribute;

use super::{declared_name, has_modifier, modifiers, TYPE_KINDS};

const LITERAL_KINDS: &[&str] = &[
    "decimal_integer_literal",
    "hex_integer_literal",
    "octal_integer_literal",
    "binary_integer_literal",
    "decimal_floating_point_literal",
    "hex_floating_point_literal",
    "character_literal",
    "string_literal",
    "text_block",
    "null_literal",
    "true",
    "false",
];

pub(super) fn dispatch() -> KindDispatch<Vec<Attribute>> {
    KindDispatch::new(none)
        .on_each(TYPE_KINDS, type_declaration)
        .on("method_declaration", method)
        .on("constructor_declaration", constructor)
        .on("compact_constructor_declaration", constructor)
        .on("field_declaration", field)
        .on("local_variable_declaration", local_variable)
        .on("formal_parameter", parameter)
        .on("spread_parameter", parameter)
        .on("variable_declarator", variable_declarator)
        .on("method_invocation", method_invocation)
        .on_each(
            &["binary_expression", "unary_expression", "assignment_expression", "update_expression"],
            operator,
        )
        .on("import_declaration", import)
        .on("package_declaration", package)
        .on_each(LITERAL_KINDS, literal)
}

fn none(_: Node<'_>) -> Vec<Attribute> {
    Vec::new()
}

fn visibility(node: Node<'_>) -> &'static str {
    let mods = modifiers(node);
    ["public", "protected", "private"]
        .into_iter()
        .find(|v| mods.contains(v))
        .unwrap_or("package")
}

fn modifier_flags(node: Node<'_>, attrs: &mut Vec<Attribute>) {
    attrs.push(Attribute::new("Visibility", visibility(node)));
    attrs.push(Attribute::new("Static", has_modifier(node, "static")));
    attrs.push(Attribute::new("Final", has_modifier(node, "final")));
}

fn arity(node: Node<'_>) -> usize {
    node.child_by_field("parameters")
        .map(|p| {
            p.children()
                .filter(|c| matches!(c.kind(), "formal_parameter" | "spread_parameter"))
                .count()
        })
        .unwrap_or(0)
}

fn type_text<'t>(node: Node<'t>) -> &'t str {
    node.child_by_field("type").map(|t| t.text()).unwrap_or("")
}

/// Name of the first declarator, for declarations that can declare several.
fn first_variable<'t>(node: Node<'t>) -> &'t str {
    node.child_by_field("declarator")
        .and_then(declared_name)
        .unwrap_or("")
}

fn type_declaration(node: Node<'_>) -> Vec<Attribute> {
    let name = declared_name(node).unwrap_or("");
    let mut attrs = vec![
        Attribute::new("SimpleName", name),
        Attribute::new("Image", name),
    ];
    modifier_flags(node, &mut attrs);
    attrs.push(Attribute::new(
        "Abstract",
        has_modifier(node, "abstract") || node.kind() == "interface_declaration",
    ));
    attrs
}

fn method(node: Node<'_>) -> Vec<Attribute> {
    let result_type = type_text(node);
    let in_interface = node
        .parent()
        .and_then(|body| body.parent())
        .is_some_and(|decl| decl.kind() == "interface_declaration");
    let has_body = node.child_by_field("body").is_some();

    let mut attrs = vec![
        Attribute::new("Name", declared_name(node).unwrap_or("")),
        Attribute::new("Arity", arity(node)),
        Attribute::new("ResultType", result_type),
        Attribute::new("Void", result_type == "void"),
    ];
    modifier_flags(node, &mut attrs);
    attrs.push(Attribute::new(
        "Abstract",
        has_modifier(node, "abstract") || (in_interface && !has_body),
    ));
    attrs
}

fn constructor(node: Node<'_>) -> Vec<Attribute> {
    vec![
        Attribute::new("Name", declared_name(node).unwrap_or("")),
        Attribute::new("Arity", arity(node)),
        Attribute::new("Visibility", visibility(node)),
    ]
}

fn field(node: Node<'_>) -> Vec<Attribute> {
    let mut attrs = vec![
        Attribute::new("TypeName", type_text(node)),
        Attribute::new("VariableName", first_variable(node)),
    ];
    modifier_flags(node, &mut attrs);
    attrs
}

fn local_variable(node: Node<'_>) -> Vec<Attribute> {
    vec![
        Attribute::new("TypeName", type_text(node)),
        Attribute::new("VariableName", first_variable(node)),
        Attribute::new("Final", has_modifier(node, "final")),
    ]
}

fn parameter(node: Node<'_>) -> Vec<Attribute> {
    let name = declared_name(node)
        .or_else(|| {
            // Varargs keep their name inside a declarator.
            node.child_of_kind("variable_declarator").and_then(declared_name)
        })
        .unwrap_or("");
    vec![
        Attribute::new("TypeName", type_text(node)),
        Attribute::new("VariableName", name),
        Attribute::new("Final", has_modifier(node, "final")),
    ]
}

fn variable_declarator(node: Node<'_>) -> Vec<Attribute> {
    vec![Attribute::new("Name", declared_name(node).unwrap_or(""))]
}

fn method_invocation(node: Node<'_>) -> Vec<Attribute> {
    vec![Attribute::new("MethodName", declared_name(node).unwrap_or(""))]
}

fn operator(node: Node<'_>) -> Vec<Attribute> {
    match node.token("operator") {
        Some(op) => vec![Attribute::new("Operator", op)],
        None => Vec::new(),
    }
}

fn import(node: Node<'_>) -> Vec<Attribute> {
    let path = node
        .children()
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
        .map(|c| c.text())
        .unwrap_or("");
    let on_demand = node.child_of_kind("asterisk").is_some();
    let name = if on_demand {
        format!("{}.*", path)
    } else {
        path.to_string()
    };
    vec![
        Attribute::new("ImportedName", name),
        Attribute::new("Static", node.tokens(KEYWORD_FIELD).any(|k| k == "static")),
    ]
}

fn package(node: Node<'_>) -> Vec<Attribute> {
    let name = node
        .children()
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
        .map(|c| c.text())
        .unwrap_or("");
    vec![Attribute::new("PackageName", name)]
}

fn literal(node: Node<'_>) -> Vec<Attribute> {
    vec![Attribute::new("Image", node.text())]
}
