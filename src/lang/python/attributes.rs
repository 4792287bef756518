//! Python node attributes.

use crate::ast::{KindDispatch, Node};
use crate::lang::treesitter::KEYWORD_FIELD;
use crate::query::Attribute;

use super::declared_name;

/// Parameter kinds; separators like `*` and `/` are not parameters.
const PARAMETER_KINDS: &[&str] = &[
    "identifier",
    "typed_parameter",
    "default_parameter",
    "typed_default_parameter",
    "list_splat_pattern",
    "dictionary_splat_pattern",
];

pub(super) fn dispatch() -> KindDispatch<Vec<Attribute>> {
    KindDispatch::new(none)
        .on("function_definition", function)
        .on("class_definition", class)
        .on_each(
            &[
                "binary_operator",
                "boolean_operator",
                "unary_operator",
                "not_operator",
                "augmented_assignment",
                "comparison_operator",
            ],
            operator,
        )
        .on("import_statement", import)
        .on("import_from_statement", import_from)
        .on_each(&["string", "concatenated_string", "integer", "float"], literal)
}

fn none(_: Node<'_>) -> Vec<Attribute> {
    Vec::new()
}

fn function(node: Node<'_>) -> Vec<Attribute> {
    let arity = node
        .child_by_field("parameters")
        .map(|p| {
            p.children()
                .filter(|c| PARAMETER_KINDS.contains(&c.kind()))
                .count()
        })
        .unwrap_or(0);
    vec![
        Attribute::new("Name", declared_name(node).unwrap_or("")),
        Attribute::new("Arity", arity),
        Attribute::new("Async", node.tokens(KEYWORD_FIELD).any(|k| k == "async")),
    ]
}

fn class(node: Node<'_>) -> Vec<Attribute> {
    vec![Attribute::new("Name", declared_name(node).unwrap_or(""))]
}

fn operator(node: Node<'_>) -> Vec<Attribute> {
    let ops: Vec<&str> = match node.kind() {
        "comparison_operator" => node.tokens("operators").collect(),
        "not_operator" => vec!["not"],
        _ => node.token("operator").into_iter().collect(),
    };
    if ops.is_empty() {
        Vec::new()
    } else {
        vec![Attribute::new("Operator", ops.join(" "))]
    }
}

fn import(node: Node<'_>) -> Vec<Attribute> {
    let names: Vec<&str> = node
        .children_by_field("name")
        .map(|n| match n.kind() {
            "aliased_import" => n.child_by_field("name").map(|d| d.text()).unwrap_or(""),
            _ => n.text(),
        })
        .collect();
    vec![Attribute::new("ImportedName", names.join(", "))]
}

fn import_from(node: Node<'_>) -> Vec<Attribute> {
    let module = node
        .child_by_field("module_name")
        .map(|m| m.text())
        .unwrap_or("");
    vec![Attribute::new("ImportedName", module)]
}

fn literal(node: Node<'_>) -> Vec<Attribute> {
    vec![Attribute::new("Image", node.text())]
}
