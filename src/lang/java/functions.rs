//! Java query functions.

use crate::ast::Node;
use crate::query::functions::{arg_str, CallContext, FunctionDef, SequenceType};
use crate::query::{Item, QueryError, Value};

use super::{declared_name, modifiers};

/// Whether an annotation name written in source refers to `wanted`.
///
/// Either side may be qualified: `Override` matches `java.lang.Override`.
fn annotation_matches(written: &str, wanted: &str) -> bool {
    let simple = |s: &str| s.rsplit('.').next().unwrap_or(s).to_string();
    if written.contains('.') && wanted.contains('.') {
        written == wanted
    } else {
        simple(written) == simple(wanted)
    }
}

fn annotations<'t>(node: Node<'t>) -> impl Iterator<Item = &'t str> {
    node.child_of_kind("modifiers")
        .into_iter()
        .flat_map(|m| m.children())
        .filter(|c| matches!(c.kind(), "marker_annotation" | "annotation"))
        .filter_map(declared_name)
}

/// `hasAnnotation(name)`: whether the context declaration is annotated.
fn has_annotation(ctx: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    let node = ctx.focus_node()?;
    let wanted = arg_str(args, 0);
    Ok(Value::single(
        annotations(node).any(|written| annotation_matches(written, wanted)),
    ))
}

/// `modifiers()`: modifier keywords of the context declaration.
fn modifier_list(ctx: &CallContext<'_, '_>, _: &[Value]) -> Result<Value, QueryError> {
    let node = ctx.focus_node()?;
    Ok(Value::from_items(
        modifiers(node).into_iter().map(Item::from).collect(),
    ))
}

pub(super) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "hasAnnotation",
        args: &[SequenceType::SINGLE_STRING],
        result: SequenceType::SINGLE_BOOLEAN,
        depends_on_focus: true,
        call: has_annotation,
        check: None,
    },
    FunctionDef {
        name: "modifiers",
        args: &[],
        result: SequenceType::STRING_SEQUENCE,
        depends_on_focus: true,
        call: modifier_list,
        check: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_names() {
        assert!(annotation_matches("Override", "Override"));
        assert!(annotation_matches("Override", "java.lang.Override"));
        assert!(annotation_matches("java.lang.Override", "Override"));
        assert!(!annotation_matches("a.Test", "b.Test"));
        assert!(!annotation_matches("Test", "Tested"));
    }
}
