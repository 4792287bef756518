//! Python query functions.

use crate::ast::Node;
use crate::query::functions::{arg_str, CallContext, FunctionDef, SequenceType};
use crate::query::{QueryError, Value};

/// Dotted name of a decorator, without call arguments: `@app.route("/")`
/// gives `app.route`.
fn decorator_name<'t>(decorator: Node<'t>) -> Option<&'t str> {
    let expr = decorator.children().next()?;
    match expr.kind() {
        "call" => expr.child_by_field("function").map(|f| f.text()),
        _ => Some(expr.text()),
    }
}

fn decorators<'t>(node: Node<'t>) -> impl Iterator<Item = &'t str> {
    node.parent()
        .filter(|p| p.kind() == "decorated_definition")
        .into_iter()
        .flat_map(|p| p.children())
        .filter(|c| c.kind() == "decorator")
        .filter_map(decorator_name)
}

/// `hasDecorator(name)`: whether the context definition is decorated.
///
/// A simple name matches the last component of a dotted decorator.
fn has_decorator(ctx: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    let node = ctx.focus_node()?;
    let wanted = arg_str(args, 0);
    let found = decorators(node).any(|name| {
        name == wanted || (!wanted.contains('.') && name.rsplit('.').next() == Some(wanted))
    });
    Ok(Value::single(found))
}

pub(super) static FUNCTIONS: &[FunctionDef] = &[FunctionDef {
    name: "hasDecorator",
    args: &[SequenceType::SINGLE_STRING],
    result: SequenceType::SINGLE_BOOLEAN,
    depends_on_focus: true,
    call: has_decorator,
    check: None,
}];

#[cfg(test)]
mod tests {
    use super::super::tests::parse;
    use super::*;

    #[test]
    fn test_decorator_names() {
        let tree = parse("@app.route('/')\n@cached\ndef index():\n    pass\n");
        let func = tree
            .root()
            .descendants()
            .find(|n| n.kind() == "function_definition")
            .unwrap();
        assert_eq!(decorators(func).collect::<Vec<_>>(), vec!["app.route", "cached"]);
    }
}
