//! Python metrics.

use crate::ast::Node;
use crate::metrics::{sum_below, Metric, MetricOptions};

use super::{class_members, is_class, is_function};

pub(crate) const IGNORE_BOOLEAN_PATHS: &str = "ignoreBooleanPaths";

/// Nested definitions carry their own metrics.
const BARRIERS: &[&str] = &["function_definition", "class_definition"];

fn any(_: Node<'_>) -> bool {
    true
}

fn decision_weight(node: Node<'_>, options: &MetricOptions) -> f64 {
    match node.kind() {
        "if_statement" | "elif_clause" | "for_statement" | "while_statement"
        | "except_clause" | "conditional_expression" | "for_in_clause" | "if_clause"
        | "case_clause" => 1.0,
        "boolean_operator" if !options.contains(IGNORE_BOOLEAN_PATHS) => 1.0,
        _ => 0.0,
    }
}

fn cyclo(node: Node<'_>, options: &MetricOptions) -> f64 {
    1.0 + sum_below(node, BARRIERS, |n| decision_weight(n, options))
}

fn loc(node: Node<'_>, _: &MetricOptions) -> f64 {
    node.span().line_count() as f64
}

fn nom(node: Node<'_>, _: &MetricOptions) -> f64 {
    class_members(node).filter(|m| is_function(*m)).count() as f64
}

pub(super) static METRICS: &[Metric] = &[
    Metric {
        key: "CYCLO",
        description: "Cyclomatic complexity of a function",
        applies_to: is_function,
        compute: cyclo,
        options: &[IGNORE_BOOLEAN_PATHS],
        required_options: &[],
    },
    Metric {
        key: "LOC",
        description: "Lines of code spanned by the node",
        applies_to: any,
        compute: loc,
        options: &[],
        required_options: &[],
    },
    Metric {
        key: "NOM",
        description: "Number of methods declared by a class",
        applies_to: is_class,
        compute: nom,
        options: &[],
        required_options: &[],
    },
];

#[cfg(test)]
mod tests {
    use super::super::tests::parse;
    use super::*;
    use crate::metrics::compute;

    const SOURCE: &str = "\
class Router:
    def route(self, path, strict):
        if path == '/' and strict:
            return 'root'
        elif path.startswith('/api'):
            return 'api'
        for part in path.split('/'):
            try:
                int(part)
            except ValueError:
                pass
        def helper():
            if True:
                pass
        return [p for p in path if p]

    @property
    def name(self):
        return 'router'
";

    fn metric(key: &str) -> &'static Metric {
        METRICS.iter().find(|m| m.key == key).unwrap()
    }

    fn function<'t>(tree: &'t crate::ast::Tree, name: &str) -> Node<'t> {
        tree.root()
            .descendants()
            .find(|n| is_function(*n) && super::super::declared_name(*n) == Some(name))
            .unwrap()
    }

    #[test]
    fn test_cyclo() {
        let tree = parse(SOURCE);
        let route = function(&tree, "route");
        // 1 + if + and + elif + for + except + comprehension for + comprehension if
        assert_eq!(compute(metric("CYCLO"), &MetricOptions::empty(), route), Some(8.0));
        assert_eq!(
            compute(
                metric("CYCLO"),
                &MetricOptions::from_names([IGNORE_BOOLEAN_PATHS]),
                route
            ),
            Some(7.0)
        );
        assert_eq!(
            compute(metric("CYCLO"), &MetricOptions::empty(), function(&tree, "helper")),
            Some(2.0)
        );
    }

    #[test]
    fn test_class_metrics() {
        let tree = parse(SOURCE);
        let class = tree.root().child(0).unwrap();
        assert_eq!(compute(metric("NOM"), &MetricOptions::empty(), class), Some(2.0));
        assert_eq!(compute(metric("CYCLO"), &MetricOptions::empty(), class), None);
        assert_eq!(compute(metric("LOC"), &MetricOptions::empty(), class), Some(19.0));
    }
}
