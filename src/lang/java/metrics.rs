//! Java metrics.

use crate::ast::Node;
use crate::metrics::{compute_memoized, sum_below, Metric, MetricOptions};

use super::{is_callable, is_type};

pub(crate) const IGNORE_BOOLEAN_PATHS: &str = "ignoreBooleanPaths";
pub(crate) const CONSIDER_ASSERT: &str = "considerAssert";

/// Nested declarations carry their own metrics.
const BARRIERS: &[&str] = &[
    "class_body",
    "interface_body",
    "enum_body",
    "annotation_type_body",
];

/// Kinds counted as one statement by NCSS.
const STATEMENT_KINDS: &[&str] = &[
    "local_variable_declaration",
    "expression_statement",
    "if_statement",
    "for_statement",
    "enhanced_for_statement",
    "while_statement",
    "do_statement",
    "return_statement",
    "break_statement",
    "continue_statement",
    "throw_statement",
    "try_statement",
    "try_with_resources_statement",
    "catch_clause",
    "finally_clause",
    "switch_expression",
    "switch_label",
    "synchronized_statement",
    "assert_statement",
    "labeled_statement",
    "yield_statement",
    "explicit_constructor_invocation",
    "field_declaration",
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
    "static_initializer",
];

fn any(_: Node<'_>) -> bool {
    true
}

fn is_boolean_operator(node: Node<'_>) -> bool {
    node.kind() == "binary_expression" && matches!(node.token("operator"), Some("&&" | "||"))
}

fn decision_weight(node: Node<'_>, options: &MetricOptions) -> f64 {
    let boolean_paths = !options.contains(IGNORE_BOOLEAN_PATHS);
    match node.kind() {
        "if_statement" | "for_statement" | "enhanced_for_statement" | "while_statement"
        | "do_statement" | "catch_clause" | "ternary_expression" => 1.0,
        // `default` labels are not a decision.
        "switch_label" if !node.text().starts_with("default") => 1.0,
        "assert_statement" if options.contains(CONSIDER_ASSERT) => 1.0,
        _ if boolean_paths && is_boolean_operator(node) => {
            // Assert conditions only count when asserts do.
            let in_assert = node
                .ancestors()
                .take_while(|a| !is_callable(*a))
                .any(|a| a.kind() == "assert_statement");
            if in_assert && !options.contains(CONSIDER_ASSERT) {
                0.0
            } else {
                1.0
            }
        }
        _ => 0.0,
    }
}

fn cyclo(node: Node<'_>, options: &MetricOptions) -> f64 {
    1.0 + sum_below(node, BARRIERS, |n| decision_weight(n, options))
}

fn ncss(node: Node<'_>, _: &MetricOptions) -> f64 {
    let barriers: &[&str] = if is_type(node) { &[] } else { BARRIERS };
    1.0 + sum_below(node, barriers, |n| {
        if STATEMENT_KINDS.contains(&n.kind()) {
            1.0
        } else {
            0.0
        }
    })
}

fn loc(node: Node<'_>, _: &MetricOptions) -> f64 {
    node.span().line_count() as f64
}

/// Methods and constructors declared directly in a type's body.
fn operations<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    node.child_by_field("body")
        .into_iter()
        .flat_map(|body| body.children())
        .filter(|member| is_callable(*member))
}

fn wmc(node: Node<'_>, options: &MetricOptions) -> f64 {
    operations(node)
        .filter_map(|op| compute_memoized(&METRICS[0], options, op))
        .sum()
}

fn nom(node: Node<'_>, _: &MetricOptions) -> f64 {
    operations(node)
        .filter(|op| op.kind() == "method_declaration")
        .count() as f64
}

pub(super) static METRICS: &[Metric] = &[
    Metric {
        key: "CYCLO",
        description: "Cyclomatic complexity of a method or constructor",
        applies_to: is_callable,
        compute: cyclo,
        options: &[IGNORE_BOOLEAN_PATHS, CONSIDER_ASSERT],
        required_options: &[],
    },
    Metric {
        key: "NCSS",
        description: "Non-commenting source statements",
        applies_to: is_callable_or_type,
        compute: ncss,
        options: &[],
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
        key: "WMC",
        description: "Weighted method count: sum of the CYCLO of a type's operations",
        applies_to: is_type,
        compute: wmc,
        options: &[IGNORE_BOOLEAN_PATHS, CONSIDER_ASSERT],
        required_options: &[],
    },
    Metric {
        key: "NOM",
        description: "Number of methods declared by a type",
        applies_to: is_type,
        compute: nom,
        options: &[],
        required_options: &[],
    },
];

fn is_callable_or_type(node: Node<'_>) -> bool {
    is_callable(node) || is_type(node)
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse;
    use super::*;
    use crate::metrics::compute;

    const SOURCE: &str = r#"
class Calc {
    int classify(int a, boolean b) {
        if (a > 0 && b) {
            return 1;
        }
        for (int i = 0; i < a; i++) {
            a = a > 5 ? a : 0;
        }
        switch (a) {
            case 1: return 2;
            case 2: return 3;
            default: return 4;
        }
    }

    void check(int a) {
        assert a > 0 || a < -5;
    }

    Calc() {}
}
"#;

    fn metric(key: &str) -> &'static Metric {
        METRICS.iter().find(|m| m.key == key).unwrap()
    }

    fn method<'t>(tree: &'t crate::ast::Tree, name: &str) -> Node<'t> {
        tree.root()
            .descendants()
            .find(|n| is_callable(*n) && super::super::declared_name(*n) == Some(name))
            .unwrap()
    }

    #[test]
    fn test_cyclo() {
        let tree = parse(SOURCE);
        let classify = method(&tree, "classify");
        // 1 + if + && + for + ternary + 2 cases
        assert_eq!(compute(metric("CYCLO"), &MetricOptions::empty(), classify), Some(7.0));
        assert_eq!(
            compute(
                metric("CYCLO"),
                &MetricOptions::from_names([IGNORE_BOOLEAN_PATHS]),
                classify
            ),
            Some(6.0)
        );

        let check = method(&tree, "check");
        assert_eq!(compute(metric("CYCLO"), &MetricOptions::empty(), check), Some(1.0));
        assert_eq!(
            compute(metric("CYCLO"), &MetricOptions::from_names([CONSIDER_ASSERT]), check),
            Some(3.0)
        );
    }

    #[test]
    fn test_not_applicable() {
        let tree = parse(SOURCE);
        let class = tree.root().child(0).unwrap();
        assert_eq!(compute(metric("CYCLO"), &MetricOptions::empty(), class), None);
        assert_eq!(compute(metric("NOM"), &MetricOptions::empty(), tree.root()), None);
    }

    #[test]
    fn test_type_metrics() {
        let tree = parse(SOURCE);
        let class = tree.root().child(0).unwrap();
        assert_eq!(compute(metric("NOM"), &MetricOptions::empty(), class), Some(2.0));
        // 7 + 1 + 1
        assert_eq!(compute(metric("WMC"), &MetricOptions::empty(), class), Some(9.0));
        assert_eq!(compute(metric("LOC"), &MetricOptions::empty(), class), Some(21.0));
    }

    #[test]
    fn test_ncss() {
        let tree = parse(SOURCE);
        let check = method(&tree, "check");
        assert_eq!(compute(metric("NCSS"), &MetricOptions::empty(), check), Some(2.0));
    }

    #[test]
    fn test_repeated_calls_identical() {
        let tree = parse(SOURCE);
        for node in tree.root().descendants_or_self() {
            for m in METRICS {
                let first = compute_memoized(m, &MetricOptions::empty(), node);
                let second = compute_memoized(m, &MetricOptions::empty(), node);
                assert_eq!(first, second);
                assert!(first.map_or(true, f64::is_finite));
            }
        }
    }
}
