//! Path queries over syntax trees.
//!
//! Queries use a small XPath dialect. A query is compiled once per rule and
//! language: parsing, function resolution, variable binding and static
//! argument checks all happen in [`Query::compile`]. Evaluation then only
//! fails on genuine runtime problems.

pub mod attribute;
mod eval;
pub mod functions;
mod lexer;
mod parser;
pub mod value;

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::Node;
use crate::lang::LanguageHandler;

pub use attribute::{attribute, attributes_of, AttrValue, Attribute, AttributeProvider, NoAttributes};
pub use functions::{CallContext, FunctionDef, ItemType, SequenceType, CORE_FUNCTIONS};
pub use value::{Item, Value};

/// Values bound to `$name` references.
pub type Variables = HashMap<String, Value>;

/// Errors from compiling or evaluating a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("unknown variable '${0}'")]
    UnknownVariable(String),
    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{0}")]
    BadArgument(String),
    #[error("{0}")]
    Evaluation(String),
}

impl QueryError {
    /// Whether the error is the rule author's fault rather than the input's.
    ///
    /// Configuration errors are reported once per rule; evaluation errors
    /// are reported per file.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, QueryError::Evaluation(_))
    }
}

/// A compiled path query, bound to one language.
#[derive(Debug)]
pub struct Query {
    source: String,
    language: &'static str,
    expr: parser::Expr,
}

impl Query {
    /// Parse and resolve a query for a language.
    pub fn compile(
        source: &str,
        handler: &dyn LanguageHandler,
        variables: &Variables,
    ) -> Result<Self, QueryError> {
        let tokens = lexer::tokenize(source)?;
        let expr = parser::parse(tokens, handler, variables)?;
        Ok(Self {
            source: source.to_string(),
            language: handler.language_id(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn language(&self) -> &'static str {
        self.language
    }

    /// Evaluate against the document containing `root`.
    ///
    /// The initial context item is the document itself, not a node.
    pub fn evaluate_value(&self, root: Node<'_>, handler: &dyn LanguageHandler) -> Result<Value, QueryError> {
        let tree = root.tree();
        if tree.language() != self.language || handler.language_id() != self.language {
            return Err(QueryError::Evaluation(format!(
                "query compiled for '{}' applied to a '{}' tree",
                self.language,
                tree.language()
            )));
        }
        eval::Evaluator::new(tree, handler).evaluate_document(&self.expr)
    }

    /// Evaluate and keep only node results, in document order.
    pub fn evaluate<'t>(&self, root: Node<'t>, handler: &dyn LanguageHandler) -> Result<Vec<Node<'t>>, QueryError> {
        let tree = root.tree();
        let value = self.evaluate_value(root, handler)?;
        let atomic = value.len() - value.node_ids().count();
        if atomic > 0 {
            tracing::debug!(
                query = %self.source,
                atomic,
                "ignoring atomic query results"
            );
        }
        Ok(value.node_ids().filter_map(|id| tree.node(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Parser, ParseError, Span, Tree, TreeBuilder};
    use crate::metrics::{Metric, MetricsProvider, StaticMetrics};

    const SOURCE: &str = "class A { m() {} n() }";

    fn span(start: usize, end: usize) -> Span {
        Span {
            start_byte: start,
            end_byte: end,
            start_line: 1,
            start_col: start + 1,
            end_line: 1,
            end_col: end + 1,
        }
    }

    /// class_declaration { method_declaration { block }, method_declaration }
    fn build(language: &'static str) -> Tree {
        let mut b = TreeBuilder::new(language, "A.fake", SOURCE);
        b.open("class_declaration", None, span(0, 22));
        b.open("method_declaration", None, span(10, 16));
        b.leaf("block", Some("body"), span(14, 16));
        b.close();
        b.leaf("method_declaration", None, span(17, 20));
        b.close();
        b.finish().unwrap()
    }

    struct FakeAttributes;

    impl AttributeProvider for FakeAttributes {
        fn attributes(&self, node: Node<'_>) -> Vec<Attribute> {
            match node.kind() {
                "method_declaration" => {
                    let name = node.text().split('(').next().unwrap_or("");
                    vec![Attribute::new("Name", name)]
                }
                _ => Vec::new(),
            }
        }
    }

    fn is_method(node: Node<'_>) -> bool {
        node.kind() == "method_declaration"
    }

    fn child_count(node: Node<'_>, _: &crate::metrics::MetricOptions) -> f64 {
        node.child_count() as f64
    }

    static METRICS: &[Metric] = &[Metric {
        key: "KIDS",
        description: "number of children",
        applies_to: is_method,
        compute: child_count,
        options: &[],
        required_options: &[],
    }];

    fn fn_kids(ctx: &CallContext<'_, '_>, _: &[Value]) -> Result<Value, QueryError> {
        Ok(Value::single(ctx.focus_node()?.child_count() as f64))
    }

    static FUNCTIONS: &[FunctionDef] = &[FunctionDef {
        name: "kids",
        args: &[],
        result: SequenceType::SINGLE_NUMBER,
        depends_on_focus: true,
        call: fn_kids,
        check: None,
    }];

    struct Fake;

    impl LanguageHandler for Fake {
        fn language_id(&self) -> &'static str {
            "fake"
        }
        fn display_name(&self) -> &'static str {
            "Fake"
        }
        fn file_extensions(&self) -> &'static [&'static str] {
            &["fake"]
        }
        fn parser(&self) -> Result<Box<dyn Parser>, ParseError> {
            Err(ParseError::Language("fake".to_string()))
        }
        fn attributes(&self) -> &dyn AttributeProvider {
            &FakeAttributes
        }
        fn metrics(&self) -> &dyn MetricsProvider {
            static FAKE_METRICS: StaticMetrics = StaticMetrics(METRICS);
            &FAKE_METRICS
        }
        fn functions(&self) -> &[FunctionDef] {
            FUNCTIONS
        }
    }

    fn compile(source: &str) -> Result<Query, QueryError> {
        Query::compile(source, &Fake, &Variables::new())
    }

    /// Start column of every selected node.
    fn select(tree: &Tree, source: &str) -> Vec<usize> {
        compile(source)
            .unwrap()
            .evaluate(tree.root(), &Fake)
            .unwrap()
            .iter()
            .map(|n| n.span().start_col)
            .collect()
    }

    fn value(tree: &Tree, source: &str) -> Result<Value, QueryError> {
        compile(source)?.evaluate_value(tree.root(), &Fake)
    }

    #[test]
    fn test_paths_and_predicates() {
        let tree = build("fake");
        assert_eq!(select(&tree, "//MethodDeclaration"), vec![11, 18]);
        assert_eq!(select(&tree, "/ClassDeclaration/MethodDeclaration"), vec![11, 18]);
        assert_eq!(select(&tree, "//MethodDeclaration[2]"), vec![18]);
        assert_eq!(select(&tree, "//MethodDeclaration[@Name = 'n']"), vec![18]);
        assert_eq!(select(&tree, "//MethodDeclaration[Block]"), vec![11]);
        assert_eq!(select(&tree, "//Block/.."), vec![11]);
        assert_eq!(select(&tree, "//Block/ancestor::*"), vec![1, 11]);
        assert_eq!(select(&tree, "//MethodDeclaration[1]/following-sibling::*"), vec![18]);
        assert!(select(&tree, "//Nothing").is_empty());
    }

    /// compilation_unit { class { method }, class { method, method } }
    fn build_two_classes() -> Tree {
        let source = "class A { m() {} } class B { n() p() }";
        let mut b = TreeBuilder::new("fake", "B.fake", source);
        b.open("compilation_unit", None, span(0, 38));
        b.open("class_declaration", None, span(0, 18));
        b.leaf("method_declaration", None, span(10, 16));
        b.close();
        b.open("class_declaration", None, span(19, 38));
        b.leaf("method_declaration", None, span(29, 32));
        b.leaf("method_declaration", None, span(33, 36));
        b.close();
        b.close();
        b.finish().unwrap()
    }

    #[test]
    fn test_positional_predicates_count_per_parent() {
        let tree = build_two_classes();
        assert_eq!(select(&tree, "//MethodDeclaration[1]"), vec![11, 30]);
        assert_eq!(select(&tree, "//MethodDeclaration[last()]"), vec![11, 34]);
        assert_eq!(select(&tree, "//MethodDeclaration[position() = 2]"), vec![34]);
        assert_eq!(
            select(&tree, "/descendant-or-self::node()/child::MethodDeclaration[1]"),
            vec![11, 30]
        );
        assert_eq!(
            select(&tree, "//ClassDeclaration/child::MethodDeclaration[1]"),
            vec![11, 30]
        );
        assert_eq!(select(&tree, "//ClassDeclaration//MethodDeclaration[1]"), vec![11, 30]);
        // The root is the first child of the document.
        assert_eq!(select(&tree, "//*[1]"), vec![1, 1, 11, 30]);
        assert_eq!(value(&tree, "count(//CompilationUnit[1])").unwrap(), Value::single(1.0));
    }

    #[test]
    fn test_positional_predicate_on_whole_sequence() {
        let tree = build_two_classes();
        assert_eq!(select(&tree, "(//MethodDeclaration)[1]"), vec![11]);
        assert_eq!(select(&tree, "(//MethodDeclaration)[last()]"), vec![34]);
        assert_eq!(select(&tree, "//MethodDeclaration"), vec![11, 30, 34]);
        assert_eq!(value(&tree, "count(//MethodDeclaration[1])").unwrap(), Value::single(2.0));
    }

    #[test]
    fn test_union_is_document_ordered_without_duplicates() {
        let tree = build("fake");
        assert_eq!(
            select(&tree, "//MethodDeclaration[2] | //Block | //MethodDeclaration"),
            vec![11, 15, 18]
        );
    }

    #[test]
    fn test_atomic_values() {
        let tree = build("fake");
        assert_eq!(
            value(&tree, "count(//MethodDeclaration) + 1").unwrap(),
            Value::single(3.0)
        );
        assert_eq!(
            value(&tree, "//MethodDeclaration/@Name").unwrap(),
            Value::from_items(vec![Item::from("m"), Item::from("n")])
        );
        // Node selection drops atomic results.
        assert!(compile("//MethodDeclaration/@Name")
            .unwrap()
            .evaluate(tree.root(), &Fake)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_metric_function() {
        let tree = build("fake");
        assert_eq!(select(&tree, "//MethodDeclaration[metric('KIDS') = 1]"), vec![11]);
        assert_eq!(select(&tree, "//*[metric('kids') >= 0]"), vec![11, 18]);
        // Not applicable is NaN, which is unequal to itself.
        assert_eq!(select(&tree, "//*[metric('KIDS') != metric('KIDS')]"), vec![1, 15]);
    }

    #[test]
    fn test_language_functions_and_prefixes() {
        let tree = build("fake");
        assert_eq!(select(&tree, "//MethodDeclaration[kids() = 0]"), vec![18]);
        assert_eq!(select(&tree, "//MethodDeclaration[fake:kids() = 1]"), vec![11]);
        assert_eq!(value(&tree, "fn:count(//Block)").unwrap(), Value::single(1.0));
        assert_eq!(
            compile("//X[fn:kids()]").unwrap_err(),
            QueryError::UnknownFunction("fn:kids".to_string())
        );
    }

    #[test]
    fn test_focus_dependent_function_at_document() {
        let tree = build("fake");
        let err = value(&tree, "metric('KIDS')").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Incorrect node type: the 'metric' function cannot be applied"
        );
        assert!(!err.is_configuration());
        assert!(value(&tree, "name()").is_err());
        assert_eq!(value(&tree, ".").unwrap(), Value::empty());
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(compile("//X["), Err(QueryError::Syntax { .. })));
        assert!(matches!(compile("/"), Err(QueryError::Syntax { .. })));
        assert_eq!(
            compile("//X[nope()]").unwrap_err(),
            QueryError::UnknownFunction("nope".to_string())
        );
        assert_eq!(
            compile("//X[$limit]").unwrap_err(),
            QueryError::UnknownVariable("limit".to_string())
        );
        assert!(matches!(
            compile("count()"),
            Err(QueryError::Arity { expected: 1, found: 0, .. })
        ));
        assert_eq!(
            compile("//X[metric('NOPE') > 1]").unwrap_err().to_string(),
            "'NOPE' is not the name of a metric"
        );
        assert!(matches!(
            compile("matches('a', '(')"),
            Err(QueryError::BadArgument(_))
        ));
    }

    #[test]
    fn test_variables_are_bound_at_compile_time() {
        let tree = build("fake");
        let mut variables = Variables::new();
        variables.insert("name".to_string(), Value::single("m"));
        let query = Query::compile("//MethodDeclaration[@Name = $name]", &Fake, &variables).unwrap();
        let nodes = query.evaluate(tree.root(), &Fake).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].span().start_col, 11);
    }

    #[test]
    fn test_wrong_language_tree() {
        let tree = build("other");
        let err = compile("//MethodDeclaration")
            .unwrap()
            .evaluate(tree.root(), &Fake)
            .unwrap_err();
        assert!(matches!(err, QueryError::Evaluation(_)));
    }
}
