//! Rules defined by a path query.

use crate::ast::Node;
use crate::lang::LanguageHandler;
use crate::query::{Query, QueryError};
use crate::report::Severity;

use super::{Rule, RuleContext, RuleDefinition, RuleError};

/// A rule that reports every node its query selects.
#[derive(Debug)]
pub struct XPathRule {
    id: String,
    language: String,
    severity: Severity,
    message: String,
    query: Query,
}

impl XPathRule {
    /// Compile a definition for its language's handler.
    pub fn compile(definition: &RuleDefinition, handler: &dyn LanguageHandler) -> Result<Self, QueryError> {
        let query = Query::compile(&definition.query, handler, &definition.variables())?;
        Ok(Self {
            id: definition.id.clone(),
            language: handler.language_id().to_string(),
            severity: definition.severity,
            message: definition.render_message(),
            query,
        })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Rule for XPathRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn apply(&self, root: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        for node in self.query.evaluate(root, ctx.handler())? {
            ctx.add_violation(node, self.message.as_str());
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::lang::java::JavaHandler;
    use crate::report::{MergedReport, Report};
    use crate::rule::PropertyValue;

    fn definition(query: &str) -> RuleDefinition {
        RuleDefinition {
            id: "test-rule".to_string(),
            language: "java".to_string(),
            message: "found {what}".to_string(),
            severity: Severity::Info,
            description: None,
            query: query.to_string(),
            properties: BTreeMap::from([(
                "what".to_string(),
                PropertyValue::String("method".to_string()),
            )]),
        }
    }

    #[test]
    fn test_each_match_is_a_violation() {
        let handler = JavaHandler::new();
        let tree = handler
            .parser()
            .unwrap()
            .parse(
                "class A {\n  void a() {}\n  void b() {}\n  void c() {}\n}\n",
                "A.java",
            )
            .unwrap();

        let rule = XPathRule::compile(&definition("//MethodDeclaration"), &handler).unwrap();
        let mut report = Report::new();
        let mut ctx = RuleContext::new(&rule, &handler, &mut report);
        rule.apply(tree.root(), &mut ctx).unwrap();

        let merged = MergedReport::from(report);
        let violations = merged.violations();
        assert_eq!(violations.len(), 3);
        assert_eq!(
            violations.iter().map(|v| v.span.start_line).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert!(violations.iter().all(|v| v.message == "found method"));
        assert_eq!(violations[0].scope.class_name.as_deref(), Some("A"));
        assert_eq!(violations[1].scope.method_name.as_deref(), Some("b"));
    }

    #[test]
    fn test_compile_errors_are_configuration_errors() {
        let handler = JavaHandler::new();
        for query in ["//X[nope()]", "//X[$missing]", "//X[metric('NOPE') > 1]", "//X["] {
            let err = XPathRule::compile(&definition(query), &handler).unwrap_err();
            assert!(err.is_configuration(), "{}: {}", query, err);
        }
    }
}
