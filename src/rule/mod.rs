//! Rules and the context they report through.

mod ruleset;
mod xpath;

pub use ruleset::{PropertyValue, RuleDefinition, RuleEntry, RuleSet};
pub use xpath::XPathRule;

use thiserror::Error;

use crate::ast::Node;
use crate::lang::LanguageHandler;
use crate::query::QueryError;
use crate::report::{Report, RuleViolation, Severity};

/// Errors a rule can raise while running on a file.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RuleError {
    /// Whether the failure comes from the rule's definition.
    ///
    /// Such failures are reported once per rule instead of once per file.
    pub fn is_configuration(&self) -> bool {
        matches!(self, RuleError::Query(e) if e.is_configuration())
    }
}

/// A check run against the tree of every file in its language.
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    /// Id of the language this rule applies to.
    fn language(&self) -> &str;

    fn severity(&self) -> Severity;

    /// Inspect a tree and report violations through `ctx`.
    fn apply(&self, root: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError>;
}

/// Per-file, per-rule reporting handle.
pub struct RuleContext<'a> {
    rule_id: &'a str,
    severity: Severity,
    handler: &'a dyn LanguageHandler,
    report: &'a mut Report,
}

impl<'a> RuleContext<'a> {
    pub fn new(rule: &'a dyn Rule, handler: &'a dyn LanguageHandler, report: &'a mut Report) -> Self {
        Self {
            rule_id: rule.id(),
            severity: rule.severity(),
            handler,
            report,
        }
    }

    /// The handler of the language being analyzed.
    pub fn handler(&self) -> &'a dyn LanguageHandler {
        self.handler
    }

    /// Record a violation at a node. Every call adds a separate entry.
    pub fn add_violation(&mut self, node: Node<'_>, message: impl Into<String>) {
        self.report.add_violation(RuleViolation {
            rule_id: self.rule_id.to_string(),
            severity: self.severity,
            message: message.into(),
            file: node.file_id().to_string(),
            span: node.span(),
            scope: self.handler.violation_scope(node),
        });
    }
}
