//! Records collected in a report.

use std::error::Error as StdError;

use serde::{Deserialize, Serialize};

use crate::ast::Span;

/// Severity levels for violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Enclosing declarations of a violation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
}

impl ViolationScope {
    pub fn is_empty(&self) -> bool {
        self.package_name.is_none() && self.class_name.is_none() && self.method_name.is_none()
    }
}

/// One rule match at one source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub span: Span,
    #[serde(default, skip_serializing_if = "ViolationScope::is_empty")]
    pub scope: ViolationScope,
}

/// A file that could not be parsed or analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingError {
    pub file: String,
    pub message: String,
    /// Text of the underlying causes, outermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ProcessingError {
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Build from an error, keeping its source chain as the cause.
    pub fn from_error(file: impl Into<String>, err: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(s) = source {
            causes.push(s.to_string());
            source = s.source();
        }
        let error = Self::new(file, err.to_string());
        if causes.is_empty() {
            error
        } else {
            error.with_cause(causes.join("\nCaused by: "))
        }
    }

    /// Build from an `anyhow` error, keeping its context chain.
    pub fn from_anyhow(file: impl Into<String>, err: &anyhow::Error) -> Self {
        let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
        let error = Self::new(file, err.to_string());
        if causes.is_empty() {
            error
        } else {
            error.with_cause(causes.join("\nCaused by: "))
        }
    }

    /// Full description including causes. May contain control characters.
    pub fn detail(&self) -> String {
        match &self.cause {
            Some(cause) => format!("{}\nCaused by: {}", self.message, cause),
            None => self.message.clone(),
        }
    }
}

/// A rule that cannot run at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationError {
    pub rule_id: String,
    pub detail: String,
}

impl ConfigurationError {
    pub fn new(rule_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            detail: detail.into(),
        }
    }
}
