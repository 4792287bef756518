//! Treelint - multi-language static analysis over syntax trees.
//!
//! Source files are parsed into a language-agnostic node tree. Rules select
//! nodes with a small path-query language that can read per-language
//! attributes, call named functions and compute structural metrics. Each
//! file is analyzed independently and in parallel; the per-file reports are
//! merged in a stable order at the end.
//!
//! # Architecture
//!
//! - `ast`: Node model shared by all languages
//! - `query`: Path-query compiler, evaluator, attributes and functions
//! - `metrics`: Named structural metrics (cyclomatic complexity, NCSS, ...)
//! - `lang`: Language handlers and the registry that holds them
//! - `rule`: Rules, rule sets and the reporting context
//! - `report`: Violations, errors and the order-stable merge
//! - `engine`: Parallel driver over many files
//! - `render`: Output formatting (text, JSON, SARIF)
//!
//! # Adding a New Language
//!
//! See `src/lang/java/` for an example. Implement `LanguageHandler` and
//! register it in `LanguageRegistry::builtin`.

pub mod ast;
pub mod cli;
pub mod engine;
pub mod lang;
pub mod metrics;
pub mod query;
pub mod render;
pub mod report;
pub mod rule;

pub use ast::{Node, NodeId, ParseError, Parser, Span, Tree};
pub use engine::{CancelToken, Engine, EngineConfig, SourceInput};
pub use lang::{registry, LanguageHandler, LanguageRegistry};
pub use metrics::{Metric, MetricOptions, MetricsProvider};
pub use query::{Query, QueryError, Value};
pub use render::{Format, Renderer};
pub use report::{ConfigurationError, MergedReport, ProcessingError, Report, RuleViolation, Severity};
pub use rule::{Rule, RuleContext, RuleSet, XPathRule};
