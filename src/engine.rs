//! Parallel analysis of many files.
//!
//! Every file is handled by one task that parses it, runs each rule of its
//! language and fills its own [`Report`]. Tasks share nothing mutable. When
//! all tasks are done the reports are merged in input order, after a
//! run-level report that holds configuration errors.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use rayon::prelude::*;

use crate::lang::{LanguageHandler, LanguageRegistry};
use crate::report::{ConfigurationError, MergedReport, ProcessingError, Report};
use crate::rule::{Rule, RuleContext, RuleEntry, RuleSet, XPathRule};

/// Source text of one file to analyze.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub file_id: String,
    /// Language id. When absent, the file extension decides.
    pub language: Option<String>,
    pub source: String,
}

impl SourceInput {
    pub fn new(file_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            language: None,
            source: source.into(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Knobs for a run.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Worker threads. `None` uses rayon's default.
    pub threads: Option<usize>,
}

/// Stops a run from starting new files.
///
/// Files already being analyzed finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one file task.
#[derive(Default)]
struct FileOutcome {
    report: Report,
    /// Rules that failed because of their own definition, with the reason.
    broken_rules: Vec<(usize, String)>,
}

/// Runs a fixed set of rules over source files.
pub struct Engine<'r> {
    registry: &'r LanguageRegistry,
    rules: Vec<Box<dyn Rule>>,
    setup_errors: Vec<ConfigurationError>,
}

impl<'r> Engine<'r> {
    pub fn new(registry: &'r LanguageRegistry) -> Self {
        Self {
            registry,
            rules: Vec::new(),
            setup_errors: Vec::new(),
        }
    }

    /// Add a rule. Rules for unregistered languages are reported and dropped.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        if self.registry.lookup(rule.language()).is_none() {
            self.reject(rule.id(), format!("unknown language '{}'", rule.language()));
            return;
        }
        self.rules.push(rule);
    }

    /// Compile and add every rule of a rule set.
    ///
    /// A rule that is malformed or does not compile becomes a configuration
    /// error and is not run. The other rules are unaffected.
    pub fn add_rule_set(&mut self, rule_set: &RuleSet) {
        for entry in &rule_set.rules {
            let definition = match entry {
                RuleEntry::Defined(definition) => definition,
                RuleEntry::Rejected { id, reason } => {
                    self.reject(id, reason.clone());
                    continue;
                }
            };
            let Some(handler) = self.registry.lookup(&definition.language) else {
                self.reject(
                    &definition.id,
                    format!("unknown language '{}'", definition.language),
                );
                continue;
            };
            match XPathRule::compile(definition, handler.as_ref()) {
                Ok(rule) => self.rules.push(Box::new(rule)),
                Err(e) => self.reject(&definition.id, e.to_string()),
            }
        }
    }

    fn reject(&mut self, rule_id: &str, detail: String) {
        tracing::warn!(rule = %rule_id, %detail, "rule disabled");
        self.setup_errors.push(ConfigurationError::new(rule_id, detail));
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Errors recorded while adding rules.
    pub fn configuration_errors(&self) -> &[ConfigurationError] {
        &self.setup_errors
    }

    /// Analyze in-memory sources.
    pub fn run(&self, inputs: &[SourceInput], config: &EngineConfig, cancel: &CancelToken) -> MergedReport {
        self.run_tasks(inputs, config, cancel, |input| Ok(Cow::Borrowed(input)))
    }

    /// Analyze files on disk. Unreadable files become processing errors.
    pub fn run_paths(&self, paths: &[PathBuf], config: &EngineConfig, cancel: &CancelToken) -> MergedReport {
        self.run_tasks(paths, config, cancel, |path| read_source(path).map(Cow::Owned))
    }

    fn run_tasks<T, F>(&self, items: &[T], config: &EngineConfig, cancel: &CancelToken, load: F) -> MergedReport
    where
        T: Sync,
        F: Fn(&T) -> Result<Cow<'_, SourceInput>, ProcessingError> + Sync,
    {
        tracing::info!(files = items.len(), rules = self.rules.len(), "starting analysis");

        let analyze_all = || -> Vec<Option<FileOutcome>> {
            items
                .par_iter()
                .map(|item| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(match load(item) {
                        Ok(input) => self.analyze(&input),
                        Err(error) => {
                            tracing::warn!(file = %error.file, error = %error.message, "could not read file");
                            let mut outcome = FileOutcome::default();
                            outcome.report.add_processing_error(error);
                            outcome
                        }
                    })
                })
                .collect()
        };

        let outcomes = match config.threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(analyze_all),
                Err(e) => {
                    tracing::warn!(error = %e, "could not build thread pool, using the global one");
                    analyze_all()
                }
            },
            None => analyze_all(),
        };

        let skipped = outcomes.iter().filter(|o| o.is_none()).count();
        if skipped > 0 {
            tracing::info!(skipped, "analysis cancelled");
        }

        let mut run_report = Report::new();
        for error in &self.setup_errors {
            run_report.add_configuration_error(error.clone());
        }

        let mut file_reports = Vec::with_capacity(outcomes.len());
        let mut seen = HashSet::new();
        for outcome in outcomes.into_iter().flatten() {
            for (index, detail) in outcome.broken_rules {
                if seen.insert(index) {
                    let rule_id = self.rules[index].id();
                    tracing::warn!(rule = %rule_id, %detail, "rule failed");
                    run_report.add_configuration_error(ConfigurationError::new(rule_id, detail));
                }
            }
            file_reports.push(outcome.report);
        }

        MergedReport::merge(std::iter::once(run_report).chain(file_reports))
    }

    fn handler_for(&self, input: &SourceInput) -> Option<&Arc<dyn LanguageHandler>> {
        match &input.language {
            Some(language) => self.registry.lookup(language),
            None => Path::new(&input.file_id)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(|ext| self.registry.for_extension(ext)),
        }
    }

    /// Parse one file and run its language's rules on it.
    fn analyze(&self, input: &SourceInput) -> FileOutcome {
        let mut outcome = FileOutcome::default();
        let file = input.file_id.as_str();

        let Some(handler) = self.handler_for(input) else {
            outcome.report.add_processing_error(ProcessingError::new(
                file,
                "no language handler for this file",
            ));
            return outcome;
        };
        let handler = handler.as_ref();

        let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
            handler.parser()?.parse(&input.source, file)
        }));
        let tree = match parsed {
            Ok(Ok(tree)) => tree,
            Ok(Err(e)) => {
                tracing::debug!(file, error = %e, "parse failed");
                outcome
                    .report
                    .add_processing_error(ProcessingError::from_error(file, &e));
                return outcome;
            }
            Err(payload) => {
                outcome.report.add_processing_error(
                    ProcessingError::new(file, "parser panicked").with_cause(panic_message(&*payload)),
                );
                return outcome;
            }
        };
        outcome.report.add_file();
        tracing::debug!(file, nodes = tree.len(), "parsed");

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.language() != handler.language_id() {
                continue;
            }

            // Violations of a rule that fails are dropped with it.
            let mut scratch = Report::new();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut ctx = RuleContext::new(rule.as_ref(), handler, &mut scratch);
                rule.apply(tree.root(), &mut ctx)
            }));

            match result {
                Ok(Ok(())) => outcome.report.append(scratch),
                Ok(Err(e)) if e.is_configuration() => {
                    outcome.broken_rules.push((index, e.to_string()));
                }
                Ok(Err(e)) => {
                    let mut error = ProcessingError::from_error(file, &e);
                    error.message = format!("rule '{}': {}", rule.id(), error.message);
                    outcome.report.add_processing_error(error);
                }
                Err(payload) => {
                    outcome.report.add_processing_error(
                        ProcessingError::new(file, format!("rule '{}' panicked", rule.id()))
                            .with_cause(panic_message(&*payload)),
                    );
                }
            }
        }

        outcome
    }
}

fn read_source(path: &Path) -> Result<SourceInput, ProcessingError> {
    let file_id = path.display().to_string();
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", file_id))
        .map(|source| SourceInput::new(file_id.clone(), source))
        .map_err(|e| ProcessingError::from_anyhow(file_id.clone(), &e))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
