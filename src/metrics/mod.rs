//! Named structural metrics.
//!
//! A metric is a pure function of a node and a set of options. Each
//! language publishes its metrics through a [`MetricsProvider`]; the
//! `metric(key)` query function and the CLI read them from there.

use std::collections::BTreeSet;
use std::fmt;

use crate::ast::Node;
use crate::query::functions::bad_metric_key_message;
use crate::query::QueryError;

/// Whether a metric can be computed for a node.
pub type AppliesFn = for<'t> fn(Node<'t>) -> bool;

/// Computes a metric for a node it applies to.
pub type ComputeFn = for<'t> fn(Node<'t>, &MetricOptions) -> f64;

/// A named metric of one language.
#[derive(Clone, Copy)]
pub struct Metric {
    /// Stable key, unique within a language (e.g. `CYCLO`).
    pub key: &'static str,
    pub description: &'static str,
    pub applies_to: AppliesFn,
    pub compute: ComputeFn,
    /// Options the metric understands.
    pub options: &'static [&'static str],
    /// Options that must be present for the metric to run.
    pub required_options: &'static [&'static str],
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric").field("key", &self.key).finish()
    }
}

/// An immutable set of metric option names.
///
/// Unknown options are ignored by metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MetricOptions {
    names: BTreeSet<String>,
}

impl MetricOptions {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Fail if an option the metric requires is missing.
    pub fn check(&self, metric: &Metric) -> Result<(), QueryError> {
        match metric.required_options.iter().find(|o| !self.contains(o)) {
            Some(missing) => Err(QueryError::BadArgument(format!(
                "metric '{}' requires option '{}'",
                metric.key, missing
            ))),
            None => Ok(()),
        }
    }

    /// Stable textual form, used as part of memo keys.
    fn cache_key(&self) -> String {
        self.names.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// The metrics of one language.
pub trait MetricsProvider: Send + Sync {
    fn metrics(&self) -> &[Metric];

    /// Look up a metric by key, ignoring ASCII case.
    fn metric_with_name(&self, key: &str) -> Option<&Metric> {
        self.metrics().iter().find(|m| m.key.eq_ignore_ascii_case(key))
    }
}

/// A provider backed by a static table.
pub struct StaticMetrics(pub &'static [Metric]);

impl MetricsProvider for StaticMetrics {
    fn metrics(&self) -> &[Metric] {
        self.0
    }
}

/// Compute a metric. `None` means the metric does not apply to the node.
///
/// Non-finite results are treated as not applicable.
pub fn compute(metric: &Metric, options: &MetricOptions, node: Node<'_>) -> Option<f64> {
    if !(metric.applies_to)(node) {
        return None;
    }
    let value = (metric.compute)(node, options);
    value.is_finite().then_some(value)
}

/// Like [`compute`], caching the result on the node's tree.
pub fn compute_memoized(metric: &Metric, options: &MetricOptions, node: Node<'_>) -> Option<f64> {
    node.tree()
        .memo_metric(node.id(), metric.key, options.cache_key(), || {
            compute(metric, options, node)
        })
}

/// Look up a metric by key and compute it.
///
/// An unknown key is an error, unlike a metric that does not apply.
pub fn compute_with_name(
    provider: &dyn MetricsProvider,
    key: &str,
    options: &MetricOptions,
    node: Node<'_>,
) -> Result<Option<f64>, QueryError> {
    let metric = provider
        .metric_with_name(key)
        .ok_or_else(|| QueryError::BadArgument(bad_metric_key_message(key)))?;
    options.check(metric)?;
    Ok(compute_memoized(metric, options, node))
}

/// Cyclomatic-style decision counting shared by the language metrics.
///
/// Walks the subtree below `node`, skipping kinds in `barriers` (nested
/// declarations that have their own metrics), and adds `weight(n)` for
/// every visited node.
pub(crate) fn sum_below(node: Node<'_>, barriers: &[&str], mut weight: impl FnMut(Node<'_>) -> f64) -> f64 {
    let mut total = 0.0;
    for child in node.children() {
        child.walk(|n| {
            if barriers.contains(&n.kind()) {
                return crate::ast::Walk::Skip;
            }
            total += weight(n);
            crate::ast::Walk::Continue
        });
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Span, TreeBuilder};

    fn is_leaf(node: Node<'_>) -> bool {
        node.is_leaf()
    }

    fn child_count(node: Node<'_>, options: &MetricOptions) -> f64 {
        if options.contains("double") {
            node.child_count() as f64 * 2.0
        } else {
            node.child_count() as f64
        }
    }

    fn always(_: Node<'_>) -> bool {
        true
    }

    fn infinite(_: Node<'_>, _: &MetricOptions) -> f64 {
        f64::INFINITY
    }

    static METRICS: &[Metric] = &[
        Metric {
            key: "KIDS",
            description: "number of children",
            applies_to: always,
            compute: child_count,
            options: &["double"],
            required_options: &[],
        },
        Metric {
            key: "LEAFY",
            description: "only for leaves",
            applies_to: is_leaf,
            compute: child_count,
            options: &[],
            required_options: &["mode"],
        },
        Metric {
            key: "INF",
            description: "never finite",
            applies_to: always,
            compute: infinite,
            options: &[],
            required_options: &[],
        },
    ];

    fn tree() -> crate::ast::Tree {
        let mut b = TreeBuilder::new("fake", "f", "");
        b.open("root", None, Span::default());
        b.leaf("a", None, Span::default());
        b.leaf("b", None, Span::default());
        b.close();
        b.finish().unwrap()
    }

    #[test]
    fn test_lookup_ignores_case() {
        let provider = StaticMetrics(METRICS);
        assert_eq!(provider.metric_with_name("kids").map(|m| m.key), Some("KIDS"));
        assert!(provider.metric_with_name("does-not-exist").is_none());
    }

    #[test]
    fn test_not_applicable_is_none() {
        let tree = tree();
        let leafy = &METRICS[1];
        assert_eq!(compute(leafy, &MetricOptions::empty(), tree.root()), None);
        assert_eq!(compute(&METRICS[2], &MetricOptions::empty(), tree.root()), None);
    }

    #[test]
    fn test_options_and_memo() {
        let tree = tree();
        let kids = &METRICS[0];
        let plain = MetricOptions::empty();
        let double = MetricOptions::from_names(["double", "unknown"]);

        assert_eq!(compute_memoized(kids, &plain, tree.root()), Some(2.0));
        assert_eq!(compute_memoized(kids, &double, tree.root()), Some(4.0));
        // Repeated calls are identical.
        assert_eq!(compute_memoized(kids, &plain, tree.root()), Some(2.0));
    }

    #[test]
    fn test_required_options() {
        let leafy = &METRICS[1];
        assert!(MetricOptions::empty().check(leafy).is_err());
        assert!(MetricOptions::from_names(["mode"]).check(leafy).is_ok());
    }

    #[test]
    fn test_unknown_key_message() {
        let tree = tree();
        let err = compute_with_name(
            &StaticMetrics(METRICS),
            "does-not-exist",
            &MetricOptions::empty(),
            tree.root(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "'does-not-exist' is not the name of a metric");
    }
}
