//! Kind-keyed dispatch tables.
//!
//! Languages describe per-kind behavior (attributes, display hints) as a
//! table of plain functions instead of matching on grammar kinds all over
//! the engine. A visit function handles exactly one node and never recurses.

use std::collections::HashMap;

use super::Node;

/// A visit function for one node kind.
pub type Arm<R> = for<'t> fn(Node<'t>) -> R;

/// Dispatch table keyed by grammar kind, with a default arm.
pub struct KindDispatch<R> {
    arms: HashMap<&'static str, Arm<R>>,
    fallback: Arm<R>,
}

impl<R> KindDispatch<R> {
    /// Table whose every kind falls back to `fallback`.
    pub fn new(fallback: Arm<R>) -> Self {
        Self {
            arms: HashMap::new(),
            fallback,
        }
    }

    /// Override the behavior for one kind.
    pub fn on(mut self, kind: &'static str, arm: Arm<R>) -> Self {
        self.arms.insert(kind, arm);
        self
    }

    /// Override the behavior for several kinds at once.
    pub fn on_each(mut self, kinds: &[&'static str], arm: Arm<R>) -> Self {
        for kind in kinds {
            self.arms.insert(*kind, arm);
        }
        self
    }

    /// Whether a kind has its own arm.
    pub fn handles(&self, kind: &str) -> bool {
        self.arms.contains_key(kind)
    }

    pub fn dispatch(&self, node: Node<'_>) -> R {
        let arm = self.arms.get(node.kind()).copied().unwrap_or(self.fallback);
        arm(node)
    }
}
