//! Generic tree traversal.

use super::Node;

/// What a [`Node::walk`] callback wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Descend into the node's children.
    Continue,
    /// Do not visit the node's children.
    Skip,
    /// Abort the traversal.
    Stop,
}

impl<'t> Node<'t> {
    /// Pre-order traversal with subtree pruning and early termination.
    ///
    /// The node itself is visited first. Returns `false` if the callback
    /// stopped the traversal.
    pub fn walk(&self, mut visit: impl FnMut(Node<'t>) -> Walk) -> bool {
        let mut stack = vec![*self];
        while let Some(node) = stack.pop() {
            match visit(node) {
                Walk::Stop => return false,
                Walk::Skip => {}
                Walk::Continue => stack.extend(node.children().rev()),
            }
        }
        true
    }

    /// Strict descendants in pre-order (document order).
    pub fn descendants(&self) -> Descendants<'t> {
        Descendants {
            stack: self.children().rev().collect(),
        }
    }

    /// This node followed by its descendants, in pre-order.
    pub fn descendants_or_self(&self) -> Descendants<'t> {
        Descendants { stack: vec![*self] }
    }

    /// Descendants matching a predicate, in pre-order.
    pub fn descendants_matching<F>(&self, pred: F) -> impl Iterator<Item = Node<'t>>
    where
        F: FnMut(&Node<'t>) -> bool,
    {
        self.descendants().filter(pred)
    }

    /// This node and its descendants in post-order (children before parents).
    pub fn post_order(&self) -> PostOrder<'t> {
        PostOrder {
            stack: vec![(*self, false)],
        }
    }
}

/// Pre-order iterator.
pub struct Descendants<'t> {
    stack: Vec<Node<'t>>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().rev());
        Some(node)
    }
}

/// Post-order iterator.
pub struct PostOrder<'t> {
    stack: Vec<(Node<'t>, bool)>,
}

impl<'t> Iterator for PostOrder<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, expanded) = self.stack.pop()?;
            if expanded || node.is_leaf() {
                return Some(node);
            }
            self.stack.push((node, true));
            self.stack.extend(node.children().rev().map(|c| (c, false)));
        }
    }
}
