//! Arena-backed syntax trees.
//!
//! A [`Tree`] owns every node of one parsed file. Nodes are addressed by
//! [`NodeId`] and exposed through the cheap [`Node`] handle. Ids are handed
//! out in pre-order, so comparing ids compares document order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::{ParseError, Span};

/// Index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct NodeData {
    kind: &'static str,
    name: String,
    field: Option<&'static str>,
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Anonymous tokens stored under their grammar field (e.g. `operator`).
    tokens: Vec<(&'static str, String)>,
}

type MemoKey = (NodeId, &'static str, String);

/// An immutable, rooted, ordered syntax tree for one file.
pub struct Tree {
    language: &'static str,
    file_id: String,
    source: String,
    nodes: Vec<NodeData>,
    metric_memo: RefCell<HashMap<MemoKey, Option<f64>>>,
}

impl Tree {
    /// The root node.
    pub fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: NodeId(0),
        }
    }

    /// Handle for a node id from this tree.
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        (id.index() < self.nodes.len()).then_some(Node { tree: self, id })
    }

    pub fn language(&self) -> &'static str {
        self.language
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Memoize a metric value computed for a node.
    ///
    /// This decorates the tree without touching its structure.
    pub(crate) fn memo_metric(
        &self,
        id: NodeId,
        key: &'static str,
        options: String,
        compute: impl FnOnce() -> Option<f64>,
    ) -> Option<f64> {
        let memo_key = (id, key, options);
        if let Some(value) = self.metric_memo.borrow().get(&memo_key) {
            return *value;
        }
        let value = compute();
        self.metric_memo.borrow_mut().insert(memo_key, value);
        value
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("language", &self.language)
            .field("file_id", &self.file_id)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

/// A handle to one node of a [`Tree`].
///
/// Equality is identity: two handles are equal when they point at the same
/// node of the same tree allocation, regardless of structural similarity.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl<'t> Node<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    /// Grammar kind, e.g. `method_declaration`.
    pub fn kind(&self) -> &'static str {
        self.tree.data(self.id).kind
    }

    /// Structural name used by path queries, e.g. `MethodDeclaration`.
    pub fn name(&self) -> &'t str {
        &self.tree.data(self.id).name
    }

    /// Grammar field this node occupies in its parent, if any.
    pub fn field_name(&self) -> Option<&'static str> {
        self.tree.data(self.id).field
    }

    pub fn span(&self) -> Span {
        self.tree.data(self.id).span
    }

    pub fn language(&self) -> &'static str {
        self.tree.language
    }

    pub fn file_id(&self) -> &'t str {
        &self.tree.file_id
    }

    /// Source text covered by this node.
    pub fn text(&self) -> &'t str {
        let span = self.span();
        self.tree
            .source
            .get(span.start_byte..span.end_byte)
            .unwrap_or("")
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        self.tree.data(self.id).parent.map(|id| self.with_id(id))
    }

    pub fn is_root(&self) -> bool {
        self.tree.data(self.id).parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.tree.data(self.id).children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.tree.data(self.id).children.len()
    }

    /// Ordered children.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = Node<'t>> + ExactSizeIterator + 't {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |&id| Node { tree, id })
    }

    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        self.tree
            .data(self.id)
            .children
            .get(index)
            .map(|&id| self.with_id(id))
    }

    /// First child stored under the given grammar field.
    pub fn child_by_field(&self, field: &str) -> Option<Node<'t>> {
        self.children().find(|c| c.field_name() == Some(field))
    }

    /// All children stored under the given grammar field.
    pub fn children_by_field<'a>(&self, field: &'a str) -> impl Iterator<Item = Node<'t>> + 'a
    where
        't: 'a,
    {
        self.children().filter(move |c| c.field_name() == Some(field))
    }

    /// First child with the given grammar kind.
    pub fn child_of_kind(&self, kind: &str) -> Option<Node<'t>> {
        self.children().find(|c| c.kind() == kind)
    }

    /// Anonymous token text stored under a grammar field.
    pub fn token(&self, field: &str) -> Option<&'t str> {
        self.tree
            .data(self.id)
            .tokens
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, text)| text.as_str())
    }

    /// Every anonymous token stored under a grammar field, in source order.
    pub fn tokens<'a>(&self, field: &'a str) -> impl Iterator<Item = &'t str> + 'a
    where
        't: 'a,
    {
        self.tree
            .data(self.id)
            .tokens
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(|(_, text)| text.as_str())
    }

    /// Position among the parent's children (0 for the root).
    pub fn index_in_parent(&self) -> usize {
        self.parent()
            .and_then(|p| p.tree.data(p.id).children.iter().position(|&c| c == self.id))
            .unwrap_or(0)
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self) -> Ancestors<'t> {
        Ancestors {
            next: self.parent(),
        }
    }

    /// Siblings after this node, in document order.
    pub fn following_siblings(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let skip = self.index_in_parent() + 1;
        self.parent()
            .into_iter()
            .flat_map(move |p| p.children().skip(skip))
    }

    /// Siblings before this node, nearest first.
    pub fn preceding_siblings(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let take = self.index_in_parent();
        self.parent()
            .into_iter()
            .flat_map(move |p| p.children().take(take).rev())
    }

    fn with_id(&self, id: NodeId) -> Node<'t> {
        Node {
            tree: self.tree,
            id,
        }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl Hash for Node<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.tree as *const Tree).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.name(), self.id.0, self.span())
    }
}

/// Iterator over a node's ancestors.
pub struct Ancestors<'t> {
    next: Option<Node<'t>>,
}

impl<'t> Iterator for Ancestors<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Convert a grammar kind to its structural name.
///
/// `method_declaration` becomes `MethodDeclaration`.
pub fn structural_name(kind: &str) -> String {
    let mut name = String::with_capacity(kind.len());
    let mut upper = true;
    for ch in kind.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            name.extend(ch.to_uppercase());
            upper = false;
        } else {
            name.push(ch);
        }
    }
    name
}

/// Builds a [`Tree`] depth-first.
///
/// Call [`open`](Self::open) for a node, then its children, then
/// [`close`](Self::close). The first opened node becomes the root.
pub struct TreeBuilder {
    language: &'static str,
    file_id: String,
    source: String,
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
    problem: Option<String>,
}

impl TreeBuilder {
    pub fn new(language: &'static str, file_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            language,
            file_id: file_id.into(),
            source: source.into(),
            nodes: Vec::new(),
            stack: Vec::new(),
            problem: None,
        }
    }

    /// Start a node as a child of the currently open node.
    pub fn open(&mut self, kind: &'static str, field: Option<&'static str>, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.stack.last().copied();

        if parent.is_none() && !self.nodes.is_empty() {
            self.problem
                .get_or_insert_with(|| format!("second root node '{}'", kind));
        }
        if let Some(p) = parent {
            self.nodes[p.index()].children.push(id);
        }

        self.nodes.push(NodeData {
            kind,
            name: structural_name(kind),
            field,
            span,
            parent,
            children: Vec::new(),
            tokens: Vec::new(),
        });
        self.stack.push(id);
        id
    }

    /// Finish the currently open node.
    pub fn close(&mut self) {
        if self.stack.pop().is_none() {
            self.problem
                .get_or_insert_with(|| "close() without an open node".to_string());
        }
    }

    /// Add a childless node.
    pub fn leaf(&mut self, kind: &'static str, field: Option<&'static str>, span: Span) -> NodeId {
        let id = self.open(kind, field, span);
        self.close();
        id
    }

    /// Attach an anonymous token to the currently open node.
    pub fn token(&mut self, field: &'static str, text: impl Into<String>) {
        match self.stack.last() {
            Some(id) => self.nodes[id.index()].tokens.push((field, text.into())),
            None => {
                self.problem
                    .get_or_insert_with(|| format!("token '{}' outside of a node", field));
            }
        }
    }

    /// Finalize the tree. Fails if the node structure was not balanced.
    pub fn finish(self) -> Result<Tree, ParseError> {
        if let Some(problem) = self.problem {
            return Err(ParseError::Malformed(problem));
        }
        if self.nodes.is_empty() {
            return Err(ParseError::Malformed("tree has no root".to_string()));
        }
        if !self.stack.is_empty() {
            return Err(ParseError::Malformed(format!(
                "{} node(s) left open",
                self.stack.len()
            )));
        }

        Ok(Tree {
            language: self.language,
            file_id: self.file_id,
            source: self.source,
            nodes: self.nodes,
            metric_memo: RefCell::new(HashMap::new()),
        })
    }
}
