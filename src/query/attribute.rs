//! Node attributes exposed to path queries.
//!
//! Attributes are never stored on nodes. They are derived on demand, first
//! from the language's per-kind provider and then from the generic set every
//! node has (`BeginLine`, `EndColumn`, `Image`, ...).

use std::fmt;

use crate::ast::{KindDispatch, Node};

use super::value::{format_number, Item};

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl AttrValue {
    pub fn into_item(self) -> Item {
        match self {
            AttrValue::Str(s) => Item::Str(s),
            AttrValue::Num(n) => Item::Num(n),
            AttrValue::Bool(b) => Item::Bool(b),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => write!(f, "{}", s),
            AttrValue::Num(n) => write!(f, "{}", format_number(*n)),
            AttrValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<usize> for AttrValue {
    fn from(n: usize) -> Self {
        AttrValue::Num(n as f64)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Num(n)
    }
}

/// A named, typed fact about a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: &'static str,
    pub value: AttrValue,
}

impl Attribute {
    pub fn new(name: &'static str, value: impl Into<AttrValue>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Supplies the attributes of a node, dispatched on the node's kind.
pub trait AttributeProvider: Send + Sync {
    /// Kind-specific attributes of one node. Never includes children.
    fn attributes(&self, _node: Node<'_>) -> Vec<Attribute> {
        Vec::new()
    }
}

/// Provider for languages without kind-specific attributes.
pub struct NoAttributes;

impl AttributeProvider for NoAttributes {}

impl AttributeProvider for KindDispatch<Vec<Attribute>> {
    fn attributes(&self, node: Node<'_>) -> Vec<Attribute> {
        self.dispatch(node)
    }
}

/// Attributes every node has, regardless of language.
pub fn generic_attributes(node: Node<'_>) -> Vec<Attribute> {
    let span = node.span();
    let mut attrs = vec![
        Attribute::new("BeginLine", span.start_line),
        Attribute::new("BeginColumn", span.start_col),
        Attribute::new("EndLine", span.end_line),
        Attribute::new("EndColumn", span.end_col),
    ];
    if node.is_leaf() {
        attrs.push(Attribute::new("Image", node.text()));
    }
    attrs
}

/// All attributes of a node, language-specific first.
pub fn attributes_of(node: Node<'_>, provider: &dyn AttributeProvider) -> Vec<Attribute> {
    let mut attrs = provider.attributes(node);
    for generic in generic_attributes(node) {
        if !attrs.iter().any(|a| a.name == generic.name) {
            attrs.push(generic);
        }
    }
    attrs
}

/// Look up one attribute by name.
pub fn attribute(node: Node<'_>, name: &str, provider: &dyn AttributeProvider) -> Option<AttrValue> {
    provider
        .attributes(node)
        .into_iter()
        .find(|a| a.name == name)
        .or_else(|| generic_attributes(node).into_iter().find(|a| a.name == name))
        .map(|a| a.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Span, TreeBuilder};

    fn no_attrs(_: Node<'_>) -> Vec<Attribute> {
        Vec::new()
    }

    fn method_attrs(node: Node<'_>) -> Vec<Attribute> {
        vec![
            Attribute::new("Name", "run"),
            Attribute::new("Image", format!("method:{}", node.text())),
        ]
    }

    #[test]
    fn test_generic_and_kind_attributes() {
        let mut b = TreeBuilder::new("fake", "f", "run");
        b.open("class", None, Span::lines(1, 1, 3, 2));
        b.leaf(
            "method",
            None,
            Span {
                start_byte: 0,
                end_byte: 3,
                start_line: 2,
                start_col: 5,
                end_line: 2,
                end_col: 8,
            },
        );
        b.close();
        let tree = b.finish().unwrap();

        let provider = KindDispatch::new(no_attrs).on("method", method_attrs);
        let method = tree.root().child(0).unwrap();

        assert_eq!(attribute(method, "Name", &provider), Some(AttrValue::from("run")));
        assert_eq!(attribute(method, "BeginColumn", &provider), Some(AttrValue::Num(5.0)));
        // Language attribute shadows the generic one.
        assert_eq!(
            attribute(method, "Image", &provider),
            Some(AttrValue::from("method:run"))
        );
        assert_eq!(
            attributes_of(method, &provider)
                .iter()
                .filter(|a| a.name == "Image")
                .count(),
            1
        );

        // Non-leaf nodes have no generic image.
        assert_eq!(attribute(tree.root(), "Image", &NoAttributes), None);
        assert_eq!(attribute(tree.root(), "Name", &NoAttributes), None);
    }
}
