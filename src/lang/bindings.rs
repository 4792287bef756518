//! Display hints for tree viewers.
//!
//! These never fail: when a language has nothing to say about a node, the
//! defaults below apply.

use std::fmt;

use serde::Serialize;

use crate::ast::Node;
use crate::query::{attribute, AttrValue, AttributeProvider};

/// Icon classification of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeIcon {
    Field,
    Class,
    Method,
    Constructor,
    Variable,
    Other,
}

impl fmt::Display for TreeIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TreeIcon::Field => "field",
            TreeIcon::Class => "class",
            TreeIcon::Method => "method",
            TreeIcon::Constructor => "constructor",
            TreeIcon::Variable => "variable",
            TreeIcon::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Label and icon hints for a node.
pub trait DesignerBindings: Send + Sync {
    /// Name of the attribute used as the node's display label.
    fn main_attribute_name(&self, _node: Node<'_>) -> Option<&'static str> {
        None
    }

    fn icon(&self, _node: Node<'_>) -> TreeIcon {
        TreeIcon::Other
    }

    /// Extra lines shown next to the node, e.g. `Type: int`.
    fn additional_info(&self, _node: Node<'_>) -> Vec<String> {
        Vec::new()
    }
}

/// Bindings with every default.
pub struct DefaultDesignerBindings;

impl DesignerBindings for DefaultDesignerBindings {}

/// Resolve the main attribute's value for a node.
///
/// Falls back to `Image` when the language names no attribute or the named
/// one is absent.
pub fn main_attribute(
    bindings: &dyn DesignerBindings,
    attributes: &dyn AttributeProvider,
    node: Node<'_>,
) -> Option<AttrValue> {
    bindings
        .main_attribute_name(node)
        .and_then(|name| attribute(node, name, attributes))
        .or_else(|| attribute(node, "Image", attributes))
}
