//! Query values.
//!
//! Every query value is a sequence of items. A single string, number or
//! boolean is a sequence of length one; an empty sequence stands for "no
//! result".

use crate::ast::{NodeId, Tree};

use super::QueryError;

/// One item of a query value.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Node(NodeId),
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Item {
    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }

    /// String value of the item. Nodes atomize to their source text.
    pub fn string_value(&self, tree: &Tree) -> String {
        match self {
            Item::Node(id) => tree.node(*id).map(|n| n.text().to_string()).unwrap_or_default(),
            Item::Str(s) => s.clone(),
            Item::Num(n) => format_number(*n),
            Item::Bool(b) => b.to_string(),
        }
    }

    /// Numeric value of the item; NaN when it does not look like a number.
    pub fn number_value(&self, tree: &Tree) -> f64 {
        match self {
            Item::Num(n) => *n,
            Item::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => parse_number(&other.string_value(tree)),
        }
    }

    /// Replace nodes by their string value.
    pub fn atomize(&self, tree: &Tree) -> Item {
        match self {
            Item::Node(_) => Item::Str(self.string_value(tree)),
            other => other.clone(),
        }
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Item::Str(s.to_string())
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Item::Str(s)
    }
}

impl From<f64> for Item {
    fn from(n: f64) -> Self {
        Item::Num(n)
    }
}

impl From<bool> for Item {
    fn from(b: bool) -> Self {
        Item::Bool(b)
    }
}

/// A sequence of items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Value(Vec<Item>);

impl Value {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn single(item: impl Into<Item>) -> Self {
        Self(vec![item.into()])
    }

    pub fn from_items(items: Vec<Item>) -> Self {
        Self(items)
    }

    pub fn from_nodes(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self(ids.into_iter().map(Item::Node).collect())
    }

    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn into_items(self) -> Vec<Item> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Node ids in this value, ignoring atomic items.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().filter_map(|item| match item {
            Item::Node(id) => Some(*id),
            _ => None,
        })
    }

    pub fn all_nodes(&self) -> bool {
        self.0.iter().all(Item::is_node)
    }

    /// The single item of this value, if it has exactly one.
    pub fn as_single(&self) -> Option<&Item> {
        match self.0.as_slice() {
            [item] => Some(item),
            _ => None,
        }
    }

    /// Effective boolean value.
    ///
    /// Empty is false, a sequence starting with a node is true, and a single
    /// atomic value follows the usual string/number/boolean rules.
    pub fn effective_boolean(&self) -> Result<bool, QueryError> {
        match self.0.as_slice() {
            [] => Ok(false),
            [Item::Node(_), ..] => Ok(true),
            [Item::Bool(b)] => Ok(*b),
            [Item::Str(s)] => Ok(!s.is_empty()),
            [Item::Num(n)] => Ok(*n != 0.0 && !n.is_nan()),
            items => Err(QueryError::Evaluation(format!(
                "effective boolean value is not defined for a sequence of {} atomic values",
                items.len()
            ))),
        }
    }
}

/// Render a number the way queries print it: integers without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

pub(crate) fn parse_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_boolean() {
        assert!(!Value::empty().effective_boolean().unwrap());
        assert!(Value::single(true).effective_boolean().unwrap());
        assert!(!Value::single("").effective_boolean().unwrap());
        assert!(Value::single("x").effective_boolean().unwrap());
        assert!(!Value::single(0.0).effective_boolean().unwrap());
        assert!(!Value::single(f64::NAN).effective_boolean().unwrap());
        assert!(Value::from_nodes([NodeId(3), NodeId(4)])
            .effective_boolean()
            .unwrap());

        let atoms = Value::from_items(vec![Item::Num(1.0), Item::Num(2.0)]);
        assert!(atoms.effective_boolean().is_err());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
