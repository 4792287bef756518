//! Query evaluation.

use std::cmp::Ordering;

use crate::ast::{Node, NodeId, Tree};
use crate::lang::LanguageHandler;

use super::attribute::{attribute, attributes_of};
use super::functions::{convert_argument, incorrect_node_message, CallContext, FunctionDef};
use super::parser::{ArithOp, Axis, CmpOp, Expr, NodeTest, Origin, Step};
use super::value::{parse_number, Item, Value};
use super::QueryError;

/// The context item: the document, or an item of a sequence.
#[derive(Debug, Clone)]
enum Focus {
    Document,
    Item(Item),
}

#[derive(Debug, Clone)]
struct Context {
    focus: Focus,
    position: usize,
    size: usize,
}

impl Context {
    fn document() -> Self {
        Self {
            focus: Focus::Document,
            position: 1,
            size: 1,
        }
    }

    fn item(item: Item, position: usize, size: usize) -> Self {
        Self {
            focus: Focus::Item(item),
            position,
            size,
        }
    }
}

pub(crate) struct Evaluator<'a, 't> {
    tree: &'t Tree,
    handler: &'a dyn LanguageHandler,
}

impl<'a, 't> Evaluator<'a, 't> {
    pub(crate) fn new(tree: &'t Tree, handler: &'a dyn LanguageHandler) -> Self {
        Self { tree, handler }
    }

    pub(crate) fn evaluate_document(&self, expr: &Expr) -> Result<Value, QueryError> {
        self.eval(expr, &Context::document())
    }

    fn node(&self, id: NodeId) -> Result<Node<'t>, QueryError> {
        self.tree
            .node(id)
            .ok_or_else(|| QueryError::Evaluation(format!("node {} is not part of this tree", id.index())))
    }

    fn eval(&self, expr: &Expr, ctx: &Context) -> Result<Value, QueryError> {
        match expr {
            Expr::Const(value) => Ok(value.clone()),
            Expr::ContextItem => Ok(match &ctx.focus {
                Focus::Document => Value::empty(),
                Focus::Item(item) => Value::single(item.clone()),
            }),
            Expr::Or(left, right) => {
                let result = self.eval(left, ctx)?.effective_boolean()?
                    || self.eval(right, ctx)?.effective_boolean()?;
                Ok(Value::single(result))
            }
            Expr::And(left, right) => {
                let result = self.eval(left, ctx)?.effective_boolean()?
                    && self.eval(right, ctx)?.effective_boolean()?;
                Ok(Value::single(result))
            }
            Expr::Compare(op, left, right) => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                Ok(Value::single(self.general_compare(*op, &left, &right)))
            }
            Expr::Arith(op, left, right) => {
                let left = self.single_number(&self.eval(left, ctx)?)?;
                let right = self.single_number(&self.eval(right, ctx)?)?;
                Ok(match (left, right) {
                    (Some(l), Some(r)) => Value::single(arithmetic(*op, l, r)),
                    _ => Value::empty(),
                })
            }
            Expr::Neg(inner) => Ok(match self.single_number(&self.eval(inner, ctx)?)? {
                Some(n) => Value::single(-n),
                None => Value::empty(),
            }),
            Expr::Union(left, right) => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                if !left.all_nodes() || !right.all_nodes() {
                    return Err(QueryError::Evaluation(
                        "operands of '|' must be node sequences".to_string(),
                    ));
                }
                Ok(document_order(left.node_ids().chain(right.node_ids())))
            }
            Expr::Filter { primary, predicates } => {
                let mut items = self.eval(primary, ctx)?.into_items();
                for predicate in predicates {
                    items = self.filter(items, predicate)?;
                }
                Ok(Value::from_items(items))
            }
            Expr::Path { origin, steps } => self.path(origin, steps, ctx),
            Expr::Call { def, args } => self.call(def, args, ctx),
        }
    }

    fn call(&self, def: &FunctionDef, args: &[Expr], ctx: &Context) -> Result<Value, QueryError> {
        let focus = match &ctx.focus {
            Focus::Item(Item::Node(id)) => Some(self.node(*id)?),
            _ => None,
        };
        if def.depends_on_focus && focus.is_none() {
            return Err(QueryError::Evaluation(incorrect_node_message(def.name)));
        }

        let mut values = Vec::with_capacity(args.len());
        for (i, (arg, ty)) in args.iter().zip(def.args).enumerate() {
            let value = self.eval(arg, ctx)?;
            values.push(convert_argument(def.name, i, *ty, value, self.tree)?);
        }

        let call_ctx = CallContext {
            tree: self.tree,
            focus,
            handler: self.handler,
            function: def.name,
            position: ctx.position,
            size: ctx.size,
        };
        (def.call)(&call_ctx, &values)
    }

    fn path(&self, origin: &Origin, steps: &[Step], ctx: &Context) -> Result<Value, QueryError> {
        // `None` stands for the document. It is an origin, or the self part
        // of a `descendant-or-self::node()` step taken from the document.
        let mut current: Vec<Option<Item>> = match origin {
            Origin::Document => vec![None],
            Origin::Context => vec![match &ctx.focus {
                Focus::Document => None,
                Focus::Item(item) => Some(item.clone()),
            }],
            Origin::Expr(expr) => self.eval(expr, ctx)?.into_items().into_iter().map(Some).collect(),
        };

        for step in steps {
            let mut next = Vec::new();
            let mut keeps_document = false;
            for origin in &current {
                let selected = match origin {
                    None => {
                        keeps_document |= step.axis == Axis::DescendantOrSelf
                            && step.test == NodeTest::Any
                            && step.predicates.is_empty();
                        self.document_axis(step)?
                    }
                    Some(Item::Node(id)) => self.node_axis(self.node(*id)?, step)?,
                    Some(_) => {
                        return Err(QueryError::Evaluation(
                            "a path step cannot be applied to an atomic value".to_string(),
                        ))
                    }
                };
                next.extend(selected);
            }

            let value = if next.iter().all(Item::is_node) {
                document_order(Value::from_items(next).node_ids().collect::<Vec<_>>())
            } else {
                Value::from_items(next)
            };
            current = keeps_document
                .then_some(None)
                .into_iter()
                .chain(value.into_items().into_iter().map(Some))
                .collect();
        }

        Ok(Value::from_items(current.into_iter().flatten().collect()))
    }

    /// Step from the document. The document's only child is the root.
    fn document_axis(&self, step: &Step) -> Result<Vec<Item>, QueryError> {
        let root = self.tree.root();
        let candidates: Vec<Node<'t>> = match step.axis {
            Axis::Child => vec![root],
            Axis::Descendant | Axis::DescendantOrSelf => root.descendants_or_self().collect(),
            _ => Vec::new(),
        };
        self.select(candidates, step)
    }

    fn node_axis(&self, node: Node<'t>, step: &Step) -> Result<Vec<Item>, QueryError> {
        let candidates: Vec<Node<'t>> = match step.axis {
            Axis::Child => node.children().collect(),
            Axis::Descendant => node.descendants().collect(),
            Axis::DescendantOrSelf => node.descendants_or_self().collect(),
            Axis::Parent => node.parent().into_iter().collect(),
            Axis::Ancestor => node.ancestors().collect(),
            Axis::AncestorOrSelf => std::iter::once(node).chain(node.ancestors()).collect(),
            Axis::SelfAxis => vec![node],
            Axis::FollowingSibling => node.following_siblings().collect(),
            Axis::PrecedingSibling => node.preceding_siblings().collect(),
            Axis::Attribute => return self.attribute_axis(node, step),
        };
        self.select(candidates, step)
    }

    /// Apply the name test and predicates to the nodes of one axis, in axis order.
    fn select(&self, candidates: Vec<Node<'t>>, step: &Step) -> Result<Vec<Item>, QueryError> {
        let mut items: Vec<Item> = candidates
            .into_iter()
            .filter(|n| match &step.test {
                NodeTest::Any => true,
                NodeTest::Name(name) => n.name() == name,
            })
            .map(|n| Item::Node(n.id()))
            .collect();
        for predicate in &step.predicates {
            items = self.filter(items, predicate)?;
        }
        Ok(items)
    }

    fn attribute_axis(&self, node: Node<'t>, step: &Step) -> Result<Vec<Item>, QueryError> {
        let provider = self.handler.attributes();
        let mut items: Vec<Item> = match &step.test {
            NodeTest::Any => attributes_of(node, provider)
                .into_iter()
                .map(|a| a.value.into_item())
                .collect(),
            NodeTest::Name(name) => attribute(node, name, provider)
                .map(|v| v.into_item())
                .into_iter()
                .collect(),
        };
        for predicate in &step.predicates {
            items = self.filter(items, predicate)?;
        }
        Ok(items)
    }

    /// Keep items for which the predicate holds. A numeric predicate
    /// selects by 1-based position.
    fn filter(&self, items: Vec<Item>, predicate: &Expr) -> Result<Vec<Item>, QueryError> {
        let size = items.len();
        let mut kept = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let ctx = Context::item(item, i + 1, size);
            let result = self.eval(predicate, &ctx)?;
            let keep = match result.as_single() {
                Some(Item::Num(n)) => *n == ctx.position as f64,
                _ => result.effective_boolean()?,
            };
            if keep {
                if let Focus::Item(item) = ctx.focus {
                    kept.push(item);
                }
            }
        }
        Ok(kept)
    }

    fn single_number(&self, value: &Value) -> Result<Option<f64>, QueryError> {
        match value.items() {
            [] => Ok(None),
            [item] => Ok(Some(item.number_value(self.tree))),
            items => Err(QueryError::Evaluation(format!(
                "arithmetic operand is a sequence of {} items",
                items.len()
            ))),
        }
    }

    /// Existential comparison: true if any pair of atomized items compares.
    fn general_compare(&self, op: CmpOp, left: &Value, right: &Value) -> bool {
        let left: Vec<Item> = left.items().iter().map(|i| i.atomize(self.tree)).collect();
        let right: Vec<Item> = right.items().iter().map(|i| i.atomize(self.tree)).collect();
        left.iter()
            .any(|l| right.iter().any(|r| compare_atomic(op, l, r, self.tree)))
    }
}

fn document_order(ids: impl IntoIterator<Item = NodeId>) -> Value {
    let mut ids: Vec<NodeId> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    Value::from_nodes(ids)
}

fn arithmetic(op: ArithOp, l: f64, r: f64) -> f64 {
    match op {
        ArithOp::Add => l + r,
        ArithOp::Sub => l - r,
        ArithOp::Mul => l * r,
        ArithOp::Div => l / r,
        ArithOp::Mod => l % r,
    }
}

fn truthy(item: &Item) -> bool {
    match item {
        Item::Bool(b) => *b,
        Item::Num(n) => *n != 0.0 && !n.is_nan(),
        Item::Str(s) => !s.is_empty(),
        Item::Node(_) => true,
    }
}

fn compare_atomic(op: CmpOp, left: &Item, right: &Item, tree: &Tree) -> bool {
    let ordering = match (left, right) {
        (Item::Bool(_), _) | (_, Item::Bool(_)) => Some(truthy(left).cmp(&truthy(right))),
        (Item::Num(_), _) | (_, Item::Num(_)) => {
            left.number_value(tree).partial_cmp(&right.number_value(tree))
        }
        (l, r) => {
            let (l, r) = (l.string_value(tree), r.string_value(tree));
            match op {
                CmpOp::Eq | CmpOp::Ne => Some(l.cmp(&r)),
                _ => {
                    let (ln, rn) = (parse_number(&l), parse_number(&r));
                    if ln.is_nan() || rn.is_nan() {
                        Some(l.cmp(&r))
                    } else {
                        ln.partial_cmp(&rn)
                    }
                }
            }
        }
    };

    // Unordered (NaN) compares false for everything but `!=`.
    match ordering {
        None => op == CmpOp::Ne,
        Some(ordering) => match op {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        },
    }
}
