//! Functions callable from path queries.
//!
//! Every function is a statically typed table entry: a name, a fixed list of
//! argument types, a result type and a plain function pointer. Names are
//! resolved when a query is compiled, against the core table and the active
//! language's table. An unresolved name never reaches evaluation.

use regex::Regex;

use crate::ast::{Node, Tree};
use crate::lang::LanguageHandler;
use crate::metrics::{self, MetricOptions};

use super::value::{Item, Value};
use super::QueryError;

/// Namespace prefix of the core functions.
pub const CORE_PREFIX: &str = "fn";

/// Item type of an argument or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    String,
    Number,
    Boolean,
    Node,
    Any,
}

/// Argument or result type: an item type and a cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceType {
    pub item: ItemType,
    pub many: bool,
}

impl SequenceType {
    pub const SINGLE_STRING: SequenceType = SequenceType::one(ItemType::String);
    pub const SINGLE_NUMBER: SequenceType = SequenceType::one(ItemType::Number);
    pub const SINGLE_BOOLEAN: SequenceType = SequenceType::one(ItemType::Boolean);
    pub const ANY_SEQUENCE: SequenceType = SequenceType::many(ItemType::Any);
    pub const STRING_SEQUENCE: SequenceType = SequenceType::many(ItemType::String);

    pub const fn one(item: ItemType) -> Self {
        Self { item, many: false }
    }

    pub const fn many(item: ItemType) -> Self {
        Self { item, many: true }
    }
}

/// What a function sees when it is called.
pub struct CallContext<'a, 't> {
    pub tree: &'t Tree,
    /// The context node, if the context item is a node.
    pub focus: Option<Node<'t>>,
    pub handler: &'a dyn LanguageHandler,
    pub function: &'static str,
    /// 1-based position of the context item and the size of its sequence.
    pub position: usize,
    pub size: usize,
}

impl<'a, 't> CallContext<'a, 't> {
    /// The context node, or the "incorrect node type" error.
    pub fn focus_node(&self) -> Result<Node<'t>, QueryError> {
        self.focus
            .ok_or_else(|| QueryError::Evaluation(incorrect_node_message(self.function)))
    }
}

/// Implementation of a query function. Arguments arrive already converted
/// to the declared types.
pub type FunctionImpl = for<'a, 't> fn(&CallContext<'a, 't>, &[Value]) -> Result<Value, QueryError>;

/// Compile-time check of literal arguments (`None` for non-literal ones).
pub type StaticCheck = fn(&[Option<&Item>], &dyn LanguageHandler) -> Result<(), QueryError>;

/// A registered query function.
#[derive(Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub args: &'static [SequenceType],
    pub result: SequenceType,
    /// The function reads the context node and fails without one.
    pub depends_on_focus: bool,
    pub call: FunctionImpl,
    pub check: Option<StaticCheck>,
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.args.len())
    }
}

pub(crate) fn incorrect_node_message(function: &str) -> String {
    format!("Incorrect node type: the '{}' function cannot be applied", function)
}

pub(crate) fn bad_metric_key_message(key: &str) -> String {
    format!("'{}' is not the name of a metric", key)
}

/// Resolve a possibly prefixed function name for a language.
///
/// Unprefixed names look in the language table first, then the core table.
/// `fn:` selects the core table and `<language-id>:` the language table.
pub fn resolve_function(name: &str, handler: &dyn LanguageHandler) -> Option<FunctionDef> {
    let find = |table: &[FunctionDef], local: &str| table.iter().find(|f| f.name == local).copied();

    match name.split_once(':') {
        Some((prefix, local)) if prefix == CORE_PREFIX => find(CORE_FUNCTIONS, local),
        Some((prefix, local)) if prefix == handler.language_id() => {
            find(handler.functions(), local)
        }
        Some(_) => None,
        None => find(handler.functions(), name).or_else(|| find(CORE_FUNCTIONS, name)),
    }
}

/// Convert an argument to its declared type.
pub(crate) fn convert_argument(
    function: &str,
    position: usize,
    expected: SequenceType,
    value: Value,
    tree: &Tree,
) -> Result<Value, QueryError> {
    if !expected.many && value.len() > 1 {
        return Err(QueryError::Evaluation(format!(
            "argument {} of '{}' must be a single value, got a sequence of {}",
            position + 1,
            function,
            value.len()
        )));
    }

    let convert = |item: &Item| -> Result<Item, QueryError> {
        Ok(match expected.item {
            ItemType::String => Item::Str(item.string_value(tree)),
            ItemType::Number => Item::Num(item.number_value(tree)),
            ItemType::Boolean => Item::Bool(Value::single(item.clone()).effective_boolean()?),
            ItemType::Node => {
                if !item.is_node() {
                    return Err(QueryError::Evaluation(format!(
                        "argument {} of '{}' must be a node",
                        position + 1,
                        function
                    )));
                }
                item.clone()
            }
            ItemType::Any => item.clone(),
        })
    };

    if expected.many || expected.item == ItemType::Any {
        let items = value
            .items()
            .iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::from_items(items));
    }

    match value.as_single() {
        Some(item) => Ok(Value::single(convert(item)?)),
        // An empty argument behaves like the type's empty value.
        None => Ok(match expected.item {
            ItemType::String => Value::single(""),
            ItemType::Number => Value::single(f64::NAN),
            ItemType::Boolean => Value::single(false),
            _ => Value::empty(),
        }),
    }
}

/// Helpers for reading converted arguments.
pub(crate) fn arg_str(args: &[Value], i: usize) -> &str {
    match args.get(i).and_then(Value::as_single) {
        Some(Item::Str(s)) => s,
        _ => "",
    }
}

pub(crate) fn arg_bool(args: &[Value], i: usize) -> bool {
    matches!(args.get(i).and_then(Value::as_single), Some(Item::Bool(true)))
}

fn literal_str<'i>(args: &[Option<&'i Item>], i: usize) -> Option<&'i str> {
    match args.get(i).copied().flatten() {
        Some(Item::Str(s)) => Some(s),
        _ => None,
    }
}

// =============================================================================
// Core functions
// =============================================================================

fn fn_true(_: &CallContext<'_, '_>, _: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(true))
}

fn fn_false(_: &CallContext<'_, '_>, _: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(false))
}

fn fn_not(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(!args[0].effective_boolean()?))
}

fn fn_boolean(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(args[0].effective_boolean()?))
}

fn fn_position(ctx: &CallContext<'_, '_>, _: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(ctx.position as f64))
}

fn fn_last(ctx: &CallContext<'_, '_>, _: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(ctx.size as f64))
}

fn fn_count(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(args[0].len() as f64))
}

fn fn_exists(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(!args[0].is_empty()))
}

fn fn_empty(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(args[0].is_empty()))
}

fn fn_string(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(arg_str(args, 0)))
}

fn fn_number(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(args[0].clone())
}

fn fn_string_length(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(arg_str(args, 0).chars().count() as f64))
}

fn fn_contains(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(arg_str(args, 0).contains(arg_str(args, 1))))
}

fn fn_starts_with(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(arg_str(args, 0).starts_with(arg_str(args, 1))))
}

fn fn_ends_with(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(arg_str(args, 0).ends_with(arg_str(args, 1))))
}

fn fn_lower_case(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(arg_str(args, 0).to_lowercase()))
}

fn fn_upper_case(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(arg_str(args, 0).to_uppercase()))
}

fn fn_matches(_: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    let pattern = arg_str(args, 1);
    let re = Regex::new(pattern).map_err(|e| {
        QueryError::Evaluation(format!("invalid regular expression '{}': {}", pattern, e))
    })?;
    Ok(Value::single(re.is_match(arg_str(args, 0))))
}

fn check_matches(args: &[Option<&Item>], _: &dyn LanguageHandler) -> Result<(), QueryError> {
    if let Some(pattern) = literal_str(args, 1) {
        Regex::new(pattern).map_err(|e| {
            QueryError::BadArgument(format!("invalid regular expression '{}': {}", pattern, e))
        })?;
    }
    Ok(())
}

fn fn_name(ctx: &CallContext<'_, '_>, _: &[Value]) -> Result<Value, QueryError> {
    Ok(Value::single(ctx.focus_node()?.name()))
}

/// `metric(key)`: value of a metric for the context node.
///
/// Returns NaN when the metric does not apply to the node's kind.
fn fn_metric(ctx: &CallContext<'_, '_>, args: &[Value]) -> Result<Value, QueryError> {
    let key = arg_str(args, 0);
    let metric = ctx
        .handler
        .metrics()
        .metric_with_name(key)
        .ok_or_else(|| QueryError::BadArgument(bad_metric_key_message(key)))?;
    let node = ctx.focus_node()?;

    let value = metrics::compute_memoized(metric, &MetricOptions::empty(), node);
    Ok(Value::single(value.unwrap_or(f64::NAN)))
}

fn check_metric(args: &[Option<&Item>], handler: &dyn LanguageHandler) -> Result<(), QueryError> {
    if let Some(key) = literal_str(args, 0) {
        if handler.metrics().metric_with_name(key).is_none() {
            return Err(QueryError::BadArgument(bad_metric_key_message(key)));
        }
    }
    Ok(())
}

const fn core(
    name: &'static str,
    args: &'static [SequenceType],
    result: SequenceType,
    call: FunctionImpl,
) -> FunctionDef {
    FunctionDef {
        name,
        args,
        result,
        depends_on_focus: false,
        call,
        check: None,
    }
}

use SequenceType as T;

/// Functions available in every language.
pub static CORE_FUNCTIONS: &[FunctionDef] = &[
    core("true", &[], T::SINGLE_BOOLEAN, fn_true),
    core("false", &[], T::SINGLE_BOOLEAN, fn_false),
    core("not", &[T::ANY_SEQUENCE], T::SINGLE_BOOLEAN, fn_not),
    core("boolean", &[T::ANY_SEQUENCE], T::SINGLE_BOOLEAN, fn_boolean),
    core("position", &[], T::SINGLE_NUMBER, fn_position),
    core("last", &[], T::SINGLE_NUMBER, fn_last),
    core("count", &[T::ANY_SEQUENCE], T::SINGLE_NUMBER, fn_count),
    core("exists", &[T::ANY_SEQUENCE], T::SINGLE_BOOLEAN, fn_exists),
    core("empty", &[T::ANY_SEQUENCE], T::SINGLE_BOOLEAN, fn_empty),
    core("string", &[T::SINGLE_STRING], T::SINGLE_STRING, fn_string),
    core("number", &[T::SINGLE_NUMBER], T::SINGLE_NUMBER, fn_number),
    core("string-length", &[T::SINGLE_STRING], T::SINGLE_NUMBER, fn_string_length),
    core("contains", &[T::SINGLE_STRING, T::SINGLE_STRING], T::SINGLE_BOOLEAN, fn_contains),
    core("starts-with", &[T::SINGLE_STRING, T::SINGLE_STRING], T::SINGLE_BOOLEAN, fn_starts_with),
    core("ends-with", &[T::SINGLE_STRING, T::SINGLE_STRING], T::SINGLE_BOOLEAN, fn_ends_with),
    core("lower-case", &[T::SINGLE_STRING], T::SINGLE_STRING, fn_lower_case),
    core("upper-case", &[T::SINGLE_STRING], T::SINGLE_STRING, fn_upper_case),
    FunctionDef {
        name: "matches",
        args: &[T::SINGLE_STRING, T::SINGLE_STRING],
        result: T::SINGLE_BOOLEAN,
        depends_on_focus: false,
        call: fn_matches,
        check: Some(check_matches),
    },
    FunctionDef {
        name: "name",
        args: &[],
        result: T::SINGLE_STRING,
        depends_on_focus: true,
        call: fn_name,
        check: None,
    },
    FunctionDef {
        name: "metric",
        args: &[T::SINGLE_STRING],
        result: T::SINGLE_NUMBER,
        depends_on_focus: true,
        call: fn_metric,
        check: Some(check_metric),
    },
];
