//! Recursive-descent parser producing a resolved expression tree.

use crate::lang::LanguageHandler;

use super::functions::{self, FunctionDef};
use super::lexer::{Tok, Token};
use super::value::{Item, Value};
use super::{QueryError, Variables};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Axis> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "self" => Axis::SelfAxis,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "attribute" => Axis::Attribute,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    /// `*` or `node()`.
    Any,
    Name(String),
}

#[derive(Debug)]
pub(crate) struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

#[derive(Debug)]
pub(crate) enum Origin {
    /// Absolute path: starts at the document.
    Document,
    /// Relative path: starts at the context item.
    Context,
    /// Path continuing a filter expression.
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug)]
pub(crate) enum Expr {
    Const(Value),
    ContextItem,
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path { origin: Origin, steps: Vec<Step> },
    Filter { primary: Box<Expr>, predicates: Vec<Expr> },
    Call { def: FunctionDef, args: Vec<Expr> },
}

impl Expr {
    fn literal(&self) -> Option<&Item> {
        match self {
            Expr::Const(value) => value.as_single(),
            _ => None,
        }
    }
}

pub(crate) fn parse(
    tokens: Vec<Token>,
    handler: &dyn LanguageHandler,
    variables: &Variables,
) -> Result<Expr, QueryError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        handler,
        variables,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        Tok::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected {}", describe(other)))),
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Name(n) => format!("name '{}'", n),
        Tok::Str(s) => format!("string '{}'", s),
        Tok::Num(n) => format!("number {}", n),
        Tok::Eof => "end of query".to_string(),
        other => format!("{:?}", other),
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    handler: &'a dyn LanguageHandler,
    variables: &'a Variables,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Tok {
        let i = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[i].tok
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<(), QueryError> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {}", what, describe(self.peek()))))
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Tok::Name(n) if n == keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: String) -> QueryError {
        QueryError::Syntax {
            offset: self.offset(),
            message,
        }
    }

    fn expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("or") {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.comparison()?;
        while self.eat_keyword("and") {
            let right = self.comparison()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, QueryError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Tok::Eq => CmpOp::Eq,
            Tok::Ne => CmpOp::Ne,
            Tok::Lt => CmpOp::Lt,
            Tok::Le => CmpOp::Le,
            Tok::Gt => CmpOp::Gt,
            Tok::Ge => CmpOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.additive()?;
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => ArithOp::Add,
                Tok::Minus => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Tok::Star => ArithOp::Mul,
                Tok::Name(n) if n == "div" => ArithOp::Div,
                Tok::Name(n) if n == "mod" => ArithOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, QueryError> {
        if self.eat(&Tok::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.union()
    }

    fn union(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.path()?;
        while self.eat(&Tok::Pipe) {
            let right = self.path()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn path(&mut self) -> Result<Expr, QueryError> {
        match self.peek() {
            Tok::Slash => {
                self.advance();
                if !self.starts_step() {
                    return Err(self.error("a bare '/' does not select anything".to_string()));
                }
                let mut steps = vec![self.step()?];
                self.more_steps(&mut steps)?;
                Ok(Expr::Path {
                    origin: Origin::Document,
                    steps,
                })
            }
            Tok::DoubleSlash => {
                self.advance();
                let mut steps = Vec::new();
                self.descendant_step(&mut steps)?;
                self.more_steps(&mut steps)?;
                Ok(Expr::Path {
                    origin: Origin::Document,
                    steps,
                })
            }
            _ if self.starts_primary() => {
                let primary = self.primary()?;
                let predicates = self.predicates()?;
                let filter = if predicates.is_empty() {
                    primary
                } else {
                    Expr::Filter {
                        primary: Box::new(primary),
                        predicates,
                    }
                };
                let mut steps = Vec::new();
                self.more_steps(&mut steps)?;
                if steps.is_empty() {
                    Ok(filter)
                } else {
                    Ok(Expr::Path {
                        origin: Origin::Expr(Box::new(filter)),
                        steps,
                    })
                }
            }
            _ if self.starts_step() => {
                if self.peek() == &Tok::Dot && !self.continues_path(1) {
                    self.advance();
                    return Ok(Expr::ContextItem);
                }
                let mut steps = vec![self.step()?];
                self.more_steps(&mut steps)?;
                Ok(Expr::Path {
                    origin: Origin::Context,
                    steps,
                })
            }
            other => Err(self.error(format!("expected an expression, found {}", describe(other)))),
        }
    }

    fn continues_path(&self, ahead: usize) -> bool {
        matches!(
            self.peek_at(ahead),
            Tok::Slash | Tok::DoubleSlash | Tok::LBracket
        )
    }

    fn more_steps(&mut self, steps: &mut Vec<Step>) -> Result<(), QueryError> {
        loop {
            match self.peek() {
                Tok::Slash => {
                    self.advance();
                    steps.push(self.step()?);
                }
                Tok::DoubleSlash => {
                    self.advance();
                    self.descendant_step(steps)?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// The step after `//`, which abbreviates `/descendant-or-self::node()/`.
    /// A plain child step without predicates collapses into one descendant
    /// step; anything else keeps the descendant-or-self step so positional
    /// predicates count per parent.
    fn descendant_step(&mut self, steps: &mut Vec<Step>) -> Result<(), QueryError> {
        if !self.starts_step() {
            return Err(self.error("expected a step after '//'".to_string()));
        }
        let mut step = self.step()?;
        if step.axis == Axis::Child && step.predicates.is_empty() {
            step.axis = Axis::Descendant;
        } else {
            steps.push(Step {
                axis: Axis::DescendantOrSelf,
                test: NodeTest::Any,
                predicates: Vec::new(),
            });
        }
        steps.push(step);
        Ok(())
    }

    fn starts_primary(&self) -> bool {
        match self.peek() {
            Tok::Str(_) | Tok::Num(_) | Tok::Dollar | Tok::LParen => true,
            Tok::Name(n) => {
                self.peek_at(1) == &Tok::LParen && Axis::from_name(n).is_none() && n != "node"
            }
            _ => false,
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Tok::Dot | Tok::DotDot | Tok::At | Tok::Star | Tok::Name(_)
        )
    }

    /// One location step.
    fn step(&mut self) -> Result<Step, QueryError> {
        let (axis, test) = match self.peek().clone() {
            Tok::Dot => {
                self.advance();
                (Axis::SelfAxis, NodeTest::Any)
            }
            Tok::DotDot => {
                self.advance();
                (Axis::Parent, NodeTest::Any)
            }
            Tok::At => {
                self.advance();
                (Axis::Attribute, self.node_test()?)
            }
            Tok::Name(name) if self.peek_at(1) == &Tok::ColonColon => {
                let axis = Axis::from_name(&name)
                    .ok_or_else(|| self.error(format!("unknown axis '{}'", name)))?;
                self.advance();
                self.advance();
                (axis, self.node_test()?)
            }
            _ => (Axis::Child, self.node_test()?),
        };

        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, QueryError> {
        match self.advance() {
            Tok::Star => Ok(NodeTest::Any),
            Tok::Name(name) if name == "node" && self.peek() == &Tok::LParen => {
                self.advance();
                self.expect(Tok::RParen, "')'")?;
                Ok(NodeTest::Any)
            }
            Tok::Name(name) => Ok(NodeTest::Name(name)),
            other => Err(self.error(format!("expected a name test, found {}", describe(&other)))),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>, QueryError> {
        let mut predicates = Vec::new();
        while self.eat(&Tok::LBracket) {
            predicates.push(self.expr()?);
            self.expect(Tok::RBracket, "']'")?;
        }
        Ok(predicates)
    }

    fn primary(&mut self) -> Result<Expr, QueryError> {
        let offset = self.offset();
        match self.advance() {
            Tok::Str(s) => Ok(Expr::Const(Value::single(s))),
            Tok::Num(n) => Ok(Expr::Const(Value::single(n))),
            Tok::Dollar => match self.advance() {
                Tok::Name(name) => self
                    .variables
                    .get(&name)
                    .cloned()
                    .map(Expr::Const)
                    .ok_or(QueryError::UnknownVariable(name)),
                other => Err(self.error(format!(
                    "expected a variable name, found {}",
                    describe(&other)
                ))),
            },
            Tok::LParen => {
                if self.eat(&Tok::RParen) {
                    return Ok(Expr::Const(Value::empty()));
                }
                let inner = self.expr()?;
                self.expect(Tok::RParen, "')'")?;
                Ok(inner)
            }
            Tok::Name(name) => self.call(name, offset),
            other => Err(self.error(format!("unexpected {}", describe(&other)))),
        }
    }

    fn call(&mut self, name: String, offset: usize) -> Result<Expr, QueryError> {
        self.expect(Tok::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.eat(&Tok::RParen) {
            loop {
                args.push(self.expr()?);
                if self.eat(&Tok::Comma) {
                    continue;
                }
                self.expect(Tok::RParen, "')' or ','")?;
                break;
            }
        }

        let def = functions::resolve_function(&name, self.handler)
            .ok_or_else(|| QueryError::UnknownFunction(name.clone()))?;
        if def.args.len() != args.len() {
            return Err(QueryError::Arity {
                name,
                expected: def.args.len(),
                found: args.len(),
            });
        }
        if let Some(check) = def.check {
            let literals: Vec<Option<&Item>> = args.iter().map(Expr::literal).collect();
            check(&literals, self.handler)?;
        }
        tracing::trace!(function = def.name, offset, "resolved query function");

        Ok(Expr::Call { def, args })
    }
}
