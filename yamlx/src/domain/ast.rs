//! Syntax tree and operator tables
//!
//! Operators are looked up by symbol in two small tables, one per arity.
//! The evaluator applies whatever the tables hold; the grammar's own token
//! lists live in `parser` and must name the same symbols.

use std::fmt;

use itertools::Itertools;

use crate::domain::error::{ArithmeticFault, DomainError, DomainResult};

/// Dotted path into the original tree, e.g. `server.port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarPath(Vec<String>);

impl VarPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for VarPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Pow,
    Mod,
}

/// Unary operators known to the evaluator.
pub const UNARY_OPERATORS: &[(&str, UnaryOp)] = &[("+", UnaryOp::Plus), ("-", UnaryOp::Minus)];

/// Binary operators known to the evaluator.
pub const BINARY_OPERATORS: &[(&str, BinaryOp)] = &[
    ("+", BinaryOp::Add),
    ("-", BinaryOp::Sub),
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("//", BinaryOp::FloorDiv),
    ("**", BinaryOp::Pow),
    ("%", BinaryOp::Mod),
];

impl UnaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        UNARY_OPERATORS
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, op)| *op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
        }
    }

    pub fn apply(self, x: f64) -> DomainResult<f64> {
        Ok(match self {
            UnaryOp::Plus => x,
            UnaryOp::Minus => -x,
        })
    }
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        BINARY_OPERATORS
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, op)| *op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Pow => "**",
            BinaryOp::Mod => "%",
        }
    }

    /// Apply to two operands with Python float semantics.
    ///
    /// Division, floor division and modulo by zero are errors rather than
    /// infinities; so are complex and overflowing powers.
    pub fn apply(self, a: f64, b: f64) -> DomainResult<f64> {
        let fault = |fault| DomainError::Arithmetic {
            symbol: self.symbol(),
            lhs: a,
            rhs: b,
            fault,
        };
        match self {
            BinaryOp::Add => Ok(a + b),
            BinaryOp::Sub => Ok(a - b),
            BinaryOp::Mul => Ok(a * b),
            BinaryOp::Div if b == 0.0 => Err(fault(ArithmeticFault::DivisionByZero)),
            BinaryOp::Div => Ok(a / b),
            BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
                Err(fault(ArithmeticFault::DivisionByZero))
            }
            BinaryOp::FloorDiv => Ok(floor_divmod(a, b).0),
            BinaryOp::Mod => Ok(floor_divmod(a, b).1),
            BinaryOp::Pow => power(a, b).map_err(fault),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Floored quotient and remainder; the remainder takes the divisor's sign.
fn floor_divmod(a: f64, b: f64) -> (f64, f64) {
    let mut rem = a % b;
    let mut div = (a - rem) / b;
    if rem != 0.0 {
        if (b < 0.0) != (rem < 0.0) {
            rem += b;
            div -= 1.0;
        }
    } else {
        rem = 0.0f64.copysign(b);
    }
    let quot = if div != 0.0 {
        let floored = div.floor();
        if div - floored > 0.5 {
            floored + 1.0
        } else {
            floored
        }
    } else {
        0.0f64.copysign(a / b)
    };
    (quot, rem)
}

fn power(a: f64, b: f64) -> Result<f64, ArithmeticFault> {
    if b == 0.0 {
        return Ok(1.0);
    }
    if a == 0.0 && b < 0.0 {
        return Err(ArithmeticFault::ZeroToNegativePower);
    }
    if a < 0.0 && a.is_finite() && b.is_finite() && b.fract() != 0.0 {
        return Err(ArithmeticFault::ComplexResult);
    }
    let result = a.powf(b);
    if result.is_infinite() && a.is_finite() && b.is_finite() {
        return Err(ArithmeticFault::Overflow);
    }
    Ok(result)
}

/// Apply an operator given by symbol to one or two operands.
///
/// The operand count selects the table. Used for operator lookups that
/// do not come from a parsed tree (e.g. symbols read from user input).
pub fn apply_symbol(symbol: &str, operands: &[f64]) -> DomainResult<f64> {
    let invalid = || DomainError::InvalidOperator {
        symbol: symbol.to_string(),
    };
    match operands {
        [x] => UnaryOp::from_symbol(symbol).ok_or_else(invalid)?.apply(*x),
        [a, b] => BinaryOp::from_symbol(symbol).ok_or_else(invalid)?.apply(*a, *b),
        _ => Err(DomainError::InvalidExpressionShape {
            symbol: symbol.to_string(),
            operands: operands.len(),
        }),
    }
}

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(VarPath),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Every variable path referenced by this expression, left to right.
    pub fn variables(&self) -> Vec<&VarPath> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a VarPath>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(path) => out.push(path),
            Expr::Unary { operand, .. } => operand.collect_variables(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }

    /// Render as a `termtree` tree for display.
    pub fn to_tree(&self) -> termtree::Tree<String> {
        match self {
            Expr::Number(n) => termtree::Tree::new(format!("{n:?}")),
            Expr::Variable(path) => termtree::Tree::new(format!("${{{path}}}")),
            Expr::Unary { op, operand } => {
                termtree::Tree::new(format!("unary {op}")).with_leaves([operand.to_tree()])
            }
            Expr::Binary { op, lhs, rhs } => {
                termtree::Tree::new(op.to_string()).with_leaves([lhs.to_tree(), rhs.to_tree()])
            }
        }
    }
}

/// Fully parenthesized form, so grouping is visible.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n:?}"),
            Expr::Variable(path) => write!(f, "${{{path}}}"),
            Expr::Unary { op, operand } => write!(f, "({op}{operand})"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
        }
    }
}
