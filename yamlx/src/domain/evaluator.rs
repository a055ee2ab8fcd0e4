//! Evaluating syntax trees against the original document

use std::cell::Cell;

use tracing::trace;

use crate::domain::ast::{Expr, VarPath};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::parser::parse;
use crate::domain::resolver::ResolveOptions;
use crate::domain::value::Value;

/// Walk `path` from `root`, one segment at a time.
pub fn lookup<'v>(root: &'v Value, path: &VarPath) -> DomainResult<&'v Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| {
            node.child(segment).ok_or_else(|| DomainError::MissingKey {
                path: path.to_string(),
            })
        })
}

/// Computes expression values. Every lookup reads `root`, never output
/// produced so far.
///
/// Each call to [`Evaluator::evaluate`] may expand at most
/// `max_expansions` referenced expressions, however they are nested.
pub struct Evaluator<'a> {
    root: &'a Value,
    options: &'a ResolveOptions,
    expansions: Cell<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(root: &'a Value, options: &'a ResolveOptions) -> Self {
        Self {
            root,
            options,
            expansions: Cell::new(0),
        }
    }

    pub fn evaluate(&self, expr: &Expr) -> DomainResult<f64> {
        self.expansions.set(0);
        self.eval(expr, 0)
    }

    fn eval(&self, expr: &Expr, depth: usize) -> DomainResult<f64> {
        match expr {
            Expr::Number(n) => Ok(*n),
            Expr::Variable(path) => {
                let value = lookup(self.root, path)?;
                self.coerce(path, value, depth)
            }
            Expr::Unary { op, operand } => op.apply(self.eval(operand, depth)?),
            Expr::Binary { .. } => {
                // Chains nest down the left; walk that spine in a loop
                let mut spine = Vec::new();
                let mut node = expr;
                while let Expr::Binary { op, lhs, rhs } = node {
                    spine.push((*op, rhs.as_ref()));
                    node = lhs.as_ref();
                }
                let mut acc = self.eval(node, depth)?;
                for (op, rhs) in spine.into_iter().rev() {
                    acc = op.apply(acc, self.eval(rhs, depth)?)?;
                }
                Ok(acc)
            }
        }
    }

    /// Turn a referenced value into a number.
    ///
    /// A referenced string that is itself an expression is parsed and
    /// evaluated in turn, up to `max_depth` references deep.
    fn coerce(&self, path: &VarPath, value: &Value, depth: usize) -> DomainResult<f64> {
        match value {
            Value::Integer(i) => Ok(*i as f64),
            Value::Float(x) => Ok(*x),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(text) if self.options.detection.is_expression(text) => {
                if depth >= self.options.max_depth {
                    return Err(DomainError::DepthExceeded {
                        path: path.to_string(),
                        limit: self.options.max_depth,
                    });
                }
                let expanded = self.expansions.get() + 1;
                if expanded > self.options.max_expansions {
                    return Err(DomainError::ExpansionLimit {
                        path: path.to_string(),
                        limit: self.options.max_expansions,
                    });
                }
                self.expansions.set(expanded);
                trace!("following reference {} -> {:?}", path, text);
                let expr = parse(text)?;
                self.eval(&expr, depth + 1)
            }
            Value::String(text) => text.trim().parse::<f64>().map_err(|_| DomainError::NotNumeric {
                path: path.to_string(),
                found: value.to_string(),
            }),
            other => Err(DomainError::NotNumeric {
                path: path.to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }
}
