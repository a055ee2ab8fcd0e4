//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Why an arithmetic operation could not produce a real number.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticFault {
    #[error("division by zero")]
    DivisionByZero,

    #[error("zero raised to a negative power")]
    ZeroToNegativePower,

    #[error("negative number raised to a fractional power")]
    ComplexResult,

    #[error("result too large")]
    Overflow,
}

/// Errors raised while parsing or evaluating expressions.
///
/// A single failing leaf aborts the whole resolution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("syntax error in `{input}` at offset {offset}: {message}")]
    Syntax {
        input: String,
        offset: usize,
        message: String,
    },

    #[error("invalid key: {path}")]
    MissingKey { path: String },

    #[error("invalid operator: {symbol}")]
    InvalidOperator { symbol: String },

    #[error("invalid expression shape: `{symbol}` applied to {operands} operand(s)")]
    InvalidExpressionShape { symbol: String, operands: usize },

    #[error("value of `{path}` is not numeric: {found}")]
    NotNumeric { path: String, found: String },

    #[error("arithmetic error in `{lhs} {symbol} {rhs}`: {fault}")]
    Arithmetic {
        symbol: &'static str,
        lhs: f64,
        rhs: f64,
        fault: ArithmeticFault,
    },

    #[error("reference chain deeper than {limit} while resolving `{path}`")]
    DepthExceeded { path: String, limit: usize },

    #[error("more than {limit} reference expansions while resolving `{path}`")]
    ExpansionLimit { path: String, limit: usize },

    #[error("{location}: {source}")]
    AtLocation {
        location: String,
        #[source]
        source: Box<DomainError>,
    },
}

impl DomainError {
    /// Attach the dotted location of the failing leaf.
    pub fn at(self, location: &[String]) -> Self {
        if location.is_empty() {
            return self;
        }
        Self::AtLocation {
            location: location.join("."),
            source: Box::new(self),
        }
    }

    /// The underlying error with any location wrappers removed.
    pub fn root_cause(&self) -> &DomainError {
        match self {
            DomainError::AtLocation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
