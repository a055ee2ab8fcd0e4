//! Domain layer: expression grammar, evaluation and the tree walker
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod ast;
pub mod detect;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod resolver;
pub mod value;

pub use ast::{apply_symbol, BinaryOp, Expr, UnaryOp, VarPath};
pub use detect::Detection;
pub use error::{ArithmeticFault, DomainError, DomainResult};
pub use evaluator::{lookup, Evaluator};
pub use parser::parse;
pub use resolver::{resolve, ResolveOptions, Resolver, DEFAULT_MAX_DEPTH, DEFAULT_MAX_EXPANSIONS};
pub use value::{Mapping, Value};
